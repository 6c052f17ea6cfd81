use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use loclib_dal::{
    book::{Book, BookRepository, CreateBook},
    book_instance::BookInstance,
    detail,
    integrity::{Deletion, EntityKind},
    Error,
};
use serde::Deserialize;
use tera::Context;
use tracing::debug;

use super::{form_context, render, Listing};
use crate::{
    error::{ApiError, ApiResult},
    form::{validate, BookForm, FieldError, Validation},
    repository_from_request,
    state::AppState,
    view::{views, BookInstanceView, BookShortView, BookView, Choice},
};

repository_from_request!(BookRepository, books);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list))
        .route("/book/create", get(create_form).post(create))
        .route("/book/delete", post(delete))
        .route("/book/{id}", get(show))
        .route("/book/{id}/update", get(update_form).post(update))
        .route("/book/{id}/delete", get(delete_confirm).post(delete))
}

#[derive(Debug, Deserialize)]
pub struct DeleteBook {
    bookid: String,
}

pub async fn list(
    repository: BookRepository,
    State(state): State<AppState>,
    Query(listing): Query<Listing>,
) -> ApiResult<Html<String>> {
    let books = repository.list(listing.into_listing_params()?).await?;
    let mut context = Context::new();
    context.insert("books", &views::<_, BookShortView>(&books));
    render(&state, "book_list.html", "Book List", context)
}

pub async fn show(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult<Html<String>> {
    let detail = detail::book_detail(state.storage(), id).await?;
    let mut context = Context::new();
    context.insert("book", &BookView::from(&detail.book));
    context.insert("instances", &views::<_, BookInstanceView>(&detail.instances));
    render(&state, "book_detail.html", "Book Detail", context)
}

/// Form needs all authors and genres to choose from
async fn render_form(
    state: &AppState,
    title: &str,
    form: &BookForm,
    errors: &[FieldError],
) -> ApiResult<Html<String>> {
    let authors = state.storage().authors();
    let genres = state.storage().genres();
    let (authors, genres) = tokio::try_join!(authors.list_all(), genres.list_all())?;

    let author_choices: Vec<_> = authors
        .iter()
        .map(|a| Choice::new(a.id, a.name(), form.author == a.id.to_string()))
        .collect();
    let genre_choices: Vec<_> = genres
        .iter()
        .map(|g| Choice::new(g.id, g.name.clone(), form.has_genre(g.id)))
        .collect();

    let mut context = form_context(form, errors);
    context.insert("authors", &author_choices);
    context.insert("genres", &genre_choices);
    render(state, "book_form.html", title, context)
}

/// Author or genre may disappear while the form is filled,
/// the form is then shown again with the missing one marked
async fn saved_or_form(
    state: &AppState,
    title: &str,
    draft: &CreateBook,
    saved: Result<Book, Error>,
) -> ApiResult<Response> {
    match saved {
        Ok(book) => Ok(Redirect::to(&book.url()).into_response()),
        Err(Error::ReferentialConflict(reason)) => {
            debug!("Book refers to missing record: {reason}");
            let error = match state.storage().authors().get(draft.author_id).await {
                Ok(_) => FieldError::new("genre", "Genre: not found"),
                Err(Error::RecordNotFound(_)) => FieldError::new("author", "Author: not found"),
                Err(e) => return Err(e.into()),
            };
            let form = BookForm::from(draft);
            Ok(render_form(state, title, &form, &[error]).await?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn create_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render_form(&state, "Create Book", &BookForm::default(), &[]).await
}

pub async fn create(
    repository: BookRepository,
    State(state): State<AppState>,
    Form(form): Form<BookForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => {
            let saved = repository.create(draft.clone()).await;
            saved_or_form(&state, "Create Book", &draft, saved).await
        }
        Validation::Invalid { form, errors } => {
            debug!("Invalid book form: {errors:?}");
            Ok(render_form(&state, "Create Book", &form, &errors)
                .await?
                .into_response())
        }
    }
}

pub async fn update_form(
    Path(id): Path<i64>,
    repository: BookRepository,
    State(state): State<AppState>,
) -> ApiResult<Html<String>> {
    let book = repository.get(id).await?;
    render_form(&state, "Update Book", &BookForm::from(&book), &[]).await
}

pub async fn update(
    Path(id): Path<i64>,
    repository: BookRepository,
    State(state): State<AppState>,
    Form(form): Form<BookForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => {
            let saved = repository.update(id, draft.clone()).await;
            saved_or_form(&state, "Update Book", &draft, saved).await
        }
        Validation::Invalid { form, errors } => {
            debug!("Invalid book form: {errors:?}");
            Ok(render_form(&state, "Update Book", &form, &errors)
                .await?
                .into_response())
        }
    }
}

fn render_delete(
    state: &AppState,
    book: &Book,
    instances: &[BookInstance],
) -> ApiResult<Html<String>> {
    let mut context = Context::new();
    context.insert("book", &BookView::from(book));
    context.insert("instances", &views::<_, BookInstanceView>(instances));
    render(state, "book_delete.html", "Delete Book", context)
}

pub async fn delete_confirm(
    Path(id): Path<i64>,
    repository: BookRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let integrity = state.storage().integrity();
    match tokio::try_join!(repository.get(id), integrity.can_delete_book(id)) {
        Ok((book, check)) => {
            Ok(render_delete(&state, &book, check.blockers())?.into_response())
        }
        Err(Error::RecordNotFound(_)) => {
            Ok(Redirect::to(&EntityKind::Book.list_url()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Book with copies cannot be deleted, copies are listed instead
pub async fn delete(
    repository: BookRepository,
    State(state): State<AppState>,
    Form(body): Form<DeleteBook>,
) -> ApiResult<Response> {
    let id: i64 = body
        .bookid
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidRequest("Invalid book id".to_string()))?;

    match repository.delete_guarded(id).await? {
        Deletion::Deleted => Ok(Redirect::to(&EntityKind::Book.list_url()).into_response()),
        Deletion::Blocked(instances) => {
            let book = repository.get(id).await?;
            Ok(render_delete(&state, &book, &instances)?.into_response())
        }
    }
}
