use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use loclib_dal::{
    author::{Author, AuthorRepository},
    book::BookShort,
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
    form::{validate, AuthorForm, FieldError, Validation},
    repository_from_request,
    state::AppState,
    view::{views, AuthorView, BookShortView},
};

repository_from_request!(AuthorRepository, authors);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list))
        .route("/author/create", get(create_form).post(create))
        .route("/author/delete", post(delete))
        .route("/author/{id}", get(show))
        .route("/author/{id}/update", get(update_form).post(update))
        .route("/author/{id}/delete", get(delete_confirm).post(delete))
}

#[derive(Debug, Deserialize)]
pub struct DeleteAuthor {
    authorid: String,
}

pub async fn list(
    repository: AuthorRepository,
    State(state): State<AppState>,
    Query(listing): Query<Listing>,
) -> ApiResult<Html<String>> {
    let authors = repository.list(listing.into_listing_params()?).await?;
    let mut context = Context::new();
    context.insert("authors", &views::<_, AuthorView>(&authors));
    render(&state, "author_list.html", "Author List", context)
}

pub async fn show(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult<Html<String>> {
    let detail = detail::author_detail(state.storage(), id).await?;
    let mut context = Context::new();
    context.insert("author", &AuthorView::from(&detail.author));
    context.insert("books", &views::<_, BookShortView>(&detail.books));
    render(&state, "author_detail.html", "Author Detail", context)
}

fn render_form(
    state: &AppState,
    title: &str,
    form: &AuthorForm,
    errors: &[FieldError],
) -> ApiResult<Html<String>> {
    render(state, "author_form.html", title, form_context(form, errors))
}

pub async fn create_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render_form(&state, "Create Author", &AuthorForm::default(), &[])
}

pub async fn create(
    repository: AuthorRepository,
    State(state): State<AppState>,
    Form(form): Form<AuthorForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => {
            let author = repository.create(draft).await?;
            Ok(Redirect::to(&author.url()).into_response())
        }
        Validation::Invalid { form, errors } => {
            debug!("Invalid author form: {errors:?}");
            Ok(render_form(&state, "Create Author", &form, &errors)?.into_response())
        }
    }
}

pub async fn update_form(
    Path(id): Path<i64>,
    repository: AuthorRepository,
    State(state): State<AppState>,
) -> ApiResult<Html<String>> {
    let author = repository.get(id).await?;
    render_form(&state, "Update Author", &AuthorForm::from(&author), &[])
}

pub async fn update(
    Path(id): Path<i64>,
    repository: AuthorRepository,
    State(state): State<AppState>,
    Form(form): Form<AuthorForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => {
            let author = repository.update(id, draft).await?;
            Ok(Redirect::to(&author.url()).into_response())
        }
        Validation::Invalid { form, errors } => {
            debug!("Invalid author form: {errors:?}");
            Ok(render_form(&state, "Update Author", &form, &errors)?.into_response())
        }
    }
}

fn render_delete(
    state: &AppState,
    author: &Author,
    books: &[BookShort],
) -> ApiResult<Html<String>> {
    let mut context = Context::new();
    context.insert("author", &AuthorView::from(author));
    context.insert("books", &views::<_, BookShortView>(books));
    render(state, "author_delete.html", "Delete Author", context)
}

/// Confirmation lists books which have to be deleted first
pub async fn delete_confirm(
    Path(id): Path<i64>,
    repository: AuthorRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let integrity = state.storage().integrity();
    match tokio::try_join!(repository.get(id), integrity.can_delete_author(id)) {
        Ok((author, check)) => {
            Ok(render_delete(&state, &author, check.blockers())?.into_response())
        }
        Err(Error::RecordNotFound(_)) => {
            Ok(Redirect::to(&EntityKind::Author.list_url()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete(
    repository: AuthorRepository,
    State(state): State<AppState>,
    Form(body): Form<DeleteAuthor>,
) -> ApiResult<Response> {
    let id: i64 = body
        .authorid
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidRequest("Invalid author id".to_string()))?;

    match repository.delete_guarded(id).await? {
        Deletion::Deleted => Ok(Redirect::to(&EntityKind::Author.list_url()).into_response()),
        Deletion::Blocked(books) => {
            let author = repository.get(id).await?;
            Ok(render_delete(&state, &author, &books)?.into_response())
        }
    }
}
