use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use loclib_dal::{
    book::BookShort,
    detail,
    genre::{Genre, GenreRepository},
    integrity::{Deletion, EntityKind},
    Error,
};
use serde::Deserialize;
use tera::Context;
use tracing::debug;

use super::{form_context, render, Listing};
use crate::{
    error::{ApiError, ApiResult},
    form::{validate, FieldError, GenreForm, Validation},
    repository_from_request,
    state::AppState,
    view::{views, BookShortView, Link},
};

repository_from_request!(GenreRepository, genres);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/genres", get(list))
        .route("/genre/create", get(create_form).post(create))
        .route("/genre/delete", post(delete))
        .route("/genre/{id}", get(show))
        .route("/genre/{id}/update", get(update_form).post(update))
        .route("/genre/{id}/delete", get(delete_confirm).post(delete))
}

#[derive(Debug, Deserialize)]
pub struct DeleteGenre {
    genreid: String,
}

pub async fn list(
    repository: GenreRepository,
    State(state): State<AppState>,
    Query(listing): Query<Listing>,
) -> ApiResult<Html<String>> {
    let genres = repository.list(listing.into_listing_params()?).await?;
    let mut context = Context::new();
    context.insert("genres", &views::<_, Link>(&genres));
    render(&state, "genre_list.html", "Genre List", context)
}

pub async fn show(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult<Html<String>> {
    let detail = detail::genre_detail(state.storage(), id).await?;
    let mut context = Context::new();
    context.insert("genre", &Link::from(&detail.genre));
    context.insert("books", &views::<_, BookShortView>(&detail.books));
    render(&state, "genre_detail.html", "Genre Detail", context)
}

fn render_form(
    state: &AppState,
    title: &str,
    form: &GenreForm,
    errors: &[FieldError],
) -> ApiResult<Html<String>> {
    render(state, "genre_form.html", title, form_context(form, errors))
}

pub async fn create_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render_form(&state, "Create Genre", &GenreForm::default(), &[])
}

/// Genre names are unique regardless of case, existing genre is shown
/// instead of creating duplicate
pub async fn create(
    repository: GenreRepository,
    State(state): State<AppState>,
    Form(form): Form<GenreForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => {
            if let Some(existing) = repository.find_by_name(&draft.name).await? {
                debug!("Genre {} already exists as {}", draft.name, existing.id);
                return Ok(Redirect::to(&existing.url()).into_response());
            }
            let genre = repository.create(draft).await?;
            Ok(Redirect::to(&genre.url()).into_response())
        }
        Validation::Invalid { form, errors } => {
            debug!("Invalid genre form: {errors:?}");
            Ok(render_form(&state, "Create Genre", &form, &errors)?.into_response())
        }
    }
}

pub async fn update_form(
    Path(id): Path<i64>,
    repository: GenreRepository,
    State(state): State<AppState>,
) -> ApiResult<Html<String>> {
    let genre = repository.get(id).await?;
    render_form(&state, "Update Genre", &GenreForm::from(&genre), &[])
}

pub async fn update(
    Path(id): Path<i64>,
    repository: GenreRepository,
    State(state): State<AppState>,
    Form(form): Form<GenreForm>,
) -> ApiResult<Response> {
    let (form, errors) = match validate(form) {
        Validation::Valid(draft) => match repository.find_by_name(&draft.name).await? {
            Some(other) if other.id != id => {
                let error =
                    FieldError::new("name", "Genre name: genre with this name already exists");
                (GenreForm { name: draft.name }, vec![error])
            }
            _ => {
                let genre = repository.update(id, draft).await?;
                return Ok(Redirect::to(&genre.url()).into_response());
            }
        },
        Validation::Invalid { form, errors } => (form, errors),
    };
    debug!("Invalid genre form: {errors:?}");
    Ok(render_form(&state, "Update Genre", &form, &errors)?.into_response())
}

fn render_delete(
    state: &AppState,
    genre: &Genre,
    books: &[BookShort],
) -> ApiResult<Html<String>> {
    let mut context = Context::new();
    context.insert("genre", &Link::from(genre));
    context.insert("books", &views::<_, BookShortView>(books));
    render(state, "genre_delete.html", "Delete Genre", context)
}

pub async fn delete_confirm(
    Path(id): Path<i64>,
    repository: GenreRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let integrity = state.storage().integrity();
    match tokio::try_join!(repository.get(id), integrity.can_delete_genre(id)) {
        Ok((genre, check)) => {
            Ok(render_delete(&state, &genre, check.blockers())?.into_response())
        }
        Err(Error::RecordNotFound(_)) => {
            Ok(Redirect::to(&EntityKind::Genre.list_url()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete(
    repository: GenreRepository,
    State(state): State<AppState>,
    Form(body): Form<DeleteGenre>,
) -> ApiResult<Response> {
    let id: i64 = body
        .genreid
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidRequest("Invalid genre id".to_string()))?;

    match repository.delete_guarded(id).await? {
        Deletion::Deleted => Ok(Redirect::to(&EntityKind::Genre.list_url()).into_response()),
        Deletion::Blocked(books) => {
            let genre = repository.get(id).await?;
            Ok(render_delete(&state, &genre, &books)?.into_response())
        }
    }
}
