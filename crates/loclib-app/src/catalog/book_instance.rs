use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use loclib_dal::{
    book_instance::{BookInstanceRepository, InstanceStatus},
    detail,
    integrity::EntityKind,
    Error,
};
use serde::Deserialize;
use tera::Context;
use tracing::debug;

use super::{form_context, render, Listing};
use crate::{
    error::{ApiError, ApiResult},
    form::{validate, BookInstanceForm, FieldError, Validation},
    repository_from_request,
    state::AppState,
    view::{views, BookInstanceView, Choice},
};

repository_from_request!(BookInstanceRepository, book_instances);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookinstances", get(list))
        .route("/bookinstance/create", get(create_form).post(create))
        .route("/bookinstance/delete", post(delete))
        .route("/bookinstance/{id}", get(show))
        .route(
            "/bookinstance/{id}/update",
            get(not_implemented).post(not_implemented),
        )
        .route(
            "/bookinstance/{id}/delete",
            get(delete_confirm).post(delete),
        )
}

#[derive(Debug, Deserialize)]
pub struct DeleteBookInstance {
    bookinstanceid: String,
}

pub async fn list(
    repository: BookInstanceRepository,
    State(state): State<AppState>,
    Query(listing): Query<Listing>,
) -> ApiResult<Html<String>> {
    let instances = repository.list(listing.into_listing_params()?).await?;
    let mut context = Context::new();
    context.insert("instances", &views::<_, BookInstanceView>(&instances));
    render(&state, "bookinstance_list.html", "Book Instance List", context)
}

pub async fn show(Path(id): Path<i64>, State(state): State<AppState>) -> ApiResult<Html<String>> {
    let instance = detail::book_instance_detail(state.storage(), id).await?;
    let mut context = Context::new();
    context.insert("instance", &BookInstanceView::from(&instance));
    render(&state, "bookinstance_detail.html", "Book Instance Detail", context)
}

async fn render_form(
    state: &AppState,
    form: &BookInstanceForm,
    errors: &[FieldError],
) -> ApiResult<Html<String>> {
    let books = state.storage().books().list_all().await?;
    let book_choices: Vec<_> = books
        .iter()
        .map(|b| Choice::new(b.id, b.title.clone(), form.book == b.id.to_string()))
        .collect();
    let selected_status = if form.status.is_empty() {
        InstanceStatus::default().as_str()
    } else {
        form.status.as_str()
    };
    let status_choices: Vec<_> = InstanceStatus::ALL
        .iter()
        .map(|s| Choice::new(s, s.as_str(), s.as_str() == selected_status))
        .collect();

    let mut context = form_context(form, errors);
    context.insert("books", &book_choices);
    context.insert("statuses", &status_choices);
    render(state, "bookinstance_form.html", "Create Book Instance", context)
}

pub async fn create_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render_form(&state, &BookInstanceForm::default(), &[]).await
}

pub async fn create(
    repository: BookInstanceRepository,
    State(state): State<AppState>,
    Form(form): Form<BookInstanceForm>,
) -> ApiResult<Response> {
    match validate(form) {
        Validation::Valid(draft) => match repository.create(draft.clone()).await {
            Ok(instance) => Ok(Redirect::to(&instance.url()).into_response()),
            Err(Error::ReferentialConflict(reason)) => {
                debug!("Book instance refers to missing book: {reason}");
                let error = FieldError::new("book", "Book: not found");
                let form = BookInstanceForm::from(&draft);
                Ok(render_form(&state, &form, &[error]).await?.into_response())
            }
            Err(e) => Err(e.into()),
        },
        Validation::Invalid { form, errors } => {
            debug!("Invalid book instance form: {errors:?}");
            Ok(render_form(&state, &form, &errors).await?.into_response())
        }
    }
}

/// Copies cannot be edited yet
pub async fn not_implemented() -> ApiError {
    ApiError::NotImplemented("Book instance update".to_string())
}

pub async fn delete_confirm(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    match detail::book_instance_detail(state.storage(), id).await {
        Ok(instance) => {
            let mut context = Context::new();
            context.insert("instance", &BookInstanceView::from(&instance));
            let page = render(&state, "bookinstance_delete.html", "Delete Book Instance", context)?;
            Ok(page.into_response())
        }
        Err(Error::RecordNotFound(_)) => {
            Ok(Redirect::to(&EntityKind::BookInstance.list_url()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Nothing refers to a copy, so it is deleted right away
pub async fn delete(
    repository: BookInstanceRepository,
    Form(body): Form<DeleteBookInstance>,
) -> ApiResult<Response> {
    let id: i64 = body
        .bookinstanceid
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidRequest("Invalid book instance id".to_string()))?;

    repository.delete(id).await?;
    Ok(Redirect::to(&EntityKind::BookInstance.list_url()).into_response())
}
