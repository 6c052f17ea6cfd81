pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
mod listing;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Router,
};
use loclib_dal::dashboard::dashboard_counts;
use serde::Serialize;
use tera::Context;

use crate::{error::ApiResult, form::FieldError, state::AppState};
pub use listing::Listing;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .merge(author::router())
        .merge(genre::router())
        .merge(book::router())
        .merge(book_instance::router())
}

/// Site root just points to the catalog
pub async fn root() -> impl IntoResponse {
    Redirect::to("/catalog")
}

pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let counts = dashboard_counts(state.storage()).await?;
    let mut context = Context::new();
    context.insert("counts", &counts);
    render(&state, "index.html", "Local Library Home", context)
}

pub(crate) fn render(
    state: &AppState,
    template: &str,
    title: &str,
    mut context: Context,
) -> ApiResult<Html<String>> {
    context.insert("site_name", &state.config().site_name);
    context.insert("title", title);
    let html = state.templates().render(template, &context)?;
    Ok(Html(html))
}

/// Context of re-rendered form: submitted values and their errors
pub(crate) fn form_context<F: Serialize>(form: &F, errors: &[FieldError]) -> Context {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context
}
