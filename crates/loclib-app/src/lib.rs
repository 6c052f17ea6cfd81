pub mod catalog;
pub mod error;
pub mod form;
pub mod state;
pub mod view;

use axum::{middleware, routing::get, Router};

use crate::state::AppState;

/// Catalog pages with centralized error page rendering
pub fn app_router(state: AppState) -> Router<()> {
    Router::new()
        .route("/", get(catalog::root))
        .nest("/catalog", catalog::router())
        .fallback(error::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::render_error_page,
        ))
        .with_state(state)
}

#[macro_export]
macro_rules! repository_from_request {
    ($repo:ty, $getter:ident) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $repo {
            type Rejection = http::StatusCode;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                futures::future::ready(std::result::Result::Ok(state.storage().$getter()))
            }
        }
    };
}
