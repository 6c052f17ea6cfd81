use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use http::StatusCode;
use tracing::{debug, error};

use crate::state::AppState;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Storage error: {0}")]
    StorageError(loclib_dal::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),
}

impl From<loclib_dal::Error> for ApiError {
    fn from(e: loclib_dal::Error) -> Self {
        match e {
            loclib_dal::Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            loclib_dal::Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Cannot sort by {field}"))
            }
            loclib_dal::Error::ReferentialConflict(msg) => ApiError::Conflict(msg),
            other => ApiError::StorageError(other),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidQuery(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::StorageError(_) | ApiError::TemplateError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to user, internals of server failures are only logged
    fn public_message(&self) -> String {
        match self {
            ApiError::StorageError(e) if e.is_transient() => {
                "Catalog storage is not available now, please try again later".to_string()
            }
            ApiError::StorageError(_) | ApiError::TemplateError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Error details left in response for [`render_error_page`]
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request error: {self}");
        }
        let message = self.public_message();
        let mut response = (status, message.clone()).into_response();
        response
            .extensions_mut()
            .insert(ErrorInfo { status, message });
        response
    }
}

pub async fn not_found(request: Request) -> ApiError {
    ApiError::ResourceNotFound(format!("Page {}", request.uri().path()))
}

/// Replaces plain text error responses with HTML error page
pub async fn render_error_page(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(info) = response.extensions().get::<ErrorInfo>().cloned() else {
        return response;
    };

    let mut context = tera::Context::new();
    context.insert("site_name", &state.config().site_name);
    context.insert("title", info.status.canonical_reason().unwrap_or("Error"));
    context.insert("status", &info.status.as_u16());
    context.insert("message", &tera::escape_html(&info.message));

    match state.templates().render("error.html", &context) {
        Ok(html) => (info.status, Html(html)).into_response(),
        Err(e) => {
            error!("Cannot render error page: {e}");
            response
        }
    }
}
