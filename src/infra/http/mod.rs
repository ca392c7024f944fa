mod admin;
mod middleware;
mod public;

pub use admin::auth::CurrentUser;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    response::Response,
    routing::get,
};

use crate::application::auth::SessionAuthority;
use crate::application::error::HttpError;
use crate::application::repos::{BlogStore, RepoError};
use crate::infra::uploads::UploadStorage;
use crate::presentation::views::{ErrorTemplate, render_template_response};

/// Shared state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn BlogStore>,
    pub uploads: Arc<UploadStorage>,
    pub sessions: Arc<SessionAuthority>,
    pub page_size: u32,
    pub upload_body_limit: usize,
    pub expose_errors: bool,
}

pub fn build_router(state: AppState) -> Router {
    let admin_router = admin::build_admin_router(&state);

    Router::new()
        .route("/", get(public::index))
        .route("/post/{slug}", get(public::post_detail))
        .route("/images/{*path}", get(public::serve_image))
        .nest("/admin", admin_router)
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::log_responses))
        .layer(axum::middleware::from_fn(middleware::set_request_context))
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Post not found",
            "resource not found",
        ),
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            "database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            message,
        ),
    }
}

/// Render an [`HttpError`] as the shared error page. Diagnostic detail is
/// only shown when the server is configured to expose it.
pub(crate) fn render_http_error(err: HttpError, expose_errors: bool) -> Response {
    let (status, message, report) = err.into_parts();
    let detail = expose_errors.then(|| report.messages.join("\n"));
    let template = ErrorTemplate {
        title: format!("{} - Devblog", status.as_u16()),
        status: status.as_u16(),
        message: message.to_string(),
        detail,
    };
    let mut response = render_template_response(template, status);
    report.attach(&mut response);
    response
}

/// Shorthand for rendering a repository failure.
pub(crate) fn render_repo_error(
    source: &'static str,
    err: RepoError,
    expose_errors: bool,
) -> Response {
    render_http_error(repo_error_to_http(source, err), expose_errors)
}
