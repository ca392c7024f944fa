use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::PostRecord;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

pub fn format_human_date(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| timestamp.date().to_string())
}

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, public_message, &error)
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error: err,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the shared error page. `detail` is only passed through when the
/// server is configured to expose diagnostics.
pub fn render_error_page(
    status: StatusCode,
    message: &str,
    detail: Option<String>,
) -> Response {
    let template = ErrorTemplate {
        title: format!("{} - Devblog", status.as_u16()),
        status: status.as_u16(),
        message: message.to_string(),
        detail,
    };
    let mut response = render_template_response(template, status);
    ErrorReport::from_message("presentation::views::render_error_page", status, message)
        .attach(&mut response);
    response
}

pub fn render_not_found_response() -> Response {
    render_error_page(StatusCode::NOT_FOUND, "Post not found", None)
}

/// Previous/next page links shared by the home feed and the dashboard.
#[derive(Debug, Clone)]
pub struct PaginationView {
    pub current_page: u32,
    pub total_pages: u64,
    pub base_path: String,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl PaginationView {
    pub fn new(current_page: u32, total_pages: u64, base_path: impl Into<String>) -> Self {
        let previous_page = (current_page > 1).then(|| current_page - 1);
        let next_page = (u64::from(current_page) < total_pages).then(|| current_page + 1);
        Self {
            current_page,
            total_pages,
            base_path: base_path.into(),
            previous_page,
            next_page,
        }
    }
}

pub struct PostCardView {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub slug: String,
    pub image: String,
    pub created_at: String,
}

impl PostCardView {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            subtitle: record.subtitle.clone(),
            author: record.author.clone(),
            slug: record.slug.clone(),
            image: record.image.clone(),
            created_at: format_human_date(record.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
}

pub struct PostDetailView {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub image: String,
    pub content: String,
    pub created_at: String,
}

impl PostDetailView {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            subtitle: record.subtitle.clone(),
            author: record.author.clone(),
            image: record.image.clone(),
            content: record.content.clone(),
            created_at: format_human_date(record.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub title: String,
    pub post: PostDetailView,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub error: Option<String>,
}

pub struct DashboardRowView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub created_at: String,
}

impl DashboardRowView {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            slug: record.slug.clone(),
            created_at: format_human_date(record.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub actor: String,
    pub posts: Vec<DashboardRowView>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "admin/add.html")]
pub struct AddPostTemplate {
    pub title: String,
}

pub struct EditPostFormView {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

#[derive(Template)]
#[template(path = "admin/edit.html")]
pub struct EditPostTemplate {
    pub title: String,
    pub post: EditPostFormView,
}
