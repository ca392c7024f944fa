use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use crate::application::pagination::{Page, PageQuery};
use crate::application::repos::{PostListScope, PostsRepo};
use crate::infra::uploads::UploadStorageError;
use crate::presentation::views::{
    IndexTemplate, PaginationView, PostCardView, PostDetailView, PostTemplate,
    render_error_page, render_not_found_response, render_template_response,
};

use super::{AppState, render_repo_error};

/// `GET /` — the paginated public feed, newest first.
pub(super) async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = Page::new(query.page_number(), state.page_size);

    let total = match state.db.count_posts(&PostListScope::Public).await {
        Ok(total) => total,
        Err(err) => return render_repo_error("infra::http::index", err, state.expose_errors),
    };
    let posts = match state.db.list_posts(&PostListScope::Public, page).await {
        Ok(posts) => posts,
        Err(err) => return render_repo_error("infra::http::index", err, state.expose_errors),
    };

    let template = IndexTemplate {
        title: "Home - Devblog".to_string(),
        posts: posts.iter().map(PostCardView::from_record).collect(),
        pagination: PaginationView::new(page.number, page.total_pages(total), "/"),
    };
    render_template_response(template, StatusCode::OK)
}

/// `GET /post/{slug}` — a single post, or a rendered 404.
pub(super) async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let post = match state.db.find_by_slug(&slug).await {
        Ok(post) => post,
        Err(err) => return render_repo_error("infra::http::post_detail", err, state.expose_errors),
    };

    match post {
        Some(post) => {
            let template = PostTemplate {
                title: format!("{} - Devblog", post.title),
                post: PostDetailView::from_record(&post),
            };
            render_template_response(template, StatusCode::OK)
        }
        None => render_not_found_response(),
    }
}

/// `GET /images/{*path}` — serve a committed upload.
pub(super) async fn serve_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.uploads.read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, mime.as_ref())
                .header(CACHE_CONTROL, "public, max-age=3600")
                .body(Body::from(data))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(UploadStorageError::InvalidPath) => {
            render_error_page(StatusCode::NOT_FOUND, "Not Found", None)
        }
        Err(UploadStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            render_error_page(StatusCode::NOT_FOUND, "Not Found", None)
        }
        Err(err) => super::render_http_error(
            crate::application::error::HttpError::from_error(
                "infra::http::serve_image",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                &err,
            ),
            state.expose_errors,
        ),
    }
}

/// Catch-all 404 for unmatched paths.
pub(super) async fn fallback() -> Response {
    render_error_page(StatusCode::NOT_FOUND, "Not Found", None)
}
