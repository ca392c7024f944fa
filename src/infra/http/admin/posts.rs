use axum::{
    Extension,
    extract::{Form, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::pagination::{Page, PageQuery};
use crate::application::repos::{
    CreatePostParams, PostListScope, PostsRepo, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::domain::slug::slugify;
use crate::presentation::views::{
    AddPostTemplate, DashboardRowView, DashboardTemplate, EditPostFormView, EditPostTemplate,
    PaginationView, render_not_found_response, render_template_response,
};

use super::auth::CurrentUser;
use super::super::{AppState, render_http_error, render_repo_error};

/// `GET /admin/` — the actor's posts, newest first, paginated.
pub(super) async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = Page::new(query.page_number(), state.page_size);
    let scope = PostListScope::Author(actor.clone());

    let total = match state.db.count_posts(&scope).await {
        Ok(total) => total,
        Err(err) => return render_repo_error("infra::http::dashboard", err, state.expose_errors),
    };
    let posts = match state.db.list_posts(&scope, page).await {
        Ok(posts) => posts,
        Err(err) => return render_repo_error("infra::http::dashboard", err, state.expose_errors),
    };

    let template = DashboardTemplate {
        title: "Admin - Devblog".to_string(),
        actor,
        posts: posts.iter().map(DashboardRowView::from_record).collect(),
        pagination: PaginationView::new(page.number, page.total_pages(total), "/admin/"),
    };
    render_template_response(template, StatusCode::OK)
}

pub(super) async fn add_form() -> Response {
    render_template_response(
        AddPostTemplate {
            title: "Add New Post - Devblog".to_string(),
        },
        StatusCode::OK,
    )
}

struct NewPostForm {
    title: String,
    subtitle: String,
    content: String,
    image_name: String,
    image_data: Bytes,
}

/// `POST /admin/add` — create a post from a multipart form.
///
/// The image is written in two phases around the row insert: stage, insert,
/// finalize. A failed insert discards the staged file; a failed finalize
/// removes the row again so neither side leaks an orphan.
pub(super) async fn add_submit(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Response {
    let form = match collect_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return render_http_error(err, state.expose_errors),
    };

    let slug = slugify(&form.title);

    let staged = match state.uploads.stage(&form.image_name, form.image_data).await {
        Ok(staged) => staged,
        Err(err) => {
            let status = match err {
                crate::infra::uploads::UploadStorageError::EmptyPayload => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return render_http_error(
                HttpError::from_error(
                    "infra::http::add_post",
                    status,
                    "Could not store the uploaded image",
                    &err,
                ),
                state.expose_errors,
            );
        }
    };

    let params = CreatePostParams {
        title: form.title,
        subtitle: form.subtitle,
        content: form.content,
        author: actor,
        slug,
        image: format!("/images/{}", staged.file_name),
    };

    let post = match state.db.create_post(params).await {
        Ok(post) => post,
        Err(err) => {
            if let Err(cleanup) = state.uploads.discard(&staged).await {
                error!(
                    target = "devblog::http::add_post",
                    error = %cleanup,
                    staged = %staged.file_name,
                    "failed to discard staged upload after insert failure"
                );
            }
            return render_repo_error("infra::http::add_post", err, state.expose_errors);
        }
    };

    if let Err(err) = state.uploads.commit(&staged).await {
        // Compensate: the row must not reference a file that never arrived.
        if let Err(cleanup) = state.db.delete_post(post.id).await {
            error!(
                target = "devblog::http::add_post",
                error = %cleanup,
                post_id = %post.id,
                "failed to remove post after upload finalize failure"
            );
        }
        return render_http_error(
            HttpError::from_error(
                "infra::http::add_post",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not store the uploaded image",
                &err,
            ),
            state.expose_errors,
        );
    }

    info!(
        target = "devblog::http::add_post",
        post_id = %post.id,
        slug = %post.slug,
        "post created"
    );
    Redirect::to("/admin/").into_response()
}

pub(super) async fn edit_form(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    let post = match load_owned_post(&state, &id, &actor).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let template = EditPostTemplate {
        title: "Edit Post - Devblog".to_string(),
        post: EditPostFormView {
            id: post.id.to_string(),
            title: post.title,
            subtitle: post.subtitle,
            content: post.content,
        },
    };
    render_template_response(template, StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub(super) struct EditPostForm {
    title: String,
    subtitle: String,
    content: String,
}

/// `POST /admin/edit/{id}` — overwrite title/subtitle/content only.
pub(super) async fn edit_submit(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Form(form): Form<EditPostForm>,
) -> Response {
    let post = match load_owned_post(&state, &id, &actor).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let params = UpdatePostParams {
        id: post.id,
        title: form.title,
        subtitle: form.subtitle,
        content: form.content,
    };

    match state.db.update_post(params).await {
        Ok(_) => Redirect::to("/admin/").into_response(),
        Err(err) => render_repo_error("infra::http::edit_post", err, state.expose_errors),
    }
}

/// `GET /admin/delete/{id}` — remove a post; unknown ids are a 404, not a
/// redirect.
pub(super) async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    let post = match load_owned_post(&state, &id, &actor).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    match state.db.delete_post(post.id).await {
        Ok(()) => {
            info!(
                target = "devblog::http::delete_post",
                post_id = %post.id,
                "post deleted"
            );
            Redirect::to("/admin/").into_response()
        }
        Err(err) => render_repo_error("infra::http::delete_post", err, state.expose_errors),
    }
}

/// Load a post by its raw path id and verify the actor owns it.
///
/// Unparseable and unknown ids both come back as a 404 page; a post owned
/// by someone else is a 403.
async fn load_owned_post(
    state: &AppState,
    raw_id: &str,
    actor: &str,
) -> Result<PostRecord, Response> {
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return Err(render_not_found_response());
    };

    let post = match state.db.find_by_id(id).await {
        Ok(post) => post,
        Err(err) => {
            return Err(render_repo_error(
                "infra::http::load_post",
                err,
                state.expose_errors,
            ));
        }
    };

    let Some(post) = post else {
        return Err(render_not_found_response());
    };

    if post.author != actor {
        return Err(render_http_error(
            HttpError::new(
                "infra::http::load_post",
                StatusCode::FORBIDDEN,
                "You can only change your own posts",
                format!("post {id} belongs to `{}`", post.author),
            ),
            state.expose_errors,
        ));
    }

    Ok(post)
}

async fn collect_post_form(mut multipart: Multipart) -> Result<NewPostForm, HttpError> {
    let mut title = None;
    let mut subtitle = None;
    let mut content = None;
    let mut image = None;

    loop {
        let field = multipart.next_field().await.map_err(|err| {
            HttpError::from_error(
                "infra::http::add_post",
                StatusCode::BAD_REQUEST,
                "Invalid form submission",
                &err,
            )
        })?;
        let Some(field) = field else { break };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(read_text_field(field).await?),
            Some("subtitle") => subtitle = Some(read_text_field(field).await?),
            Some("content") => content = Some(read_text_field(field).await?),
            Some("image") => {
                let file_name = field
                    .file_name()
                    .filter(|value| !value.is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let data = field.bytes().await.map_err(|err| {
                    HttpError::from_error(
                        "infra::http::add_post",
                        StatusCode::BAD_REQUEST,
                        "Invalid form submission",
                        &err,
                    )
                })?;
                image = Some((file_name, data));
            }
            _ => {}
        }
    }

    let (image_name, image_data) = image.ok_or_else(|| missing_field("image"))?;
    Ok(NewPostForm {
        title: title.ok_or_else(|| missing_field("title"))?,
        subtitle: subtitle.ok_or_else(|| missing_field("subtitle"))?,
        content: content.ok_or_else(|| missing_field("content"))?,
        image_name,
        image_data,
    })
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, HttpError> {
    field.text().await.map_err(|err| {
        HttpError::from_error(
            "infra::http::add_post",
            StatusCode::BAD_REQUEST,
            "Invalid form submission",
            &err,
        )
    })
}

fn missing_field(name: &'static str) -> HttpError {
    HttpError::new(
        "infra::http::add_post",
        StatusCode::BAD_REQUEST,
        "Missing form field",
        format!("`{name}` is required"),
    )
}
