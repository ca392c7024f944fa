use axum::{
    extract::{Form, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::application::auth::verify_password;
use crate::application::repos::UsersRepo;
use crate::presentation::views::{LoginTemplate, render_template_response};

use super::super::{AppState, render_repo_error};

/// Shown for unknown email and wrong password alike, so the form never
/// reveals which field was wrong.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

const LOGIN_TITLE: &str = "Admin Login - Devblog";

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    email: String,
    password: String,
}

pub(super) async fn login_form() -> Response {
    render_template_response(
        LoginTemplate {
            title: LOGIN_TITLE.to_string(),
            error: None,
        },
        StatusCode::OK,
    )
}

pub(super) async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.db.find_by_email(&form.email).await {
        Ok(user) => user,
        Err(err) => return render_repo_error("infra::http::login", err, state.expose_errors),
    };

    let user = match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            return render_template_response(
                LoginTemplate {
                    title: LOGIN_TITLE.to_string(),
                    error: Some(INVALID_CREDENTIALS.to_string()),
                },
                StatusCode::OK,
            );
        }
    };

    let session = state.sessions.issue(&user.name);
    let mut response = Redirect::to("/admin/").into_response();
    match HeaderValue::from_str(&state.sessions.set_cookie(&session)) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    info!(
        target = "devblog::http::login",
        actor = %user.name,
        "admin signed in"
    );
    response
}

/// Clears the session cookie unconditionally.
pub(super) async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Redirect::to("/admin/login").into_response();
    if let Ok(value) = HeaderValue::from_str(&state.sessions.clear_cookie()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
