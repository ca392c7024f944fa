//! The admin authorization gate.
//!
//! Every admin route except login and logout passes through
//! [`require_admin`]: the session cookie is read and verified, and on any
//! failure the request is redirected to the login page before it can reach
//! a handler or the store. Verified requests carry the actor's name in
//! their extensions as [`CurrentUser`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::application::auth::SessionAuthority;

/// The authenticated actor's name, available to admin handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

pub(crate) async fn require_admin(
    State(sessions): State<Arc<SessionAuthority>>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = extract_cookie(request.headers(), sessions.cookie_name())
        .and_then(|token| sessions.verify(&token));

    match actor {
        Some(name) => {
            request.extensions_mut().insert(CurrentUser(name));
            next.run(request).await
        }
        None => Redirect::to("/admin/login").into_response(),
    }
}

/// Extract a cookie value from request headers.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}
