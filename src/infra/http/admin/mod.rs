pub(crate) mod auth;
mod login;
mod posts;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};

use super::AppState;

pub(super) fn build_admin_router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(posts::dashboard))
        .route("/add", get(posts::add_form).post(posts::add_submit))
        .route("/edit/{id}", get(posts::edit_form).post(posts::edit_submit))
        .route("/delete/{id}", get(posts::delete))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::require_admin,
        ))
        .layer(DefaultBodyLimit::max(state.upload_body_limit));

    Router::new()
        .route("/login", get(login::login_form).post(login::login_submit))
        .route("/logout", get(login::logout))
        .merge(protected)
}
