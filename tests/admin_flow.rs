//! End-to-end admin workflow against an in-memory store: login, create,
//! edit, delete, and the ownership rules between them.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use uuid::Uuid;

#[tokio::test]
async fn unknown_email_and_wrong_password_render_the_same_error() {
    let app = TestApp::new();
    app.store.seed_user("Jane", "jane@example.com", "hunter2");

    let unknown = app
        .post_form(
            "/admin/login",
            "email=nobody%40example.com&password=hunter2",
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown_body = common::body_text(unknown).await;

    let wrong = app
        .post_form(
            "/admin/login",
            "email=jane%40example.com&password=wrong",
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::OK);
    let wrong_body = common::body_text(wrong).await;

    assert_eq!(unknown_body, wrong_body);
    assert!(unknown_body.contains("Invalid email or password"));
}

#[tokio::test]
async fn successful_login_sets_a_verifiable_session_cookie() {
    let app = TestApp::new();
    app.store.seed_user("Jane", "jane@example.com", "hunter2");

    let response = app
        .post_form(
            "/admin/login",
            "email=jane%40example.com&password=hunter2",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(common::location_of(&response).as_deref(), Some("/admin/"));

    let set_cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii cookie")
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));

    let token = set_cookie
        .strip_prefix("devblog_session=")
        .and_then(|rest| rest.split(';').next())
        .expect("token");
    assert_eq!(app.sessions.verify(token), Some("Jane".to_string()));

    // The cookie opens the dashboard.
    let cookie = format!("devblog_session={token}");
    let dashboard = app.get_with_cookie("/admin/", &cookie).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = common::body_text(dashboard).await;
    assert!(body.contains("Signed in as Jane"));
}

#[tokio::test]
async fn add_post_persists_record_slug_and_image() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");

    let body = common::new_post_body(
        "Hello, World!  Foo",
        "A greeting",
        "<p>Body text</p>",
        "header pic.PNG",
        b"fake png bytes",
    );
    let response = app.post_multipart("/admin/add", body, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(common::location_of(&response).as_deref(), Some("/admin/"));

    let posts = app.store.all_posts();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post.title, "Hello, World!  Foo");
    assert_eq!(post.slug, "hello-world-foo");
    assert_eq!(post.author, "Jane");
    assert!(post.image.starts_with("/images/"));
    assert!(post.image.ends_with("-header-pic.png"));

    // The committed file is publicly served under its stored path.
    let image = app.get(&post.image).await;
    assert_eq!(image.status(), StatusCode::OK);
    assert_eq!(common::body_text(image).await, "fake png bytes");

    // And the post is readable by slug.
    let page = app.get("/post/hello-world-foo").await;
    assert_eq!(page.status(), StatusCode::OK);
    let page_body = common::body_text(page).await;
    assert!(page_body.contains("<p>Body text</p>"));
}

#[tokio::test]
async fn add_post_without_an_image_is_an_error_and_stores_nothing() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");

    let mut body = Vec::new();
    for (name, value) in [("title", "T"), ("subtitle", "S"), ("content", "C")] {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                common::MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", common::MULTIPART_BOUNDARY).as_bytes());

    let response = app.post_multipart("/admin/add", body, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.all_posts().is_empty());
}

#[tokio::test]
async fn edit_changes_content_fields_and_nothing_else() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");
    let id = app.store.seed_post("Original", "Jane", "original", 60);
    let before = app.store.post_by_id(id).expect("seeded post");

    let form = app
        .get_with_cookie(&format!("/admin/edit/{id}"), &cookie)
        .await;
    assert_eq!(form.status(), StatusCode::OK);
    let form_body = common::body_text(form).await;
    assert!(form_body.contains("Original"));

    let response = app
        .post_form(
            &format!("/admin/edit/{id}"),
            "title=Updated&subtitle=New+subtitle&content=New+content",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let after = app.store.post_by_id(id).expect("post still present");
    assert_eq!(after.title, "Updated");
    assert_eq!(after.subtitle, "New subtitle");
    assert_eq!(after.content, "New content");
    assert_eq!(after.slug, before.slug);
    assert_eq!(after.image, before.image);
    assert_eq!(after.author, before.author);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn edit_and_delete_refuse_posts_owned_by_someone_else() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");
    let id = app.store.seed_post("Not Yours", "Ahmed", "not-yours", 60);

    let response = app
        .get_with_cookie(&format!("/admin/edit/{id}"), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get_with_cookie(&format!("/admin/delete/{id}"), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.store.post_by_id(id).is_some());
}

#[tokio::test]
async fn delete_removes_the_post_and_missing_ids_are_not_found() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");
    let id = app.store.seed_post("Doomed", "Jane", "doomed", 60);

    let response = app
        .get_with_cookie(&format!("/admin/delete/{id}"), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(common::location_of(&response).as_deref(), Some("/admin/"));
    assert!(app.store.post_by_id(id).is_none());

    // Deleting it again, or any unknown id, is a 404.
    let response = app
        .get_with_cookie(&format!("/admin/delete/{id}"), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get_with_cookie(&format!("/admin/delete/{}", Uuid::new_v4()), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unparseable identifiers count as unknown, not as server errors.
    let response = app
        .get_with_cookie("/admin/delete/not-a-uuid", &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_lists_only_the_actors_posts() {
    let app = TestApp::new();
    let cookie = app.cookie_for("Jane");
    app.store.seed_post("Mine", "Jane", "mine", 10);
    app.store.seed_post("Theirs", "Ahmed", "theirs", 20);

    let response = app.get_with_cookie("/admin/", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_text(response).await;
    assert!(body.contains("Mine"));
    assert!(!body.contains("Theirs"));
}
