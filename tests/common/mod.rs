//! In-memory store and request helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use devblog::application::auth::{SessionAuthority, hash_password};
use devblog::application::pagination::Page;
use devblog::application::repos::{
    CreatePostParams, PostListScope, PostsRepo, RepoError, UpdatePostParams, UsersRepo,
};
use devblog::domain::entities::{PostRecord, UserRecord};
use devblog::infra::http::{AppState, build_router};
use devblog::infra::uploads::UploadStorage;

pub const SESSION_COOKIE: &str = "devblog_session";
pub const TEST_SECRET: &[u8] = b"integration-test-secret";

/// A `BlogStore` held in memory, counting every call so tests can assert
/// the store was never touched.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<UserRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    hits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Insert a user directly, hashing the password the way provisioning does.
    pub fn seed_user(&self, name: &str, email: &str, password: &str) {
        self.users.lock().unwrap().push(UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
            created_at: OffsetDateTime::now_utc(),
        });
    }

    /// Insert a post directly, backdated so ordering is deterministic.
    pub fn seed_post(&self, title: &str, author: &str, slug: &str, age_secs: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.lock().unwrap().push(PostRecord {
            id,
            title: title.to_string(),
            subtitle: format!("{title} subtitle"),
            content: format!("<p>{title} content</p>"),
            author: author.to_string(),
            slug: slug.to_string(),
            image: "/images/seeded.png".to_string(),
            created_at: OffsetDateTime::now_utc() - time::Duration::seconds(age_secs),
        });
        id
    }

    pub fn post_by_id(&self, id: Uuid) -> Option<PostRecord> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn all_posts(&self) -> Vec<PostRecord> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        page: Page,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.touch();
        let mut posts: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| match scope {
                PostListScope::Public => true,
                PostListScope::Author(author) => &post.author == author,
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count_posts(&self, scope: &PostListScope) -> Result<u64, RepoError> {
        self.touch();
        let count = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| match scope {
                PostListScope::Public => true,
                PostListScope::Author(author) => &post.author == author,
            })
            .count();
        Ok(count as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.touch();
        Ok(self.post_by_id(id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.touch();
        let posts = self.posts.lock().unwrap();
        Ok(posts
            .iter()
            .filter(|post| post.slug == slug)
            .min_by_key(|post| post.created_at)
            .cloned())
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.touch();
        let record = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            subtitle: params.subtitle,
            content: params.content,
            author: params.author,
            slug: params.slug,
            image: params.image,
            created_at: OffsetDateTime::now_utc(),
        };
        self.posts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        self.touch();
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.subtitle = params.subtitle;
        post.content = params.content;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.touch();
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|post| post.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        self.touch();
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError> {
        self.touch();
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|user| user.email == email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(record.clone());
        Ok(record)
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<SessionAuthority>,
    // Held so the upload directory outlives the test.
    _uploads_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        let uploads_dir = tempfile::tempdir().expect("upload tempdir");
        let sessions = Arc::new(SessionAuthority::new(
            TEST_SECRET.to_vec(),
            time::Duration::hours(1),
            SESSION_COOKIE,
        ));
        let state = AppState {
            db: store.clone(),
            uploads: Arc::new(
                UploadStorage::new(uploads_dir.path().to_path_buf()).expect("upload storage"),
            ),
            sessions: sessions.clone(),
            page_size: 10,
            upload_body_limit: 2 * 1024 * 1024,
            expose_errors: false,
        };

        Self {
            app: build_router(state),
            store,
            sessions,
            _uploads_dir: uploads_dir,
        }
    }

    /// A valid session cookie for the given actor.
    pub fn cookie_for(&self, actor: &str) -> String {
        let session = self.sessions.issue(actor);
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        body: Vec<u8>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router")
    }
}

pub const MULTIPART_BOUNDARY: &str = "devblog-test-boundary";

/// Build a multipart body for the add-post form.
pub fn new_post_body(
    title: &str,
    subtitle: &str,
    content: &str,
    image_name: &str,
    image: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [
        ("title", title),
        ("subtitle", subtitle),
        ("content", content),
    ] {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{image_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location_of(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
