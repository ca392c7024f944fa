use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::application::repos::{
    CreatePostParams, PostListScope, PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{PgRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "id, title, subtitle, content, author, slug, image, created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    subtitle: String,
    content: String,
    author: String,
    slug: String,
    image: String,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
            content: row.content,
            author: row.author,
            slug: row.slug,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PgRepositories {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        page: Page,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let limit = i64::try_from(page.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let rows = match scope {
            PostListScope::Public => {
                sqlx::query_as::<_, PostRow>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool())
                .await
            }
            PostListScope::Author(author) => {
                sqlx::query_as::<_, PostRow>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE author = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                ))
                .bind(author)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool())
                .await
            }
        }
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_posts(&self, scope: &PostListScope) -> Result<u64, RepoError> {
        let count: i64 = match scope {
            PostListScope::Public => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                    .fetch_one(self.pool())
                    .await
            }
            PostListScope::Author(author) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author = $1")
                    .bind(author)
                    .fetch_one(self.pool())
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        u64::try_from(count).map_err(|_| RepoError::from_persistence("negative row count"))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        // Slugs carry no uniqueness constraint; take the oldest match.
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 \
             ORDER BY created_at ASC LIMIT 1",
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            subtitle,
            content,
            author,
            slug,
            image,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (id, title, subtitle, content, author, slug, image, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {POST_COLUMNS}",
        ))
        .bind(id)
        .bind(title)
        .bind(subtitle)
        .bind(content)
        .bind(author)
        .bind(slug)
        .bind(image)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            subtitle,
            content,
        } = params;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, subtitle = $3, content = $4 \
             WHERE id = $1 RETURNING {POST_COLUMNS}",
        ))
        .bind(id)
        .bind(title)
        .bind(subtitle)
        .bind(content)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
