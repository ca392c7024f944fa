//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// A provisioned account. Created once by the `create-user` tool and
/// immutable afterwards; `password_hash` is the hex SHA-256 digest of the
/// plaintext, never the plaintext itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// A published post. `author` is the denormalized name of the account that
/// created it, not a foreign key. `slug` and `image` are fixed at creation;
/// edits touch title, subtitle, and content only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author: String,
    pub slug: String,
    pub image: String,
    pub created_at: OffsetDateTime,
}
