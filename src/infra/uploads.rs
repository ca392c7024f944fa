//! Two-phase upload storage.
//!
//! Post images are written in two steps so a failed database write never
//! leaves a live file in the public area: the payload is first staged under
//! a private directory, and only after the post row exists is the file
//! renamed into its final, publicly served location. The caller discards
//! the staged file when the row insert fails, and compensates (removes the
//! row) when the final rename fails.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

const STAGING_DIR: &str = ".staging";

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// A payload written to the staging area, not yet publicly visible.
///
/// `file_name` is the relative path the file will occupy once committed;
/// it is what gets persisted on the post record (prefixed with the public
/// mount point by the caller).
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub file_name: String,
    pub checksum: String,
    pub size_bytes: i64,
    staged_name: String,
}

/// Filesystem-backed storage for post images.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating the
    /// public root and the staging area if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self { root })
    }

    /// Write the payload to the staging area and return a handle that can
    /// be committed or discarded.
    pub async fn stage(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StagedUpload, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let file_name = build_stored_name(original_name);
        let staged_name = file_name.replace('/', "-");
        let staged_path = self.root.join(STAGING_DIR).join(&staged_name);

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let checksum = hex::encode(hasher.finalize());
        let size_bytes = i64::try_from(data.len()).unwrap_or(i64::MAX);

        fs::write(&staged_path, &data).await?;

        Ok(StagedUpload {
            file_name,
            checksum,
            size_bytes,
            staged_name,
        })
    }

    /// Move a staged payload into its final, publicly served location.
    pub async fn commit(&self, staged: &StagedUpload) -> Result<(), UploadStorageError> {
        let from = self.root.join(STAGING_DIR).join(&staged.staged_name);
        let to = self.resolve(&staged.file_name)?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(from, to).await?;
        Ok(())
    }

    /// Remove a staged payload. Missing files are treated as success.
    pub async fn discard(&self, staged: &StagedUpload) -> Result<(), UploadStorageError> {
        let path = self.root.join(STAGING_DIR).join(&staged.staged_name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    /// Read a committed payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Resolve the absolute filesystem path for a stored upload, rejecting
    /// absolute paths and parent-directory traversal.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_name(original_name: &str) -> String {
    let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
    let directory = format!("{year}/{:02}/{:02}", month as u8, day);
    let identifier = Uuid::new_v4();
    let filename = sanitize_filename(original_name);
    format!("{directory}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
