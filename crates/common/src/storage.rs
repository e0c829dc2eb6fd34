//! Media storage for uploaded post images.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::{AppError, AppResult, IdGenerator};

/// Attempts made to find a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Stored file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Storage key, relative to the media root (e.g. `posts/cat.png`).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `dir` using `file_name`.
    ///
    /// If the name is taken, a different one is chosen; the returned key is
    /// the one actually written.
    async fn save(
        &self,
        dir: &str,
        file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    id_gen: IdGenerator,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
            id_gen: IdGenerator::new(),
        }
    }

    fn candidate_key(&self, dir: &str, file_name: &str, attempt: usize) -> String {
        let dir = dir.trim_matches('/');
        let name = if attempt == 0 {
            file_name.to_string()
        } else {
            let (stem, ext) = split_extension(file_name);
            let suffix = self.id_gen.generate_suffix();
            match ext {
                Some(ext) => format!("{stem}_{suffix}.{ext}"),
                None => format!("{stem}_{suffix}"),
            }
        };
        if dir.is_empty() {
            name
        } else {
            format!("{dir}/{name}")
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn save(
        &self,
        dir: &str,
        file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let file_name = sanitize_file_name(file_name);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let key = self.candidate_key(dir, &file_name, attempt);
            let path = self.base_path.join(&key);

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
            }

            // create_new makes the existence check and the create one step
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(AppError::Storage(format!("Failed to create file: {e}"))),
            };

            file.write_all(data)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;
            file.flush()
                .await
                .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

            tracing::debug!(key = %key, size = data.len(), "Stored media file");

            return Ok(UploadedFile {
                url: self.public_url(&key),
                key,
                size: data.len() as u64,
                content_type: content_type.to_string(),
            });
        }

        Err(AppError::Storage(format!(
            "No free name found for {file_name}"
        )))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        tokio::fs::try_exists(self.base_path.join(key))
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

/// Reduce an uploaded file name to a safe single path component.
#[must_use]
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos < name.len() - 1 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}
