//! Invoice PDF storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

/// Errors from file storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Binary storage for invoice PDFs.
///
/// Returns opaque path references; callers persist the reference, not the
/// bytes.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores a file and returns its opaque path reference.
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Returns true if a previously stored path still exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

/// Local-disk storage under a single upload directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    upload_dir: PathBuf,
}

impl LocalFileStorage {
    /// Creates storage rooted at the given directory.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Creates the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        // Client-supplied names are reduced to their final component so
        // they cannot escape the upload directory.
        let safe_name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.pdf");
        let unique_name = format!("{}-{}", Utc::now().timestamp_millis(), safe_name);
        let path = self.upload_dir.join(unique_name);

        tokio::fs::write(&path, bytes).await?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalFileStorage {
        let dir = std::env::temp_dir().join(format!("invoice-storage-{}", uuid::Uuid::new_v4()));
        LocalFileStorage::new(dir)
    }

    #[tokio::test]
    async fn test_store_and_exists() {
        let storage = temp_storage();
        storage.ensure_dir().await.unwrap();

        let path = storage.store("invoice.pdf", b"%PDF-1.4").await.unwrap();

        assert!(path.ends_with("invoice.pdf"));
        assert!(storage.exists(&path).await.unwrap());
        assert!(!storage.exists("/nowhere/missing.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_strips_path_components_from_filename() {
        let storage = temp_storage();
        storage.ensure_dir().await.unwrap();

        let path = storage
            .store("../../etc/invoice.pdf", b"%PDF-1.4")
            .await
            .unwrap();

        assert!(!path.contains(".."));
        assert!(storage.exists(&path).await.unwrap());
    }
}
