use std::{path::Path, sync::Arc, time::Duration};

use super::backend::{DeleteReceipt, StorageBackend, UploadReceipt};
use crate::error::{StorageError, StorageResult};

/// A single key inside a bucket.
#[derive(Clone)]
pub struct Object {
    pub bucket_name: String,
    pub key: String,
    backend: Arc<dyn StorageBackend>,
}

impl Object {
    pub(crate) fn new(bucket_name: String, key: String, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            bucket_name,
            key,
            backend,
        }
    }

    fn checked_key(&self) -> StorageResult<&str> {
        if self.key.is_empty() {
            return Err(StorageError::empty("object key"));
        }
        Ok(&self.key)
    }

    pub async fn exists(&self) -> StorageResult<bool> {
        let key = self.checked_key()?;
        self.backend.object_exists(&self.bucket_name, key).await
    }

    /// URL of the object, or `None` when it does not exist.
    pub async fn url(&self) -> StorageResult<Option<String>> {
        if !self.exists().await? {
            return Ok(None);
        }
        self.backend
            .object_url(&self.bucket_name, &self.key)
            .await
            .map(Some)
    }

    /// Time-limited GET URL, or `None` when the object does not exist.
    pub async fn presigned_url(&self, expires_in: Duration) -> StorageResult<Option<String>> {
        if !self.exists().await? {
            return Ok(None);
        }
        self.backend
            .presigned_get_url(&self.bucket_name, &self.key, expires_in)
            .await
            .map(Some)
    }

    /// Stores the contents of the local file at `path` under this key.
    pub async fn upload_from(&self, path: impl AsRef<Path>) -> StorageResult<UploadReceipt> {
        let key = self.checked_key()?;
        self.backend
            .put_file(&self.bucket_name, key, path.as_ref())
            .await
    }

    pub async fn remove(&self) -> StorageResult<DeleteReceipt> {
        let key = self.checked_key()?;
        self.backend.delete_object(&self.bucket_name, key).await
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("bucket_name", &self.bucket_name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
