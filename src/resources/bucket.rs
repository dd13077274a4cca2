use std::{path::Path, sync::Arc, time::Duration};

use super::{
    backend::{DeleteReceipt, StorageBackend, UploadReceipt},
    object::Object,
};
use crate::error::StorageResult;

/// Handle to a bucket known to exist. The name never changes after creation.
#[derive(Clone)]
pub struct Bucket {
    name: String,
    backend: Arc<dyn StorageBackend>,
}

impl Bucket {
    pub(crate) fn new(name: String, backend: Arc<dyn StorageBackend>) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self, key: impl Into<String>) -> Object {
        Object::new(self.name.clone(), key.into(), Arc::clone(&self.backend))
    }

    pub async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        self.object(key).exists().await
    }

    /// Gets the object URL if the object exists, `None` otherwise.
    pub async fn object_url(&self, key: &str) -> StorageResult<Option<String>> {
        self.object(key).url().await
    }

    pub async fn presigned_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<Option<String>> {
        self.object(key).presigned_url(expires_in).await
    }

    pub async fn upload_file(
        &self,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<UploadReceipt> {
        self.object(key).upload_from(path).await
    }

    /// Removes an object from the bucket. Removing a missing key is not an error
    /// as far as the service is concerned.
    pub async fn remove_file(&self, key: &str) -> StorageResult<DeleteReceipt> {
        self.object(key).remove().await
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
