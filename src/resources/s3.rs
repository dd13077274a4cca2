use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{error, info, warn};

use super::{
    backend::{SdkBackend, StorageBackend},
    bucket::Bucket,
};
use crate::{
    config::Settings,
    error::{StorageError, StorageResult},
};

/// Entry point to the object-storage service.
///
/// Hands out one [`Bucket`] per bucket name. A bucket is checked for existence
/// the first time it is requested and served from the cache afterwards.
pub struct S3 {
    backend: Arc<dyn StorageBackend>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl S3 {
    /// Create an `S3` resource with the configuration loaded from the
    /// environment.
    pub async fn from_env() -> StorageResult<Self> {
        let settings = Settings::from_env()?;
        Self::from_settings(&settings).await
    }

    /// Create an `S3` resource with the provided `settings`.
    pub async fn from_settings(settings: &Settings) -> StorageResult<Self> {
        info!(
            region = %settings.region,
            api_version = %settings.api_version,
            static_credentials = settings.credentials.is_some(),
            "initializing storage client"
        );
        let backend = SdkBackend::from_settings(settings).await?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the handle for `name`.
    ///
    /// # Errors
    ///
    /// `StorageError::BucketNotFound` if the service reports no such bucket.
    /// Missing buckets are not cached, so a later call checks again.
    pub async fn bucket(&self, name: &str) -> StorageResult<Bucket> {
        if name.is_empty() {
            return Err(StorageError::empty("bucket name"));
        }

        if let Some(bucket) = self.cache().get(name) {
            return Ok(bucket.clone());
        }

        if !self.backend.bucket_exists(name).await? {
            warn!(bucket = name, "bucket does not exist");
            return Err(StorageError::BucketNotFound {
                bucket: name.to_string(),
            });
        }

        let bucket = self
            .cache()
            .entry(name.to_string())
            .or_insert_with(|| Bucket::new(name.to_string(), Arc::clone(&self.backend)))
            .clone();
        info!(bucket = name, "bucket loaded");
        Ok(bucket)
    }

    /// Names of the buckets loaded so far, sorted.
    pub fn cached_buckets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deletes `key` from `bucket` if it exists, logging instead of failing.
    ///
    /// Returns whether an object was deleted.
    pub async fn try_remove_object(&self, bucket: &str, key: &str) -> bool {
        let result: StorageResult<bool> = async {
            let bucket = self.bucket(bucket).await?;
            info!(bucket = bucket.name(), key, "attempting to delete object");
            if !bucket.object_exists(key).await? {
                return Ok(false);
            }
            bucket.remove_file(key).await.map(|_| true)
        }
        .await;

        match result {
            Ok(removed) => removed,
            Err(StorageError::Service { code, message, .. }) => {
                error!(bucket, key, %code, ex = %message, "failed to delete object");
                false
            }
            Err(e) => {
                error!(bucket, key, ex = %e, "failed to delete object");
                false
            }
        }
    }
}
