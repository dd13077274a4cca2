use std::{path::Path, time::Duration};

use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError,
    operation::{head_bucket::HeadBucketError, head_object::HeadObjectError},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use tracing::{debug, error};

use super::url::UrlResolver;
use crate::{
    config::Settings,
    error::{StorageError, StorageResult},
};

const STATUS_MOVED_PERMANENTLY: u16 = 301;
const STATUS_FORBIDDEN: u16 = 403;
const STATUS_NOT_FOUND: u16 = 404;

/// What the service reported back after storing an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

/// What the service reported back after deleting an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub key: String,
    pub delete_marker: bool,
    pub version_id: Option<String>,
}

/// The calls the façade forwards to the object-storage service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Plain URL of the object. Does not check that the object exists.
    async fn object_url(&self, bucket: &str, key: &str) -> StorageResult<String>;

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<UploadReceipt>;

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<DeleteReceipt>;
}

/// [`StorageBackend`] backed by the AWS SDK client.
pub struct SdkBackend {
    client: Client,
    urls: UrlResolver,
}

impl SdkBackend {
    pub fn new(client: Client, urls: UrlResolver) -> Self {
        Self { client, urls }
    }

    pub async fn from_settings(settings: &Settings) -> StorageResult<Self> {
        let urls = UrlResolver::from_settings(settings);
        let client = Client::from_conf(settings.s3_client_config().await);
        Ok(Self::new(client, urls))
    }
}

#[async_trait]
impl StorageBackend for SdkBackend {
    /// A bucket answering 403 or 301 exists: it belongs to someone else or
    /// lives in another region.
    #[tracing::instrument(skip(self))]
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let result = self.client.head_bucket().bucket(bucket).send().await;

        match result {
            Ok(_) => {
                debug!("bucket exists");
                Ok(true)
            }
            Err(SdkError::ServiceError(svc_err))
                if matches!(svc_err.err(), HeadBucketError::NotFound(_))
                    || svc_err.raw().status().as_u16() == STATUS_NOT_FOUND =>
            {
                debug!("bucket does not exist");
                Ok(false)
            }
            Err(SdkError::ServiceError(svc_err))
                if matches!(
                    svc_err.raw().status().as_u16(),
                    STATUS_FORBIDDEN | STATUS_MOVED_PERMANENTLY
                ) =>
            {
                debug!(status = svc_err.raw().status().as_u16(), "bucket exists but is not reachable");
                Ok(true)
            }
            Err(e) => {
                let err = StorageError::from(e);
                error!("failed to check bucket existence: {}", err);
                Err(err)
            }
        }
    }

    /// S3 answers 403 rather than 404 for a missing key when the caller may
    /// not list the bucket, so 403 counts as absent here.
    #[tracing::instrument(skip(self))]
    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("object exists");
                Ok(true)
            }
            Err(SdkError::ServiceError(svc_err))
                if matches!(svc_err.err(), HeadObjectError::NotFound(_))
                    || matches!(
                        svc_err.raw().status().as_u16(),
                        STATUS_NOT_FOUND | STATUS_FORBIDDEN
                    ) =>
            {
                debug!(status = svc_err.raw().status().as_u16(), "object does not exist");
                Ok(false)
            }
            Err(e) => {
                let err = StorageError::from(e);
                error!("failed to check object existence: {}", err);
                Err(err)
            }
        }
    }

    async fn object_url(&self, bucket: &str, key: &str) -> StorageResult<String> {
        self.urls.object_url(bucket, key).await
    }

    #[tracing::instrument(skip(self))]
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StorageError::InvalidArgument(format!("presigned URL expiry {expires_in:?}: {e}"))
        })?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                let err = StorageError::from(e);
                error!("failed to presign object URL: {}", err);
                err
            })?;

        debug!("presigned object URL");
        Ok(request.uri().to_string())
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<UploadReceipt> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::SourceFile {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type.essence_str())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let err = StorageError::from(e);
                error!("failed to upload object: {}", err);
                err
            })?;

        debug!(e_tag = ?output.e_tag(), "uploaded object");
        Ok(UploadReceipt {
            key: key.to_string(),
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<DeleteReceipt> {
        let output = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let err = StorageError::from(e);
                error!("failed to delete object: {}", err);
                err
            })?;

        debug!("deleted object");
        Ok(DeleteReceipt {
            key: key.to_string(),
            delete_marker: output.delete_marker().unwrap_or(false),
            version_id: output.version_id().map(str::to_string),
        })
    }
}
