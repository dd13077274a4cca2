//! Bucket and object operations over S3-compatible storage.
//!
//! ```no_run
//! # async fn run() -> Result<(), s3_facade::StorageError> {
//! let s3 = s3_facade::S3::from_env().await?;
//! let bucket = s3.bucket("assets").await?;
//! if let Some(url) = bucket.object_url("README.md").await? {
//!     println!("{url}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod resources;

pub use config::{Settings, StaticCredentials};
pub use error::{StorageError, StorageResult};
pub use resources::{
    backend::{DeleteReceipt, SdkBackend, StorageBackend, UploadReceipt},
    bucket::Bucket,
    object::Object,
    s3::S3,
    url::UrlResolver,
};
