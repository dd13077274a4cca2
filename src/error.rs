use std::{io, path::PathBuf};

use aws_sdk_s3::{
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bucket \"{bucket}\" does not exist")]
    BucketNotFound { bucket: String },

    /// The storage service answered with an error.
    #[error("storage service error {code}: {message}")]
    Service {
        code: String,
        message: String,
        status: Option<u16>,
    },

    /// Anything the SDK failed at before or after talking to the service.
    #[error("storage request failed: {0}")]
    Transport(String),

    #[error("cannot read source file {}: {source}", path.display())]
    SourceFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_service(&self) -> bool {
        matches!(self, StorageError::Service { .. })
    }

    /// HTTP status reported by the service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Service { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn empty(what: &str) -> Self {
        StorageError::InvalidArgument(format!("{what} must not be empty"))
    }
}

impl<E> From<SdkError<E, HttpResponse>> for StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(error: SdkError<E, HttpResponse>) -> Self {
        let status = error.raw_response().map(|raw| raw.status().as_u16());
        match error {
            SdkError::ServiceError(svc_err) => {
                let err = svc_err.err();
                StorageError::Service {
                    code: err.code().unwrap_or("Unknown").to_string(),
                    message: err
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| DisplayErrorContext(err).to_string()),
                    status,
                }
            }
            other => StorageError::Transport(DisplayErrorContext(&other).to_string()),
        }
    }
}
