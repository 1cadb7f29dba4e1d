use aws_sdk_s3::primitives::ByteStreamError;
use std::io;
use std::path::PathBuf;

/// Failure of a single fetch.
///
/// `PermissionDenied` and `NotFound` are the two kinds the transfer helpers
/// know how to recover from. Everything else is passed through to the caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("permission denied for {source_id}")]
    PermissionDenied { source_id: String },

    #[error("{source_id} not found")]
    NotFound { source_id: String },

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("s3 request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read object body: {0}")]
    Body(#[from] ByteStreamError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, FetchError::PermissionDenied { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// Maps a local io error, treating a permission failure on the
    /// destination the same as one on the remote side.
    pub(crate) fn from_local(source_id: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            FetchError::PermissionDenied {
                source_id: source_id.to_string(),
            }
        } else {
            FetchError::Io(err)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("failed to read config {path}: {err}")]
    Read { path: PathBuf, err: io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_permission_error_is_recoverable() {
        let err = FetchError::from_local(
            "bucket/a.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert!(err.is_permission_denied());
        let err = FetchError::from_local(
            "bucket/a.txt",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert!(matches!(err, FetchError::Io(_)));
        assert!(!err.is_not_found());
    }
}
