use crate::{error::FetchError, fetch::Fetch};
use log::{debug, info, warn};
use std::{
    fmt,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Bucket,
    File,
}

/// Result of a transfer that did not fail with an unrecoverable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Downloaded {
        kind: SourceKind,
        source: String,
        destination: PathBuf,
    },
    PermissionDenied {
        source: String,
    },
    NotFound {
        source: String,
    },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Downloaded { .. })
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Downloaded {
                kind: SourceKind::Bucket,
                source,
                destination,
            } => write!(
                f,
                "The bucket {} has been downloaded to {}",
                source,
                destination.display()
            ),
            TransferOutcome::Downloaded {
                kind: SourceKind::File,
                source,
                destination,
            } => write!(
                f,
                "The file {} has been downloaded to {}",
                source,
                destination.display()
            ),
            TransferOutcome::PermissionDenied { source } => write!(
                f,
                "You tried to import {} but you do not have the right permission to do so !",
                source
            ),
            TransferOutcome::NotFound { source } => write!(f, "The file {} does not exist", source),
        }
    }
}

/// Copy a bucket, or a prefix inside one, to a local folder.
/// # Arguments
/// * `handle` - The store connection
/// * `source_bucket` - `bucket` or `bucket/prefix`
/// * `destination_folder` - The local folder, created if missing
/// * `recursive` - Copy everything under the prefix
/// # Return
/// * `Downloaded` or `PermissionDenied`, any other failure is returned as error.
///   A missing bucket is not recovered here, unlike in [`copy_file`].
pub fn copy_bucket<F: Fetch + ?Sized>(
    handle: &F,
    source_bucket: &str,
    destination_folder: impl AsRef<Path>,
    recursive: bool,
) -> Result<TransferOutcome, FetchError> {
    let destination_folder = destination_folder.as_ref();
    if source_bucket.trim().is_empty() {
        return Err(FetchError::InvalidSource("empty bucket name".to_string()));
    }
    debug!(
        "copy bucket {} to {} (recursive: {})",
        source_bucket,
        destination_folder.display(),
        recursive
    );
    match handle.fetch(source_bucket, destination_folder, recursive) {
        Ok(()) => Ok(TransferOutcome::Downloaded {
            kind: SourceKind::Bucket,
            source: source_bucket.to_string(),
            destination: destination_folder.to_path_buf(),
        }),
        Err(err) if err.is_permission_denied() => Ok(TransferOutcome::PermissionDenied {
            source: source_bucket.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Copy a single object to a local file.
/// # Arguments
/// * `handle` - The store connection
/// * `source_file` - `bucket/key` of the object
/// * `destination_file` - The local file path
/// # Return
/// * `Downloaded`, `PermissionDenied` or `NotFound`, any other failure is returned as error
pub fn copy_file<F: Fetch + ?Sized>(
    handle: &F,
    source_file: &str,
    destination_file: impl AsRef<Path>,
) -> Result<TransferOutcome, FetchError> {
    let destination_file = destination_file.as_ref();
    debug!("copy file {} to {}", source_file, destination_file.display());
    match handle.fetch(source_file, destination_file, false) {
        Ok(()) => Ok(TransferOutcome::Downloaded {
            kind: SourceKind::File,
            source: source_file.to_string(),
            destination: destination_file.to_path_buf(),
        }),
        Err(err) if err.is_permission_denied() => Ok(TransferOutcome::PermissionDenied {
            source: source_file.to_string(),
        }),
        Err(err) if err.is_not_found() => Ok(TransferOutcome::NotFound {
            source: source_file.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Print the outcome line to stdout and log it.
pub fn report(outcome: &TransferOutcome) {
    if outcome.is_success() {
        info!("{}", outcome);
    } else {
        warn!("{}", outcome);
    }
    println!("{}", outcome);
}
