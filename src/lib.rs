//! import files and buckets from s3 compatible storage to the local disk
use flexi_logger::{Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle};
use std::path::Path;

pub mod config;
pub mod error;
pub mod fetch;
pub mod s3;
pub mod transfer;

pub use config::S3Config;
pub use error::{ConfigError, FetchError};
pub use fetch::Fetch;
pub use s3::S3Fetcher;
pub use transfer::{copy_bucket, copy_file, report, SourceKind, TransferOutcome};

/// init logger
/// keep the returned handle alive for as long as logs should be written
/// # Arguments
/// * `log_path` - Directory for log files, log to stderr if not set
pub fn init_logger(log_path: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str("info")?;
    match log_path {
        Some(path) => logger
            .log_to_file(FileSpec::default().directory(path).basename("s3-import"))
            .duplicate_to_stderr(Duplicate::Warn)
            .start(),
        None => logger.log_to_stderr().start(),
    }
}
