use crate::{config::S3Config, error::FetchError, fetch::Fetch};
use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_s3::{
    config::Credentials,
    error::{ProvideErrorMetadata, SdkError},
    Client,
};
use log::{debug, info, warn};
use std::{
    fs,
    io::Write,
    path::{Component, Path, PathBuf},
};
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

const PERMISSION_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
];
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];
const STAGING_PREFIX: &str = ".s3-import-";

/// `bucket/key` split out of a source identifier.
#[derive(Debug, PartialEq, Eq)]
struct ObjectPath<'a> {
    bucket: &'a str,
    key: &'a str,
}

fn parse_source(source: &str) -> Result<ObjectPath<'_>, FetchError> {
    let trimmed = source.trim();
    let trimmed = trimmed.strip_prefix("s3://").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');
    let (bucket, key) = match trimmed.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (trimmed, ""),
    };
    if bucket.is_empty() {
        return Err(FetchError::InvalidSource(format!(
            "no bucket in {:?}",
            source
        )));
    }
    Ok(ObjectPath { bucket, key })
}

/// Listing prefix for a recursive fetch, the whole bucket for an empty key.
fn tree_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}

/// Path of `key` relative to the tree root, `None` when the key would land
/// outside of it.
fn relative_path(prefix: &str, key: &str) -> Option<PathBuf> {
    let relative = Path::new(key.strip_prefix(prefix).unwrap_or(key));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(relative.to_path_buf())
}

/// Target file of a single object fetch. An existing directory receives the
/// object under its basename.
fn file_target(destination: &Path, key: &str) -> PathBuf {
    if destination.is_dir() {
        let name = key.rsplit('/').find(|s| !s.is_empty()).unwrap_or(key);
        destination.join(name)
    } else {
        destination.to_path_buf()
    }
}

fn classify<E>(source: &str, err: SdkError<E>) -> FetchError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|resp| resp.status().as_u16());
    let code = err.as_service_error().and_then(|e| e.code());
    let source_id = source.to_string();
    if status == Some(403) || code.map_or(false, |c| PERMISSION_CODES.contains(&c)) {
        return FetchError::PermissionDenied { source_id };
    }
    if status == Some(404) || code.map_or(false, |c| NOT_FOUND_CODES.contains(&c)) {
        return FetchError::NotFound { source_id };
    }
    FetchError::Transport(Box::new(err))
}

/// Creates the directory holding `path` and returns it.
fn create_parent(source: &str, path: &Path) -> Result<PathBuf, FetchError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| FetchError::from_local(source, err))?;
    Ok(parent.to_path_buf())
}

/// Client handle backed by `aws-sdk-s3`.
///
/// Owns a runtime so [`Fetch::fetch`] can block the caller.
pub struct S3Fetcher {
    client: Client,
    runtime: Runtime,
}

impl S3Fetcher {
    pub fn new(config: &S3Config) -> Result<Self, FetchError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let client = runtime.block_on(create_s3_client(config));
        Ok(Self { client, runtime })
    }

    async fn download_object(
        &self,
        source: &str,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let mut resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(source, err))?;
        // the body goes to a temp file next to the destination so a broken
        // stream never clobbers what is already there
        let parent = create_parent(source, destination)?;
        let mut staged =
            NamedTempFile::new_in(&parent).map_err(|err| FetchError::from_local(source, err))?;
        let mut byte_count = 0_u64;
        while let Some(bytes) = resp.body.try_next().await? {
            staged.write_all(&bytes)?;
            byte_count += bytes.len() as u64;
        }
        staged
            .persist(destination)
            .map_err(|err| FetchError::from_local(source, err.error))?;
        debug!("{}/{} -> {} ({} bytes)", bucket, key, destination.display(), byte_count);
        Ok(byte_count)
    }

    async fn list_keys(&self, source: &str, bucket: &str, prefix: &str) -> Result<Vec<String>, FetchError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(|err| classify(source, err))?;
            keys.extend(resp.contents().iter().filter_map(|obj| obj.key()).map(str::to_string));
            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(keys)
    }

    async fn download_tree(
        &self,
        source: &str,
        path: &ObjectPath<'_>,
        destination: &Path,
    ) -> Result<(), FetchError> {
        let prefix = tree_prefix(path.key);
        let keys = self.list_keys(source, path.bucket, &prefix).await?;
        if keys.is_empty() {
            if path.key.is_empty() {
                fs::create_dir_all(destination).map_err(|err| FetchError::from_local(source, err))?;
                return Ok(());
            }
            // not a prefix, maybe a plain object
            let target = file_target(destination, path.key);
            self.download_object(source, path.bucket, path.key, &target).await?;
            return Ok(());
        }
        // nothing lands in the destination until every object is fetched
        let parent = create_parent(source, destination)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .map_err(|err| FetchError::from_local(source, err))?;
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut total = 0_u64;
        for key in &keys {
            let Some(relative) = relative_path(&prefix, key) else {
                warn!("skip {}: key leaves {}", key, destination.display());
                continue;
            };
            if key.ends_with('/') {
                dirs.push(relative);
                continue;
            }
            let staged = staging.path().join(&relative);
            total += self.download_object(source, path.bucket, key, &staged).await?;
            files.push(relative);
        }
        fs::create_dir_all(destination).map_err(|err| FetchError::from_local(source, err))?;
        for dir in &dirs {
            fs::create_dir_all(destination.join(dir))
                .map_err(|err| FetchError::from_local(source, err))?;
        }
        for relative in &files {
            let target = destination.join(relative);
            create_parent(source, &target)?;
            fs::rename(staging.path().join(relative), &target)
                .map_err(|err| FetchError::from_local(source, err))?;
        }
        info!(
            "fetched {} objects ({} bytes) from {} into {}",
            files.len(),
            total,
            source,
            destination.display()
        );
        Ok(())
    }
}

impl Fetch for S3Fetcher {
    fn fetch(&self, source: &str, destination: &Path, recursive: bool) -> Result<(), FetchError> {
        let path = parse_source(source)?;
        if recursive {
            return self.runtime.block_on(self.download_tree(source, &path, destination));
        }
        if path.key.is_empty() {
            return Err(FetchError::InvalidSource(format!(
                "{} names a bucket, not an object",
                source
            )));
        }
        let target = file_target(destination, path.key);
        self.runtime
            .block_on(self.download_object(source, path.bucket, path.key, &target))?;
        Ok(())
    }
}

pub async fn create_s3_client(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region().to_string()))
        .endpoint_url(config.endpoint_url())
        // If tries is 1, there are no retries.
        .retry_config(RetryConfig::standard().with_max_attempts(config.tries()));
    if let Some((access_key_id, secret_access_key)) = config.key_pair() {
        loader = loader.credentials_provider(Credentials::new(
            access_key_id,
            secret_access_key,
            config.session_token.clone(),
            None,
            "S3Config",
        ));
    }
    let shared_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .force_path_style(config.force_path_style())
        .build();
    Client::from_conf(s3_config)
}
