use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{env, path::Path};

pub const ENDPOINT_ENV: &str = "AWS_S3_ENDPOINT";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TRIES: u32 = 3;

/// Connection settings for the object store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Hostname of the store, `https://` is added when no scheme is given
    pub endpoint: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Max attempts per request, 1 means no retries
    #[serde(default)]
    pub tries: Option<u32>,
    #[serde(default)]
    pub force_path_style: Option<bool>,
}

impl S3Config {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Reads the endpoint from `AWS_S3_ENDPOINT` and the optional region and
    /// keys from the usual AWS variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var(ENDPOINT_ENV).map_err(|_| ConfigError::MissingEnv(ENDPOINT_ENV))?;
        Ok(Self::with_env_credentials(endpoint))
    }

    /// Given endpoint, region and keys from the environment.
    pub fn with_env_credentials(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            session_token: env::var("AWS_SESSION_TOKEN").ok(),
            tries: None,
            force_path_style: None,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            err,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        }
    }

    pub fn region(&self) -> &str {
        match &self.region {
            Some(region) if !region.is_empty() => region,
            _ => DEFAULT_REGION,
        }
    }

    pub fn tries(&self) -> u32 {
        self.tries.unwrap_or(DEFAULT_TRIES).max(1)
    }

    pub fn force_path_style(&self) -> bool {
        self.force_path_style.unwrap_or(true)
    }

    /// Key pair to sign with, only when both halves are set.
    pub fn key_pair(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            S3Config::new("minio.lab.example.org").endpoint_url(),
            "https://minio.lab.example.org"
        );
        assert_eq!(
            S3Config::new("http://localhost:9000").endpoint_url(),
            "http://localhost:9000"
        );
    }

    #[test]
    fn test_defaults() {
        let config = S3Config::new("minio.lab.example.org");
        assert_eq!(config.region(), "us-east-1");
        assert_eq!(config.tries(), 3);
        assert!(config.force_path_style());
        assert!(config.key_pair().is_none());
    }

    #[test]
    fn test_parse_json() {
        let config: S3Config = serde_json::from_str(
            r#"{
                "endpoint": "minio.lab.example.org",
                "region": "eu-west-3",
                "access_key_id": "AKIA",
                "secret_access_key": "secret",
                "tries": 0
            }"#,
        )
        .unwrap();
        assert_eq!(config.region(), "eu-west-3");
        assert_eq!(config.key_pair(), Some(("AKIA", "secret")));
        assert_eq!(config.tries(), 1);
        assert!(config.session_token.is_none());
    }

    #[test]
    fn test_key_pair_needs_both_halves() {
        let mut config = S3Config::new("minio.lab.example.org");
        config.access_key_id = Some("AKIA".to_string());
        assert!(config.key_pair().is_none());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3.json");
        std::fs::write(&path, r#"{"endpoint": "minio.lab.example.org"}"#).unwrap();
        let config = S3Config::from_json_file(&path).unwrap();
        assert_eq!(config.endpoint_url(), "https://minio.lab.example.org");

        let missing = S3Config::from_json_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
