//! Process configuration, loaded from the environment.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the process reads from its environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public base URL of this service, used to build the `complete_check`
    /// link embedded in check-run output.
    pub host_url: String,
    /// Scratch root for expanded snapshot trees.
    pub snapshot_root: PathBuf,
    /// Repository-relative path of the snapshot lock file.
    pub lock_file_path: String,
    pub s3_bucket: String,
    pub s3_access_id: String,
    pub s3_secret_access_key: String,
    pub s3_region: String,
    pub redis_url: String,
    pub github_token: String,
    pub github_api_url: String,
    pub port: u16,
    /// When set, webhook deliveries must carry a valid HMAC signature.
    pub webhook_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = optional("PORT", "3000");
        let port = port
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: port.clone(),
            })?;

        Ok(Self {
            host_url: required("HOST_URL")?,
            snapshot_root: PathBuf::from(required("SNAPSHOT_FOLDER")?),
            lock_file_path: required("LOCK_FILE_PATH")?,
            s3_bucket: required("S3_BUCKET")?,
            s3_access_id: required("S3_ACCESS_ID")?,
            s3_secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
            s3_region: optional("S3_REGION", "us-east-1"),
            redis_url: optional("REDIS_URL", "redis://127.0.0.1:6379"),
            github_token: required("GITHUB_TOKEN")?,
            github_api_url: optional("GITHUB_API_URL", "https://api.github.com"),
            port,
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &'static str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
