//! Configuration structures for notarization runs.

use crate::error::{NotarizeError, Result};
use crate::secret::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of every scratch directory created by [`crate::temp::with_temp_dir`]
pub const TEMP_DIR_PREFIX: &str = "kodegen-notarize-";

/// Seconds between two status queries while a submission is in progress
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Apple ID credentials accepted by `altool`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppleIdCredentials {
    pub apple_id: String,
    /// App-specific password
    pub password: Secret,
    /// Provider short name, passed as `--asc-provider` when the Apple ID
    /// belongs to several teams
    #[serde(default)]
    pub team_id: Option<String>,
}

impl AppleIdCredentials {
    /// Load credentials from `APPLE_ID`, `APPLE_PASSWORD` and the optional
    /// `APPLE_TEAM_ID`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match (lookup("APPLE_ID"), lookup("APPLE_PASSWORD")) {
            (Some(apple_id), Some(password)) => Ok(Self {
                apple_id,
                password: Secret::new(password),
                team_id: lookup("APPLE_TEAM_ID").filter(|t| !t.is_empty()),
            }),
            _ => Err(NotarizeError::MissingConfig(
                "No notarization credentials found in environment.\n\
                 \n\
                 Set APPLE_ID + APPLE_PASSWORD (app-specific password),\n\
                 and APPLE_TEAM_ID if your Apple ID belongs to several teams."
                    .to_string(),
            )),
        }
    }
}

/// Configuration for a full notarization run, usually read from TOML.
///
/// ```toml
/// app_path = "target/release/bundle/osx/Kodegen.app"
/// bundle_id = "ai.kodegen.app"
/// apple_id = "dev@example.com"
/// password = "abcd-efgh-ijkl-mnop"
/// team_id = "ABCDE12345"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NotarizeConfig {
    pub app_path: PathBuf,
    pub bundle_id: String,

    #[serde(flatten)]
    pub credentials: AppleIdCredentials,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl NotarizeConfig {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.poll_interval_secs == 0 {
            return Err(NotarizeError::InvalidConfig(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
