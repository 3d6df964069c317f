//! Runtime configuration
//!
//! Settings are resolved from CLI flags, which clap already backfills from
//! `VENDORDASH_*` environment variables (and `.env`, loaded in `main`).

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheManager, FileStore, DEFAULT_NAMESPACE};
use crate::cli::Cli;
use crate::data::{BackendError, RestClient};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {flag} (or set {env})")]
    Missing {
        flag: &'static str,
        env: &'static str,
    },

    #[error("Invalid API URL '{0}': must be an http(s) URL")]
    InvalidUrl(String),

    #[error("Cache namespace cannot be empty")]
    EmptyNamespace,
}

/// Where cached data lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Explicit directory; `None` uses the platform cache dir
    pub dir: Option<PathBuf>,
    pub namespace: String,
}

impl CacheSettings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let namespace = match cli.namespace.as_deref() {
            Some(ns) if ns.trim().is_empty() => return Err(ConfigError::EmptyNamespace),
            Some(ns) => ns.to_string(),
            None => DEFAULT_NAMESPACE.to_string(),
        };
        Ok(Self {
            dir: cli.cache_dir.clone(),
            namespace,
        })
    }

    /// Opens the cache, falling back to memory when no cache dir exists
    pub fn open(&self) -> CacheManager {
        let store = match &self.dir {
            Some(dir) => Some(FileStore::with_dir(dir.clone())),
            None => FileStore::new(),
        };
        let cache = match store {
            Some(store) => {
                debug!(dir = %store.dir().display(), "Using file cache");
                CacheManager::new(Arc::new(store))
            }
            None => {
                warn!("No cache directory available, caching in memory only");
                CacheManager::in_memory()
            }
        };
        cache.with_namespace(self.namespace.clone())
    }
}

/// Connection details for the marketplace backend
#[derive(Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub api_url: String,
    pub api_key: String,
    pub vendor_id: String,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("vendor_id", &self.vendor_id)
            .finish()
    }
}

impl BackendSettings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_parts(cli.api_url.clone(), cli.api_key.clone(), cli.vendor_id.clone())
    }

    pub fn from_parts(
        api_url: Option<String>,
        api_key: Option<String>,
        vendor_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_url = required(api_url, "--api-url", "VENDORDASH_API_URL")?;
        let api_key = required(api_key, "--api-key", "VENDORDASH_API_KEY")?;
        let vendor_id = required(vendor_id, "--vendor-id", "VENDORDASH_VENDOR_ID")?;

        match reqwest::Url::parse(&api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidUrl(api_url)),
        }

        Ok(Self {
            api_url,
            api_key,
            vendor_id,
        })
    }

    pub fn client(&self) -> Result<RestClient, BackendError> {
        RestClient::new(self.api_url.clone(), self.api_key.clone())
    }
}

fn required(
    value: Option<String>,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::Missing { flag, env }),
    }
}
