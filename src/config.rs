use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::app;
use crate::paths;

/// Catalog URL override (proxies, tests).
pub const MODELS_URL_ENV: &str = "LLM_FIREWORKS_MODELS_URL";

/// Optional request timeout for the catalog download, in seconds.
pub const TIMEOUT_ENV: &str = "LLM_FIREWORKS_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    pub user_dir: PathBuf,
    pub models_url: String,
    pub api_base: String,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub headers: BTreeMap<String, String>,
    /// Register an async adapter alongside each sync one.
    pub async_support: bool,
    /// `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No user directory available; set LLM_USER_PATH")]
    NoUserDir,
    #[error("LLM_FIREWORKS_TIMEOUT_SECS must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

impl Config {
    /// Default endpoints and headers, with cache and keys under `user_dir`.
    pub fn new(user_dir: impl Into<PathBuf>) -> Self {
        let user_dir = user_dir.into();
        Self {
            cache_path: paths::models_cache_path(&user_dir),
            user_dir,
            models_url: app::MODELS_URL.to_string(),
            api_base: app::API_BASE.to_string(),
            cache_ttl: Duration::from_secs(app::MODELS_CACHE_TTL_SECS),
            headers: BTreeMap::from([("X-Title".to_string(), "LLM".to_string())]),
            async_support: true,
            timeout: None,
        }
    }
}

/// Load configuration from environment.
pub fn load() -> Result<Config, ConfigError> {
    from_lookup(|name| env::var_os(name))
}

fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let user_dir =
        paths::resolve_user_dir(lookup(paths::USER_PATH_ENV)).ok_or(ConfigError::NoUserDir)?;
    let mut config = Config::new(user_dir);

    if let Some(url) = lookup(MODELS_URL_ENV)
        .and_then(|v| v.into_string().ok())
        .filter(|v| !v.trim().is_empty())
    {
        config.models_url = url.trim().to_string();
    }

    if let Some(raw) = lookup(TIMEOUT_ENV) {
        let raw = raw.to_string_lossy().trim().to_string();
        let secs: u64 = raw
            .parse()
            .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
        config.timeout = Some(Duration::from_secs(secs));
    }

    Ok(config)
}
