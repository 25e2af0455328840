//! Application and provider identity.
//!
//! Single source of truth for the names and endpoints used across the codebase.

/// Application name (from Cargo.toml `package.name`).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Application version (from Cargo.toml `package.version`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Provider name: credential alias and prefix of every registered model id.
pub const PROVIDER: &str = "fireworks";

/// Environment variable consulted when no key is stored.
pub const KEY_ENV_VAR: &str = "LLM_FIREWORKS_KEY";

/// OpenAI-compatible API base for chat requests.
pub const API_BASE: &str = "https://api.fireworks.ai/inference/v1";

/// Model listing endpoint.
pub const MODELS_URL: &str = "https://api.fireworks.ai/inference/v1/models";

/// File name of the cached model catalog in the user directory.
pub const MODELS_CACHE_FILE: &str = "fireworks_models.json";

/// Seconds a cached catalog is used before a re-download is attempted.
pub const MODELS_CACHE_TTL_SECS: u64 = 3600;
