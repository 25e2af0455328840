//! Path helpers for the host's per-user directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::app;

/// Environment variable overriding the user directory.
pub const USER_PATH_ENV: &str = "LLM_USER_PATH";

/// Host directories (config) from the standard platform locations.
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "datasette", "llm")
}

/// User directory shared with the host: the value of `LLM_USER_PATH` when
/// set and non-empty, else the platform config dir (~/.config/llm/ on Linux).
pub fn resolve_user_dir(override_dir: Option<OsString>) -> Option<PathBuf> {
    if let Some(dir) = override_dir.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Stored API keys.
pub fn keys_path(user_dir: &Path) -> PathBuf {
    user_dir.join("keys.json")
}

/// Cached model catalog.
pub fn models_cache_path(user_dir: &Path) -> PathBuf {
    user_dir.join(app::MODELS_CACHE_FILE)
}
