//! API key storage: keys.json in the user directory, one entry per alias.
//!
//! The file is written with restrictive permissions (0o600 on Unix).

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde_json::{Map, Value};

use crate::paths;

/// Errors when storing an API key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("{} is not a JSON object", path.display())]
    InvalidFile { path: PathBuf },
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to store API key: {0}")]
    Io(#[from] io::Error),
}

/// Looks up a named credential.
pub trait KeyResolver {
    /// Returns the key for `alias`, consulting `env_var` when none is stored.
    /// Empty keys count as absent.
    fn resolve(&self, alias: &str, env_var: &str) -> Option<String>;
}

/// Keys persisted as a JSON object mapping alias to key.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Key store in the given user directory.
    pub fn in_user_dir(user_dir: &Path) -> Self {
        Self::new(paths::keys_path(user_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored key for `alias`. `None` if the file is absent, unreadable, or has no such key.
    pub fn get(&self, alias: &str) -> Option<String> {
        let keys = read_keys(&self.path).ok()?;
        let key = keys.get(alias)?.as_str()?.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Store `key` under `alias`, keeping the other entries.
    /// Creates the user directory if needed.
    pub fn set(&self, alias: &str, key: &str) -> Result<(), KeyError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut keys = if self.path.is_file() {
            read_keys(&self.path)?
        } else {
            let mut fresh = Map::new();
            fresh.insert(
                "// Note".to_string(),
                Value::String("This file stores secret API credentials. Do not share!".into()),
            );
            fresh
        };
        keys.insert(alias.to_string(), Value::String(key.trim().to_string()));

        let body = serde_json::to_string_pretty(&Value::Object(keys))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, body + "\n")?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl KeyResolver for KeyStore {
    fn resolve(&self, alias: &str, env_var: &str) -> Option<String> {
        if let Some(key) = self.get(alias) {
            return Some(key);
        }
        env::var(env_var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn read_keys(path: &Path) -> Result<Map<String, Value>, KeyError> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(KeyError::InvalidFile {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(KeyError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}
