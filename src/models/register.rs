//! Registration hook: one adapter (or a sync/async pair) per catalog entry.

use crate::app;
use crate::cache::{self, FetchError};
use crate::config::Config;
use crate::keys::KeyResolver;

use super::catalog::{self, CatalogError};
use super::chat::{FireworksAsyncChat, FireworksChat, ModelOptions};

/// What is handed to the host's `register` callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub model: FireworksChat,
    pub async_model: Option<FireworksAsyncChat>,
}

/// Result of a registration pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// No `fireworks` key; nothing was fetched or registered.
    MissingKey,
    /// Number of calls made to `register`.
    Registered(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Register every Fireworks model with the host.
///
/// Without a `fireworks` key this does nothing and returns
/// [`RegisterOutcome::MissingKey`]. Otherwise the catalog is read through the
/// cache and `register` is called once per entry, in catalog order. A fetch or
/// catalog error aborts before any call to `register`.
pub async fn register_models<K, F>(
    config: &Config,
    keys: &K,
    mut register: F,
) -> Result<RegisterOutcome, RegisterError>
where
    K: KeyResolver + ?Sized,
    F: FnMut(Registration),
{
    let Some(key) = keys.resolve(app::PROVIDER, app::KEY_ENV_VAR) else {
        log::debug!(
            "No {} key (set one or {}); skipping model registration",
            app::PROVIDER,
            app::KEY_ENV_VAR
        );
        return Ok(RegisterOutcome::MissingKey);
    };

    let client = cache::http_client(config.timeout)?;
    let document = cache::fetch_cached_json(
        &client,
        &config.models_url,
        &config.cache_path,
        config.cache_ttl,
        &key,
    )
    .await?;
    let entries = catalog::parse_catalog(&document)?;

    for entry in &entries {
        let options = ModelOptions::new(
            &entry.id,
            entry.supports_image_input,
            &config.api_base,
            &config.headers,
        );
        let async_model = config
            .async_support
            .then(|| FireworksAsyncChat::new(options.clone()));
        register(Registration {
            model: FireworksChat::new(options),
            async_model,
        });
    }

    log::debug!("Registered {} Fireworks models", entries.len());
    Ok(RegisterOutcome::Registered(entries.len()))
}
