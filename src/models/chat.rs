//! Chat adapters handed to the host, one per catalog entry.
//!
//! Requests go through the OpenAI-compatible client; these types only carry
//! what the client needs to reach a Fireworks model.

use std::collections::BTreeMap;
use std::fmt;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;

use crate::app;

/// Construction parameters shared by the sync and async adapters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    /// Composite id, `fireworks/<catalog id>`.
    pub model_id: String,
    /// Catalog id as sent in requests.
    pub model_name: String,
    pub vision: bool,
    pub api_base: String,
    pub headers: BTreeMap<String, String>,
}

impl ModelOptions {
    pub fn new(
        catalog_id: &str,
        vision: bool,
        api_base: &str,
        headers: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            model_id: format!("{}/{}", app::PROVIDER, catalog_id),
            model_name: catalog_id.to_string(),
            vision,
            api_base: api_base.to_string(),
            headers: headers.clone(),
        }
    }
}

/// Accessors common to both adapters.
pub trait FireworksModel {
    /// Credential alias the host must resolve before calling the model.
    const NEEDS_KEY: &'static str = app::PROVIDER;
    /// Environment variable the host may read the key from.
    const KEY_ENV_VAR: &'static str = app::KEY_ENV_VAR;

    fn options(&self) -> &ModelOptions;

    fn model_id(&self) -> &str {
        &self.options().model_id
    }

    fn model_name(&self) -> &str {
        &self.options().model_name
    }

    fn supports_image_input(&self) -> bool {
        self.options().vision
    }

    fn api_base(&self) -> &str {
        &self.options().api_base
    }

    /// Extra headers sent with every chat request.
    fn headers(&self) -> &BTreeMap<String, String> {
        &self.options().headers
    }

    /// Client configuration for this model's endpoint, carrying [`headers`](Self::headers).
    /// Fails on a header name or value that is not valid HTTP.
    fn openai_config(&self, key: &str) -> Result<OpenAIConfig, OpenAIError> {
        self.headers().iter().try_fold(
            OpenAIConfig::new()
                .with_api_base(self.api_base())
                .with_api_key(key),
            |config, (name, value)| {
                let name = reqwest::header::HeaderName::try_from(name.as_str())
                    .map_err(|e| OpenAIError::InvalidArgument(e.to_string()))?;
                config.with_header(name, value.as_str())
            },
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FireworksChat {
    options: ModelOptions,
}

impl FireworksChat {
    pub fn new(options: ModelOptions) -> Self {
        Self { options }
    }
}

impl FireworksModel for FireworksChat {
    fn options(&self) -> &ModelOptions {
        &self.options
    }
}

impl fmt::Display for FireworksChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fireworks: {}", self.options.model_id)
    }
}

/// Async variant, registered when the host supports async models.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FireworksAsyncChat {
    options: ModelOptions,
}

impl FireworksAsyncChat {
    pub fn new(options: ModelOptions) -> Self {
        Self { options }
    }

    /// Async client bound to this model's endpoint.
    pub fn client(&self, key: &str) -> Result<Client<OpenAIConfig>, OpenAIError> {
        self.openai_config(key).map(Client::with_config)
    }
}

impl FireworksModel for FireworksAsyncChat {
    fn options(&self) -> &ModelOptions {
        &self.options
    }
}

impl fmt::Display for FireworksAsyncChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fireworks: {}", self.options.model_id)
    }
}
