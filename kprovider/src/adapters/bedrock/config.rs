//! Bedrock provider configuration.
//!
//! Only request-shaping settings live here. Where requests are sent (region,
//! endpoint, credentials) belongs to the transport.

use kcommon::GenerationOptions;
use serde_json::{Map, Value};

pub const DEFAULT_MODEL_ID: &str = "mistral.mistral-small-2402-v1:0";

pub const MODEL_ID_ENV: &str = "BEDROCK_MODEL_ID";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BedrockConfig {
    pub model_id: Option<String>,
    /// Inference parameters applied where a request leaves them unset.
    pub default_options: GenerationOptions,
    /// Extra top-level fields merged into every Converse body.
    pub request_params: Map<String, Value>,
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, ignoring blank values.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            model_id: read(MODEL_ID_ENV),
            ..Self::default()
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_default_options(mut self, options: GenerationOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_request_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request_params.insert(key.into(), value);
        self
    }

    /// The request's model when named, then the configured model, then the default.
    pub fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if !requested.trim().is_empty() {
            return requested;
        }

        self.model_id
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL_ID)
    }
}
