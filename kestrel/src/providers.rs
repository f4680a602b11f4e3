//! Stable provider construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use kobserve::{
    CompositeProviderHooks, MetricsObservabilityHooks, SafeProviderHooks,
    TracingObservabilityHooks,
};
use kprovider::adapters::bedrock::{BedrockConfig, DEFAULT_MODEL_ID};

use crate::{ModelProvider, ProviderError, ProviderOperationHooks, SecretString};

pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
pub const REGION_ENV: &str = "AWS_REGION";
pub const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";

#[derive(Debug, Clone)]
pub struct BedrockBuildConfig {
    pub region: String,
    pub bearer_token: SecretString,
    pub model_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub timeout: Duration,
}

impl BedrockBuildConfig {
    pub fn new(region: impl Into<String>, bearer_token: impl Into<SecretString>) -> Self {
        Self {
            region: region.into(),
            bearer_token: bearer_token.into(),
            model_id: None,
            endpoint_url: None,
            timeout: Duration::from_secs(90),
        }
    }

    /// Region from `AWS_REGION` then `AWS_DEFAULT_REGION`, model from `BEDROCK_MODEL_ID`,
    /// token from `AWS_BEARER_TOKEN_BEDROCK`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let region = read(REGION_ENV)
            .or_else(|| read(DEFAULT_REGION_ENV))
            .ok_or_else(|| {
                ProviderError::invalid_request("AWS_REGION or AWS_DEFAULT_REGION must be set")
            })?;
        let token = lookup(BEARER_TOKEN_ENV).unwrap_or_default();

        Ok(Self {
            model_id: BedrockConfig::from_env_with(&lookup).model_id,
            ..Self::new(region, token)
        })
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Layers this build configuration over `settings`: a model named here wins,
    /// default options and request parameters come from `settings`.
    pub fn provider_config(&self, settings: BedrockConfig) -> BedrockConfig {
        match &self.model_id {
            Some(model_id) => settings.with_model_id(model_id.clone()),
            None => settings,
        }
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.bearer_token.is_empty() {
            return Err(ProviderError::authentication(
                "Bedrock bearer token must not be empty",
            ));
        }

        if self.region.trim().is_empty() {
            return Err(ProviderError::invalid_request(
                "Bedrock region must not be empty",
            ));
        }

        Ok(())
    }
}

/// Tracing plus metrics hooks, each isolated so a panicking hook cannot fail a call.
pub fn default_observability_hooks() -> Arc<dyn ProviderOperationHooks> {
    Arc::new(
        CompositeProviderHooks::new()
            .with(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)))
            .with(Arc::new(SafeProviderHooks::new(MetricsObservabilityHooks))),
    )
}

/// Builds a Bedrock provider over the HTTP transport with default observability hooks.
pub fn build_bedrock_provider(
    config: BedrockBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    build_bedrock_provider_with(config, BedrockConfig::new(), default_observability_hooks())
}

/// Like [`build_bedrock_provider`], layering `settings` (default model, default
/// options, request parameters) under the build configuration and reporting to `hooks`.
pub fn build_bedrock_provider_with(
    config: BedrockBuildConfig,
    settings: BedrockConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    config.validate()?;

    let provider_config = config.provider_config(settings);

    tracing::debug!(
        region = %config.region,
        model = provider_config.model_id.as_deref().unwrap_or(DEFAULT_MODEL_ID),
        "building bedrock provider"
    );
    build_http_provider(config, provider_config, hooks)
}

#[cfg(feature = "transport-http")]
fn build_http_provider(
    config: BedrockBuildConfig,
    provider_config: BedrockConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use kprovider::adapters::bedrock::{BedrockHttpTransport, BedrockProvider};

    let http = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    let mut transport = BedrockHttpTransport::new(http, config.region, config.bearer_token);
    if let Some(endpoint_url) = config.endpoint_url {
        transport = transport.with_endpoint_url(endpoint_url);
    }

    let provider = BedrockProvider::new(Arc::new(transport), provider_config)?.with_hooks(hooks);
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "transport-http"))]
fn build_http_provider(
    _config: BedrockBuildConfig,
    _provider_config: BedrockConfig,
    _hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::transport_unavailable(
        "transport-http feature is not enabled on kestrel",
    ))
}
