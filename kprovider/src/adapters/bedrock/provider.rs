//! Bedrock provider implementations over the transport boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    BoxedEventStream, ModelIdentity, ModelProvider, ModelRequest, ModelResponse,
    NoopOperationHooks, ProviderError, ProviderFuture, ProviderId, ProviderOperationHooks,
};

use super::assembler::{AssembledIter, StreamContext, assemble_stream};
use super::config::BedrockConfig;
use super::errors::classify_error;
use super::request::format_request;
use super::response::parse_response;
use super::transport::{BedrockTransport, BlockingBedrockTransport, ConverseEventIter};
use super::types::{ConverseRequest, ConverseResponse};

const COMPLETE_OPERATION: &str = "complete";
const STREAM_OPERATION: &str = "stream";

#[derive(Clone)]
pub struct BedrockProvider {
    transport: Arc<dyn BedrockTransport>,
    config: BedrockConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl BedrockProvider {
    /// Fails with `TransportUnavailable` unless the transport supports both operations.
    pub fn new(
        transport: Arc<dyn BedrockTransport>,
        config: BedrockConfig,
    ) -> Result<Self, ProviderError> {
        transport.capabilities().require_all()?;

        Ok(Self {
            transport,
            config,
            hooks: Arc::new(NoopOperationHooks),
        })
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &BedrockConfig {
        &self.config
    }

    pub fn identity(&self, request: &ModelRequest) -> ModelIdentity {
        identity(&self.config, request)
    }

    pub fn build_converse_request(
        &self,
        request: ModelRequest,
    ) -> Result<ConverseRequest, ProviderError> {
        build_converse_request(&self.config, request)
    }
}

impl std::fmt::Debug for BedrockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockProvider")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelProvider for BedrockProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Bedrock
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            let identity = self.identity(&request);
            let started_at = Instant::now();
            self.hooks.on_request_start(&identity, COMPLETE_OPERATION);

            let result = match self.build_converse_request(request) {
                Ok(converse) => match self.transport.converse(converse).await {
                    Ok(response) => {
                        report_provider_latency(self.hooks.as_ref(), &identity, &response);
                        parse_response(response)
                    }
                    Err(error) => Err(error),
                },
                Err(error) => Err(error),
            };

            finish_complete(self.hooks.as_ref(), &identity, started_at, result)
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let identity = self.identity(&request);
            let started_at = Instant::now();
            self.hooks.on_request_start(&identity, STREAM_OPERATION);

            let opened = match self.build_converse_request(request) {
                Ok(converse) => self.transport.converse_stream(converse).await,
                Err(error) => Err(error),
            };
            let events = opened.map_err(|error| {
                fail(self.hooks.as_ref(), &identity, STREAM_OPERATION, error)
            })?;

            let context = StreamContext::new(identity)
                .with_hooks(Arc::clone(&self.hooks))
                .with_started_at(started_at);
            Ok(Box::pin(assemble_stream(events, context)) as BoxedEventStream<'a>)
        })
    }
}

/// Blocking counterpart of [`BedrockProvider`].
#[derive(Clone)]
pub struct BlockingBedrockProvider {
    transport: Arc<dyn BlockingBedrockTransport>,
    config: BedrockConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl BlockingBedrockProvider {
    pub fn new(
        transport: Arc<dyn BlockingBedrockTransport>,
        config: BedrockConfig,
    ) -> Result<Self, ProviderError> {
        transport.capabilities().require_all()?;

        Ok(Self {
            transport,
            config,
            hooks: Arc::new(NoopOperationHooks),
        })
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &BedrockConfig {
        &self.config
    }

    pub fn id(&self) -> ProviderId {
        ProviderId::Bedrock
    }

    pub fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let identity = identity(&self.config, &request);
        let started_at = Instant::now();
        self.hooks.on_request_start(&identity, COMPLETE_OPERATION);

        let result = build_converse_request(&self.config, request)
            .and_then(|converse| self.transport.converse(converse))
            .inspect(|response| report_provider_latency(self.hooks.as_ref(), &identity, response))
            .and_then(parse_response);

        finish_complete(self.hooks.as_ref(), &identity, started_at, result)
    }

    /// Opens a stream and returns an iterator of response increments.
    pub fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> Result<AssembledIter<ConverseEventIter<'a>>, ProviderError> {
        let identity = identity(&self.config, &request);
        let started_at = Instant::now();
        self.hooks.on_request_start(&identity, STREAM_OPERATION);

        let events = build_converse_request(&self.config, request)
            .and_then(|converse| self.transport.converse_stream(converse))
            .map_err(|error| fail(self.hooks.as_ref(), &identity, STREAM_OPERATION, error))?;

        let context = StreamContext::new(identity)
            .with_hooks(Arc::clone(&self.hooks))
            .with_started_at(started_at);
        Ok(AssembledIter::new(events, context))
    }
}

impl std::fmt::Debug for BlockingBedrockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingBedrockProvider")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn identity(config: &BedrockConfig, request: &ModelRequest) -> ModelIdentity {
    ModelIdentity::new(ProviderId::Bedrock, config.resolve_model(&request.model))
}

/// Resolves model and options against the configuration, validates, then formats.
fn build_converse_request(
    config: &BedrockConfig,
    mut request: ModelRequest,
) -> Result<ConverseRequest, ProviderError> {
    request.model = config.resolve_model(&request.model).to_string();
    request.options = request.options.or(&config.default_options);
    request.validate()?;

    format_request(&request, &config.request_params)
}

fn finish_complete(
    hooks: &dyn ProviderOperationHooks,
    identity: &ModelIdentity,
    started_at: Instant,
    result: Result<ModelResponse, ProviderError>,
) -> Result<ModelResponse, ProviderError> {
    match result {
        Ok(response) => {
            if response.has_content() {
                hooks.on_first_content(identity, COMPLETE_OPERATION, started_at.elapsed());
            }
            if let Some(usage) = &response.usage {
                hooks.on_usage(identity, COMPLETE_OPERATION, usage);
            }
            hooks.on_success(identity, COMPLETE_OPERATION);
            Ok(response)
        }
        Err(error) => Err(fail(hooks, identity, COMPLETE_OPERATION, error)),
    }
}

fn report_provider_latency(
    hooks: &dyn ProviderOperationHooks,
    identity: &ModelIdentity,
    response: &ConverseResponse,
) {
    if let Some(latency_ms) = response.metrics.and_then(|metrics| metrics.latency_ms) {
        hooks.on_provider_latency(identity, COMPLETE_OPERATION, Duration::from_millis(latency_ms));
    }
}

fn fail(
    hooks: &dyn ProviderOperationHooks,
    identity: &ModelIdentity,
    operation: &str,
    error: ProviderError,
) -> ProviderError {
    let error = classify_error(error, identity);
    hooks.on_failure(identity, operation, &error);
    error
}
