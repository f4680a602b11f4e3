//! Single-dependency facade over the kestrel workspace crates.
//!
//! Re-exports the provider-neutral chat model, the Bedrock Converse adapter and
//! the observability hooks, and adds provider construction, logging setup and
//! request-building macros.
//!
//! ```rust,no_run
//! use kestrel::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! init_logging()?;
//! let provider = build_bedrock_provider(BedrockBuildConfig::from_env()?)?;
//! let request = krequest!(""; system => "Answer briefly.", user => "What is Rust?");
//! let response = provider.complete(request).await?;
//! println!("{}", response.content.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod logging;
pub mod prelude;
pub mod providers;

pub use kcommon;
pub use kobserve;
pub use kprovider;

pub use kcommon::{BoxFuture, GenerationOptions};
pub use kobserve::{
    CompositeProviderHooks, MetricsObservabilityHooks, SafeProviderHooks,
    TracingObservabilityHooks,
};
pub use kprovider::adapters::bedrock::{
    BedrockConfig, BedrockProvider, BlockingBedrockProvider, DEFAULT_MODEL_ID,
};
pub use kprovider::{
    BoxedEventStream, ContentBlock, MediaContent, Message, MessageContent, ModelEventStream,
    ModelIdentity, ModelProvider, ModelRequest, ModelRequestBuilder, ModelResponse,
    NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderFuture, ProviderId,
    ProviderOperationHooks, ProviderRegistry, ResponseCollector, Role, SecretString, StopReason,
    TokenUsage, ToolCall, ToolDefinition, ToolResult, VecEventStream, collect_stream,
};

pub use logging::init_logging;
pub use providers::{
    BedrockBuildConfig, build_bedrock_provider, build_bedrock_provider_with,
    default_observability_hooks,
};
