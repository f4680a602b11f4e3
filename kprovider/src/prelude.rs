//! Common `kprovider` imports for downstream crates.

pub use crate::adapters::bedrock::{BedrockConfig, BedrockProvider, BlockingBedrockProvider};
pub use crate::{
    BoxedEventStream, ContentBlock, MediaContent, Message, MessageContent, ModelEventStream,
    ModelIdentity, ModelProvider, ModelRequest, ModelRequestBuilder, ModelResponse,
    NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks,
    ProviderRegistry, ResponseCollector, Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
    ToolResult, collect_stream,
};
pub use kcommon::{BoxFuture, GenerationOptions};
