//! Common imports for most kestrel applications.

pub use crate::{
    BedrockBuildConfig, build_bedrock_provider, build_bedrock_provider_with,
    default_observability_hooks, init_logging,
};
pub use crate::{kmessages, kmsg, krequest};
pub use crate::{
    BedrockConfig, BedrockProvider, BlockingBedrockProvider, BoxFuture, GenerationOptions,
    Message, ModelProvider, ModelRequest, ModelRequestBuilder, ModelResponse, ProviderError,
    ProviderErrorKind, ProviderId, ProviderOperationHooks, ResponseCollector, Role, StopReason,
    TokenUsage, ToolCall, ToolDefinition, ToolResult, collect_stream,
};
