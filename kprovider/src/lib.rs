//! Provider-neutral chat model plus the Bedrock Converse adapter.
//!
//! Requests are built from [`Message`] values, formatted for the wire by an adapter,
//! and answered either as one [`ModelResponse`] or as a stream of increments.
//!
//! ```rust
//! use kprovider::{Message, ModelRequest, ResponseCollector, ModelResponse};
//!
//! let request = ModelRequest::builder("amazon.nova-lite-v1:0")
//!     .message(Message::system("Answer briefly."))
//!     .message(Message::user("What is Rust?"))
//!     .max_tokens(256)
//!     .build()
//!     .expect("request should validate");
//! assert_eq!(request.messages.len(), 2);
//!
//! let mut collector = ResponseCollector::new();
//! collector.push(&ModelResponse::text_delta("A systems "));
//! collector.push(&ModelResponse::text_delta("language."));
//! assert_eq!(collector.response().content.as_deref(), Some("A systems language."));
//! ```

mod credentials;
mod error;
mod hooks;
mod model;
mod provider;
mod registry;
mod stream;

pub mod adapters;
pub mod prelude;

pub use credentials::SecretString;
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use model::{
    ContentBlock, MediaContent, Message, MessageContent, ModelIdentity, ModelRequest,
    ModelRequestBuilder, ModelResponse, ProviderId, Role, StopReason, TokenUsage, ToolCall,
    ToolDefinition, ToolResult,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use registry::ProviderRegistry;
pub use stream::{
    BoxedEventStream, ModelEventStream, ResponseCollector, VecEventStream, collect_stream,
};
