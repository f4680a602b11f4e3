//! Amazon Bedrock Converse / ConverseStream adapter.
//!
//! Conversation state is encoded into Converse request bodies, non-streaming
//! responses are parsed back into [`ModelResponse`](crate::ModelResponse), and
//! ConverseStream events are assembled into response increments.

mod assembler;
mod config;
mod content;
mod errors;
mod event_stream;
#[cfg(feature = "transport-http")]
mod http;
mod provider;
mod request;
mod response;
mod tools;
mod transport;
mod types;

pub use assembler::{AssembledIter, AssemblyPhase, StreamAssembler, StreamContext, assemble_stream};
pub use config::{BedrockConfig, DEFAULT_MODEL_ID, MODEL_ID_ENV};
pub use content::{
    IMAGE_FORMATS, VIDEO_FORMATS, encode_block, encode_content, encode_image, encode_message,
    encode_tool_call, encode_tool_result, encode_video, parse_tool_input,
};
pub use errors::{classify_error, classify_exception, classify_status};
pub use event_stream::{
    EventStreamReader, Frame, FrameDecoder, HeaderValue, MAX_FRAME_LEN, decode_event_stream,
};
#[cfg(feature = "transport-http")]
pub use http::BedrockHttpTransport;
pub use provider::{BedrockProvider, BlockingBedrockProvider};
pub use request::{format_messages, format_request, inference_config};
pub use response::{parse_response, parse_stop_reason, token_usage};
pub use tools::{translate_tool, translate_tools};
pub use transport::{
    BedrockTransport, BlockingBedrockTransport, ConverseEventIter, ConverseEventStream,
    TransportCapabilities,
};
pub use types::{
    BedrockContentBlock, BedrockMessage, BedrockRole, BedrockTool, BedrockUsage, BlockDelta,
    ConverseMetrics, ConverseOutput, ConverseRequest, ConverseResponse, ConverseStreamEvent,
    InferenceConfig, MediaBlock, MediaSource, ResponseContentBlock, ResponseMessage,
    SystemContentBlock, ToolConfig, ToolInputSchema, ToolJsonSchema, ToolProperties, ToolProperty,
    ToolResultBlock, ToolResultContent, ToolSpec, ToolUseBlock, ToolUseStart,
};
