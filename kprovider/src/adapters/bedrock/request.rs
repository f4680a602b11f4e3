//! Converse request formatting from conversation state.

use kcommon::GenerationOptions;
use serde_json::{Map, Value};

use crate::{Message, ModelRequest, ProviderError, Role};

use super::content::encode_message;
use super::tools::translate_tools;
use super::types::{BedrockMessage, ConverseRequest, InferenceConfig, SystemContentBlock};

/// Formats a request whose model and options are already resolved.
///
/// Tool results on the request are appended as one user turn after the history.
pub fn format_request(
    request: &ModelRequest,
    request_params: &Map<String, Value>,
) -> Result<ConverseRequest, ProviderError> {
    let (mut messages, system) = format_messages(&request.messages)?;

    if !request.tool_results.is_empty() {
        let results = Message::tool_results(&request.tool_results, &[]);
        messages.push(encode_message(&results)?);
    }

    let mut converse = ConverseRequest::new(request.model.clone(), messages);
    converse.system = system;
    converse.tool_config = translate_tools(&request.tools);
    converse.inference_config = inference_config(&request.options);

    if !request_params.is_empty() {
        tracing::debug!(
            model_id = %request.model,
            params = ?request_params.keys().collect::<Vec<_>>(),
            "merging additional request parameters into the Converse body"
        );
        converse.additional_fields = request_params.clone();
    }

    Ok(converse)
}

/// Splits the history into conversation turns and the system block.
///
/// Only one system block is sent: each system message replaces the previous one.
pub fn format_messages(
    messages: &[Message],
) -> Result<(Vec<BedrockMessage>, Option<Vec<SystemContentBlock>>), ProviderError> {
    let mut formatted = Vec::with_capacity(messages.len());
    let mut system = None;

    for message in messages {
        if message.role == Role::System {
            system = Some(vec![SystemContentBlock {
                text: message.content.text(),
            }]);
            continue;
        }

        formatted.push(encode_message(message)?);
    }

    Ok((formatted, system))
}

/// Inference parameters that were actually set, or `None` when none were.
pub fn inference_config(options: &GenerationOptions) -> Option<InferenceConfig> {
    if !options.has_inference_parameters() {
        return None;
    }

    Some(InferenceConfig {
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        top_p: options.top_p,
        stop_sequences: options.stop_sequences.clone(),
    })
}
