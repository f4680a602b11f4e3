//! Non-streaming Converse response parsing.

use crate::{ModelResponse, ProviderError, Role, StopReason, TokenUsage, ToolCall};

use super::types::{BedrockUsage, ConverseResponse};

pub fn parse_response(response: ConverseResponse) -> Result<ModelResponse, ProviderError> {
    let message = response
        .output
        .and_then(|output| output.message)
        .ok_or_else(|| {
            ProviderError::provider_response("Converse response is missing output.message")
        })?;

    let role = parse_role(&message.role)?;
    let stop_reason = response.stop_reason.as_deref().map(parse_stop_reason);

    let texts = message
        .content
        .iter()
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>();
    let content = (!texts.is_empty()).then(|| texts.join("\n"));

    let mut tool_calls = Vec::new();
    if stop_reason == Some(StopReason::ToolUse) {
        for tool_use in message.content.iter().filter_map(|block| block.tool_use.as_ref()) {
            let arguments = serde_json::to_string(&tool_use.input).map_err(|err| {
                ProviderError::provider_response(format!(
                    "unserializable tool input for {}: {err}",
                    tool_use.tool_use_id
                ))
            })?;
            tool_calls.push(ToolCall::new(
                tool_use.tool_use_id.clone(),
                tool_use.name.clone(),
                arguments,
            ));
        }
    }

    let tool_ids = tool_calls.iter().map(|call| call.id.clone()).collect();

    Ok(ModelResponse {
        role,
        content,
        tool_calls,
        usage: response.usage.map(token_usage),
        stop_reason,
        tool_ids,
    })
}

pub fn parse_stop_reason(value: &str) -> StopReason {
    match value {
        "end_turn" => StopReason::EndTurn,
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        "guardrail_intervened" | "content_filtered" => StopReason::ContentFiltered,
        _ => StopReason::Other,
    }
}

pub fn token_usage(usage: BedrockUsage) -> TokenUsage {
    TokenUsage::new(usage.input_tokens, usage.output_tokens, usage.total_tokens)
}

fn parse_role(role: &str) -> Result<Role, ProviderError> {
    match role {
        "assistant" => Ok(Role::Assistant),
        "user" => Ok(Role::User),
        other => Err(ProviderError::provider_response(format!(
            "unexpected response role: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::ProviderErrorKind;

    fn response(value: Value) -> ConverseResponse {
        serde_json::from_value(value).expect("fixture should deserialize")
    }

    #[test]
    fn text_blocks_are_joined_and_usage_is_verbatim() {
        let parsed = parse_response(response(json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "first"},
                {"text": "second"}
            ]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 10, "outputTokens": 5, "totalTokens": 42}
        })))
        .expect("response should parse");

        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(parsed.content.as_deref(), Some("first\nsecond"));
        assert_eq!(parsed.usage, Some(TokenUsage::new(10, 5, 42)));
        assert_eq!(parsed.stop_reason, Some(StopReason::EndTurn));
        assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn tool_calls_are_extracted_only_on_tool_use_stop() {
        let content = json!([
            {"text": "Let me check."},
            {"toolUse": {"toolUseId": "t1", "name": "search", "input": {"q": "ai", "n": 3}}}
        ]);

        let with_tools = parse_response(response(json!({
            "output": {"message": {"role": "assistant", "content": content.clone()}},
            "stopReason": "tool_use"
        })))
        .expect("tool response should parse");
        assert_eq!(
            with_tools.tool_calls,
            vec![ToolCall::new("t1", "search", r#"{"q":"ai","n":3}"#)]
        );
        assert_eq!(with_tools.tool_ids, vec!["t1".to_string()]);
        assert_eq!(with_tools.content.as_deref(), Some("Let me check."));

        let without = parse_response(response(json!({
            "output": {"message": {"role": "assistant", "content": content}},
            "stopReason": "max_tokens"
        })))
        .expect("response should parse");
        assert!(without.tool_calls.is_empty());
        assert_eq!(without.stop_reason, Some(StopReason::MaxTokens));
    }

    #[test]
    fn missing_envelope_is_a_provider_response_error() {
        let error = parse_response(response(json!({"stopReason": "end_turn"})))
            .expect_err("missing output should fail");
        assert_eq!(error.kind, ProviderErrorKind::ProviderResponse);

        let error = parse_response(response(json!({"output": {}})))
            .expect_err("missing message should fail");
        assert!(error.message.contains("output.message"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let error = parse_response(response(json!({
            "output": {"message": {"role": "tool", "content": []}}
        })))
        .expect_err("unknown role should fail");
        assert!(error.message.contains("tool"));
    }

    #[test]
    fn stop_reasons_map_to_shared_enum() {
        assert_eq!(parse_stop_reason("guardrail_intervened"), StopReason::ContentFiltered);
        assert_eq!(parse_stop_reason("stop_sequence"), StopReason::StopSequence);
        assert_eq!(parse_stop_reason("something_new"), StopReason::Other);
    }
}
