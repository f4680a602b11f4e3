//! Bedrock Converse wire types.
//!
//! Request types serialize to the exact camelCase shape the Converse API expects,
//! with unset optional fields omitted. Response and stream types deserialize
//! permissively: unknown fields and unknown content blocks are ignored.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BedrockRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    /// Carried in the request path, never in the body.
    #[serde(skip)]
    pub model_id: String,
    pub messages: Vec<BedrockMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemContentBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<InferenceConfig>,
    /// Extra top-level fields merged over the body by [`ConverseRequest::to_body`].
    #[serde(skip)]
    pub additional_fields: Map<String, Value>,
}

impl ConverseRequest {
    pub fn new(model_id: impl Into<String>, messages: Vec<BedrockMessage>) -> Self {
        Self {
            model_id: model_id.into(),
            messages,
            system: None,
            tool_config: None,
            inference_config: None,
            additional_fields: Map::new(),
        }
    }

    /// JSON body with additional fields applied last, replacing keys of the same name.
    pub fn to_body(&self) -> Result<Value, ProviderError> {
        let mut body = serde_json::to_value(self)
            .map_err(|err| ProviderError::validation(format!("unserializable request: {err}")))?;

        if let Value::Object(object) = &mut body {
            for (key, value) in &self.additional_fields {
                object.insert(key.clone(), value.clone());
            }
        }

        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockMessage {
    pub role: BedrockRole,
    pub content: Vec<BedrockContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContentBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BedrockContentBlock {
    Text(String),
    Image(MediaBlock),
    Video(MediaBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlock {
    pub format: String,
    pub source: MediaSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolResultContent {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolConfig {
    pub tools: Vec<BedrockTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockTool {
    pub tool_spec: ToolSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInputSchema {
    pub json: ToolJsonSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolJsonSchema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: ToolProperties,
    pub required: Vec<String>,
}

/// Property map that serializes in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolProperties(pub Vec<(String, ToolProperty)>);

impl ToolProperties {
    pub fn get(&self, name: &str) -> Option<&ToolProperty> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, property)| property)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }
}

impl Serialize for ToolProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, property) in &self.0 {
            map.serialize_entry(name, property)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolProperty {
    #[serde(rename = "type")]
    pub property_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    #[serde(default)]
    pub output: Option<ConverseOutput>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<BedrockUsage>,
    #[serde(default)]
    pub metrics: Option<ConverseMetrics>,
}

/// Server-side timing Bedrock attaches to a response or `metadata` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseMetrics {
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ConverseOutput {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ResponseContentBlock>,
}

/// One response content block; kinds this adapter does not read are left empty.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContentBlock {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tool_use: Option<ToolUseBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUseStart {
    pub tool_use_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDelta {
    Text(String),
    ToolInput(String),
    /// Delta kinds this adapter does not assemble, such as reasoning content.
    Unsupported,
}

/// One decoded ConverseStream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverseStreamEvent {
    MessageStart {
        role: String,
    },
    ContentBlockStart {
        index: Option<u32>,
        tool_use: Option<ToolUseStart>,
    },
    ContentBlockDelta {
        index: Option<u32>,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: Option<u32>,
    },
    MessageStop {
        stop_reason: Option<String>,
        usage: Option<BedrockUsage>,
    },
    Metadata {
        usage: Option<BedrockUsage>,
        latency_ms: Option<u64>,
    },
    Unknown {
        event_type: String,
    },
}

impl ConverseStreamEvent {
    /// Decodes the JSON envelope form, e.g. `{"contentBlockStop": {"contentBlockIndex": 0}}`.
    pub fn from_envelope(envelope: Value) -> Result<Self, ProviderError> {
        let Value::Object(object) = envelope else {
            return Err(ProviderError::provider_response(
                "stream event envelope must be a JSON object",
            ));
        };

        let mut entries = object.into_iter();
        let Some((event_type, payload)) = entries.next() else {
            return Err(ProviderError::provider_response("empty stream event envelope"));
        };

        if entries.next().is_some() {
            return Err(ProviderError::provider_response(
                "stream event envelope must carry exactly one event",
            ));
        }

        Self::decode(&event_type, payload)
    }

    /// Decodes an event delivered as an event type name plus JSON payload bytes.
    pub fn from_event_type(event_type: &str, payload: &[u8]) -> Result<Self, ProviderError> {
        let payload = if payload.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(payload).map_err(|err| {
                ProviderError::provider_response(format!(
                    "malformed {event_type} payload: {err}"
                ))
            })?
        };

        Self::decode(event_type, payload)
    }

    pub fn decode(event_type: &str, payload: Value) -> Result<Self, ProviderError> {
        let event = match event_type {
            "messageStart" => {
                let raw: RawMessageStart = parse_payload(event_type, payload)?;
                Self::MessageStart { role: raw.role }
            }
            "contentBlockStart" => {
                let raw: RawContentBlockStart = parse_payload(event_type, payload)?;
                Self::ContentBlockStart {
                    index: raw.content_block_index,
                    tool_use: raw.start.and_then(|start| start.tool_use).map(|tool| {
                        ToolUseStart {
                            tool_use_id: tool.tool_use_id,
                            name: tool.name,
                        }
                    }),
                }
            }
            "contentBlockDelta" => {
                let raw: RawContentBlockDelta = parse_payload(event_type, payload)?;
                let delta = match (raw.delta.text, raw.delta.tool_use) {
                    (Some(text), _) => BlockDelta::Text(text),
                    (None, Some(tool_use)) => BlockDelta::ToolInput(tool_use.input),
                    (None, None) => BlockDelta::Unsupported,
                };
                Self::ContentBlockDelta {
                    index: raw.content_block_index,
                    delta,
                }
            }
            "contentBlockStop" => {
                let raw: RawContentBlockStop = parse_payload(event_type, payload)?;
                Self::ContentBlockStop {
                    index: raw.content_block_index,
                }
            }
            "messageStop" => {
                let raw: RawMessageStop = parse_payload(event_type, payload)?;
                Self::MessageStop {
                    stop_reason: raw.stop_reason,
                    usage: raw.usage,
                }
            }
            "metadata" => {
                let raw: RawMetadata = parse_payload(event_type, payload)?;
                Self::Metadata {
                    usage: raw.usage,
                    latency_ms: raw.metrics.and_then(|metrics| metrics.latency_ms),
                }
            }
            other => Self::Unknown {
                event_type: other.to_string(),
            },
        };

        Ok(event)
    }
}

fn parse_payload<T>(event_type: &str, payload: Value) -> Result<T, ProviderError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(payload).map_err(|err| {
        ProviderError::provider_response(format!("malformed {event_type} event: {err}"))
    })
}

#[derive(Debug, Deserialize)]
struct RawMessageStart {
    #[serde(default = "assistant_role")]
    role: String,
}

fn assistant_role() -> String {
    "assistant".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContentBlockStart {
    #[serde(default)]
    content_block_index: Option<u32>,
    #[serde(default)]
    start: Option<RawBlockStart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlockStart {
    #[serde(default)]
    tool_use: Option<RawToolUseStart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolUseStart {
    tool_use_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContentBlockDelta {
    #[serde(default)]
    content_block_index: Option<u32>,
    delta: RawDelta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tool_use: Option<RawToolUseDelta>,
}

#[derive(Debug, Deserialize)]
struct RawToolUseDelta {
    #[serde(default)]
    input: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContentBlockStop {
    #[serde(default)]
    content_block_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessageStop {
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<BedrockUsage>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    usage: Option<BedrockUsage>,
    #[serde(default)]
    metrics: Option<ConverseMetrics>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_body_omits_unset_sections_and_applies_additional_fields() {
        let mut request = ConverseRequest::new(
            "m",
            vec![BedrockMessage {
                role: BedrockRole::User,
                content: vec![BedrockContentBlock::Text("hi".to_string())],
            }],
        );
        request
            .additional_fields
            .insert("additionalModelRequestFields".to_string(), json!({"top_k": 5}));

        let body = request.to_body().expect("body should serialize");
        assert_eq!(
            body,
            json!({
                "messages": [{"role": "user", "content": [{"text": "hi"}]}],
                "additionalModelRequestFields": {"top_k": 5}
            })
        );
    }

    #[test]
    fn media_bytes_serialize_as_base64() {
        let block = BedrockContentBlock::Image(MediaBlock {
            format: "png".to_string(),
            source: MediaSource {
                bytes: vec![1, 2, 3],
            },
        });

        let value = serde_json::to_value(&block).expect("block should serialize");
        assert_eq!(
            value,
            json!({"image": {"format": "png", "source": {"bytes": "AQID"}}})
        );
    }

    #[test]
    fn tool_properties_keep_insertion_order() {
        let properties = ToolProperties(vec![
            (
                "zeta".to_string(),
                ToolProperty {
                    property_type: "string".to_string(),
                    description: String::new(),
                },
            ),
            (
                "alpha".to_string(),
                ToolProperty {
                    property_type: "integer".to_string(),
                    description: String::new(),
                },
            ),
        ]);

        let text = serde_json::to_string(&properties).expect("properties should serialize");
        assert!(text.find("zeta") < text.find("alpha"));
    }

    #[test]
    fn envelope_decodes_each_event_kind() {
        let start = ConverseStreamEvent::from_envelope(json!({
            "contentBlockStart": {
                "start": {"toolUse": {"toolUseId": "t1", "name": "search"}},
                "contentBlockIndex": 1
            }
        }))
        .expect("start should decode");
        assert_eq!(
            start,
            ConverseStreamEvent::ContentBlockStart {
                index: Some(1),
                tool_use: Some(ToolUseStart {
                    tool_use_id: "t1".to_string(),
                    name: "search".to_string(),
                }),
            }
        );

        let delta = ConverseStreamEvent::from_envelope(json!({
            "contentBlockDelta": {"delta": {"toolUse": {"input": "{\"q\":"}}, "contentBlockIndex": 1}
        }))
        .expect("delta should decode");
        assert_eq!(
            delta,
            ConverseStreamEvent::ContentBlockDelta {
                index: Some(1),
                delta: BlockDelta::ToolInput("{\"q\":".to_string()),
            }
        );

        let metadata = ConverseStreamEvent::from_envelope(json!({
            "metadata": {
                "usage": {"inputTokens": 10, "outputTokens": 5, "totalTokens": 99},
                "metrics": {"latencyMs": 120}
            }
        }))
        .expect("metadata should decode");
        assert_eq!(
            metadata,
            ConverseStreamEvent::Metadata {
                usage: Some(BedrockUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 99,
                }),
                latency_ms: Some(120),
            }
        );
    }

    #[test]
    fn reasoning_delta_decodes_as_unsupported() {
        let event = ConverseStreamEvent::from_event_type(
            "contentBlockDelta",
            br#"{"delta":{"reasoningContent":{"text":"hmm"}},"contentBlockIndex":0}"#,
        )
        .expect("delta should decode");
        assert_eq!(
            event,
            ConverseStreamEvent::ContentBlockDelta {
                index: Some(0),
                delta: BlockDelta::Unsupported,
            }
        );
    }

    #[test]
    fn unknown_event_types_are_preserved_by_name() {
        let event = ConverseStreamEvent::from_event_type("initial-response", b"{}")
            .expect("unknown event should decode");
        assert_eq!(
            event,
            ConverseStreamEvent::Unknown {
                event_type: "initial-response".to_string(),
            }
        );
    }

    #[test]
    fn malformed_payload_is_a_provider_response_error() {
        let error = ConverseStreamEvent::from_event_type("contentBlockDelta", b"{\"delta\": 7}")
            .expect_err("bad delta should fail");
        assert_eq!(error.kind, crate::ProviderErrorKind::ProviderResponse);

        let error = ConverseStreamEvent::from_envelope(json!({"a": {}, "b": {}}))
            .expect_err("two events should fail");
        assert!(error.message.contains("exactly one"));
    }

    #[test]
    fn response_ignores_unknown_content_blocks() {
        let response: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [
                {"reasoningContent": {"reasoningText": {"text": "..."}}},
                {"text": "hello"}
            ]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 1, "outputTokens": 2, "totalTokens": 3},
            "metrics": {"latencyMs": 5}
        }))
        .expect("response should deserialize");

        let message = response
            .output
            .and_then(|output| output.message)
            .expect("message present");
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[1].text.as_deref(), Some("hello"));
        assert_eq!(
            response.metrics,
            Some(ConverseMetrics {
                latency_ms: Some(5)
            })
        );
    }
}
