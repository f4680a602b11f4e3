//! Message content encoding for Converse requests.

use serde_json::{Map, Value, json};

use crate::{
    ContentBlock, MediaContent, Message, MessageContent, ProviderError, Role, ToolCall, ToolResult,
};

use super::types::{
    BedrockContentBlock, BedrockMessage, BedrockRole, MediaBlock, MediaSource, ToolResultBlock,
    ToolResultContent, ToolUseBlock,
};

pub const IMAGE_FORMATS: [&str; 4] = ["png", "jpeg", "webp", "gif"];

pub const VIDEO_FORMATS: [&str; 9] = [
    "mp4", "mov", "mkv", "webm", "flv", "mpeg", "mpg", "wmv", "3gp",
];

/// Encodes one user or assistant message.
///
/// Content is emitted first, followed by images and then videos. Audio and file
/// attachments are dropped with a warning.
pub fn encode_message(message: &Message) -> Result<BedrockMessage, ProviderError> {
    let role = match message.role {
        Role::User => BedrockRole::User,
        Role::Assistant => BedrockRole::Assistant,
        Role::System => {
            return Err(ProviderError::validation(
                "system messages are sent in the system block, not as conversation turns",
            ));
        }
    };

    Ok(BedrockMessage {
        role,
        content: encode_content(message)?,
    })
}

pub fn encode_content(message: &Message) -> Result<Vec<BedrockContentBlock>, ProviderError> {
    let mut blocks = match &message.content {
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(encode_block)
            .collect::<Result<Vec<_>, _>>()?,
        MessageContent::Text(_) if !message.tool_calls.is_empty() => {
            message.tool_calls.iter().map(encode_tool_call).collect()
        }
        MessageContent::Text(text) => vec![BedrockContentBlock::Text(text.clone())],
    };

    for image in &message.images {
        blocks.push(encode_image(image)?);
    }

    if !message.audio.is_empty() {
        tracing::warn!(
            dropped = message.audio.len(),
            "audio input is not supported by Bedrock Converse; dropping attachments"
        );
    }

    for video in &message.videos {
        blocks.push(encode_video(video)?);
    }

    if !message.files.is_empty() {
        tracing::warn!(
            dropped = message.files.len(),
            "file input is not supported by this adapter; dropping attachments"
        );
    }

    Ok(blocks)
}

pub fn encode_block(block: &ContentBlock) -> Result<BedrockContentBlock, ProviderError> {
    match block {
        ContentBlock::Text(text) => Ok(BedrockContentBlock::Text(text.clone())),
        ContentBlock::Image(image) => encode_image(image),
        ContentBlock::Video(video) => encode_video(video),
        ContentBlock::ToolUse(call) => Ok(encode_tool_call(call)),
        ContentBlock::ToolResult(result) => Ok(encode_tool_result(result)),
    }
}

pub fn encode_image(image: &MediaContent) -> Result<BedrockContentBlock, ProviderError> {
    if image.bytes.is_empty() {
        return Err(ProviderError::validation("image content must not be empty"));
    }

    let format = image
        .format
        .as_deref()
        .ok_or_else(|| ProviderError::validation("image format is required"))?;

    if !IMAGE_FORMATS.contains(&format) {
        return Err(ProviderError::validation(format!(
            "unsupported image format: {format}"
        )));
    }

    Ok(BedrockContentBlock::Image(media_block(format, &image.bytes)))
}

pub fn encode_video(video: &MediaContent) -> Result<BedrockContentBlock, ProviderError> {
    if video.bytes.is_empty() {
        return Err(ProviderError::validation("video content must not be empty"));
    }

    let format = video
        .format
        .as_deref()
        .ok_or_else(|| ProviderError::validation("video format is required"))?;

    // Converse spells 3gp as `three_gp`; both spellings are accepted.
    let wire_format = match format {
        "3gp" | "three_gp" => "three_gp",
        other if VIDEO_FORMATS.contains(&other) => other,
        other => {
            return Err(ProviderError::validation(format!(
                "unsupported video format: {other}"
            )));
        }
    };

    Ok(BedrockContentBlock::Video(media_block(wire_format, &video.bytes)))
}

pub fn encode_tool_call(call: &ToolCall) -> BedrockContentBlock {
    BedrockContentBlock::ToolUse(ToolUseBlock {
        tool_use_id: call.id.clone(),
        name: call.name.clone(),
        input: parse_tool_input(&call.id, &call.arguments),
    })
}

pub fn encode_tool_result(result: &ToolResult) -> BedrockContentBlock {
    BedrockContentBlock::ToolResult(ToolResultBlock {
        tool_use_id: result.tool_call_id.clone(),
        content: vec![ToolResultContent::Json(json!({ "result": result.output }))],
        status: None,
    })
}

/// Parses serialized tool arguments, falling back to an empty object.
///
/// Blank text is an empty object without comment; malformed JSON logs a warning.
pub fn parse_tool_input(tool_use_id: &str, arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }

    match serde_json::from_str(arguments) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                tool_use_id,
                error = %error,
                "failed to parse tool call arguments; sending an empty object"
            );
            Value::Object(Map::new())
        }
    }
}

fn media_block(format: &str, bytes: &[u8]) -> MediaBlock {
    MediaBlock {
        format: format.to_string(),
        source: MediaSource {
            bytes: bytes.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::ProviderErrorKind;

    fn png() -> MediaContent {
        MediaContent::new("png", vec![0x89, 0x50])
    }

    #[test]
    fn plain_text_becomes_one_text_block() {
        let encoded = encode_message(&Message::user("hello")).expect("text should encode");
        assert_eq!(encoded.role, BedrockRole::User);
        assert_eq!(encoded.content, vec![BedrockContentBlock::Text("hello".to_string())]);
    }

    #[test]
    fn structured_blocks_keep_order() {
        let message = Message::user(vec![
            ContentBlock::Text("look".to_string()),
            ContentBlock::Image(png()),
            ContentBlock::ToolResult(ToolResult::new("t1", "42")),
        ]);

        let blocks = encode_content(&message).expect("blocks should encode");
        assert!(matches!(blocks[0], BedrockContentBlock::Text(_)));
        assert!(matches!(blocks[1], BedrockContentBlock::Image(_)));
        assert_eq!(
            blocks[2],
            BedrockContentBlock::ToolResult(ToolResultBlock {
                tool_use_id: "t1".to_string(),
                content: vec![ToolResultContent::Json(json!({"result": "42"}))],
                status: None,
            })
        );
    }

    #[test]
    fn tool_call_message_becomes_tool_use_blocks() {
        let message = Message::assistant_tool_calls(vec![
            ToolCall::new("t1", "search", r#"{"q":"ai"}"#),
            ToolCall::new("t2", "clock", ""),
        ]);

        let blocks = encode_content(&message).expect("tool calls should encode");
        assert_eq!(
            blocks,
            vec![
                BedrockContentBlock::ToolUse(ToolUseBlock {
                    tool_use_id: "t1".to_string(),
                    name: "search".to_string(),
                    input: json!({"q": "ai"}),
                }),
                BedrockContentBlock::ToolUse(ToolUseBlock {
                    tool_use_id: "t2".to_string(),
                    name: "clock".to_string(),
                    input: json!({}),
                }),
            ]
        );
    }

    #[test]
    #[traced_test]
    fn malformed_tool_arguments_fall_back_to_empty_object_with_warning() {
        let input = parse_tool_input("t9", "{not json");
        assert_eq!(input, json!({}));
        assert!(logs_contain("failed to parse tool call arguments"));
    }

    #[test]
    #[traced_test]
    fn blank_tool_arguments_do_not_warn() {
        assert_eq!(parse_tool_input("t1", "  "), json!({}));
        assert!(!logs_contain("failed to parse tool call arguments"));
    }

    #[test]
    fn images_and_videos_follow_message_text() {
        let message = Message::user("describe")
            .with_image(png())
            .with_video(MediaContent::new("3gp", vec![1]));

        let blocks = encode_content(&message).expect("media should encode");
        assert_eq!(blocks.len(), 3);
        match &blocks[2] {
            BedrockContentBlock::Video(video) => assert_eq!(video.format, "three_gp"),
            other => panic!("expected video block, got {other:?}"),
        }
    }

    #[test]
    fn empty_image_bytes_fail_validation() {
        let message = Message::user("x").with_image(MediaContent::new("png", Vec::new()));
        let error = encode_content(&message).expect_err("empty image should fail");
        assert_eq!(error.kind, ProviderErrorKind::Validation);
    }

    #[test]
    fn unsupported_and_missing_formats_fail_validation() {
        let bmp = encode_image(&MediaContent::new("bmp", vec![1]))
            .expect_err("bmp should be rejected");
        assert!(bmp.message.contains("bmp"));

        let uppercase = encode_image(&MediaContent::new("PNG", vec![1]))
            .expect_err("format match is exact");
        assert_eq!(uppercase.kind, ProviderErrorKind::Validation);

        let missing = encode_video(&MediaContent::from_bytes(vec![1]))
            .expect_err("missing format should fail");
        assert!(missing.message.contains("format is required"));

        let avi = encode_video(&MediaContent::new("avi", vec![1]))
            .expect_err("avi should be rejected");
        assert_eq!(avi.kind, ProviderErrorKind::Validation);
    }

    #[test]
    #[traced_test]
    fn audio_and_files_are_dropped_with_warning() {
        let message = Message::user("listen")
            .with_audio(MediaContent::new("mp3", vec![1]))
            .with_file(MediaContent::new("pdf", vec![1]));

        let blocks = encode_content(&message).expect("unsupported media is dropped");
        assert_eq!(blocks, vec![BedrockContentBlock::Text("listen".to_string())]);
        assert!(logs_contain("audio input is not supported"));
        assert!(logs_contain("file input is not supported"));
    }

    #[test]
    fn system_role_is_not_a_conversation_turn() {
        let error = encode_message(&Message::system("rules")).expect_err("system should fail");
        assert_eq!(error.kind, ProviderErrorKind::Validation);
    }
}
