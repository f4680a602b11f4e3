//! Bedrock error classification.
//!
//! Runtime endpoints return JSON error bodies shaped like
//! `{"message": "...", "__type": "..."}`; stream exceptions arrive as typed frames.
//! Both collapse onto [`ProviderErrorKind`], and every error leaving the provider
//! is stamped with the provider and model identity.

use serde_json::Value;

use crate::{ModelIdentity, ProviderError};

/// Attaches identity to a failure and logs it before it is returned to the caller.
pub fn classify_error(error: ProviderError, identity: &ModelIdentity) -> ProviderError {
    let error = error.with_identity(identity);
    tracing::error!(
        provider = %identity.provider,
        model = %identity.model,
        error_kind = ?error.kind,
        retryable = error.retryable,
        "Bedrock call failed: {}",
        error.message
    );
    error
}

/// Classifies a failed HTTP response by status and body.
pub fn classify_status(status: u16, body: &str) -> ProviderError {
    let message = extract_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("Bedrock request failed with status {status}")
        } else {
            body.trim().to_string()
        }
    });
    let error_type = extract_error_type(body).unwrap_or_default();

    if status == 429 || looks_throttled(&error_type) || looks_throttled(&message) {
        return ProviderError::rate_limited(message);
    }

    match status {
        401 | 403 => ProviderError::authentication(message),
        408 | 504 => ProviderError::timeout(message),
        400 | 413 | 415 | 422 => ProviderError::invalid_request(message),
        502 | 503 => ProviderError::unavailable(message),
        _ => ProviderError::transport(message),
    }
}

/// Classifies an exception frame received inside a ConverseStream response.
pub fn classify_exception(exception_type: &str, message: &str) -> ProviderError {
    let message = if message.trim().is_empty() {
        exception_type.to_string()
    } else {
        message.to_string()
    };

    if looks_throttled(exception_type) || looks_throttled(&message) {
        return ProviderError::rate_limited(message);
    }

    match exception_type {
        "accessDeniedException" | "AccessDeniedException" => ProviderError::authentication(message),
        "validationException" | "ValidationException" => ProviderError::invalid_request(message),
        "modelTimeoutException" | "ModelTimeoutException" => ProviderError::timeout(message),
        "serviceUnavailableException"
        | "ServiceUnavailableException"
        | "internalServerException"
        | "InternalServerException" => ProviderError::unavailable(message),
        _ => ProviderError::transport(format!("{exception_type}: {message}")),
    }
}

pub(crate) fn extract_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;

    json.get("message")
        .and_then(Value::as_str)
        .or_else(|| json.get("Message").and_then(Value::as_str))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

fn extract_error_type(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;

    json.get("__type")
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn looks_throttled(value: &str) -> bool {
    value.to_ascii_lowercase().contains("throttl")
}
