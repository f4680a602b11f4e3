//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use kprovider::{ModelIdentity, ProviderError, ProviderErrorKind, ProviderId};
//!
//! let rejected = ProviderError::validation("unsupported image format: bmp");
//! assert!(!rejected.retryable);
//!
//! let throttled = ProviderError::rate_limited("slow down")
//!     .with_identity(&ModelIdentity::new(ProviderId::Bedrock, "amazon.nova-lite-v1:0"));
//! assert!(throttled.retryable);
//! assert_eq!(throttled.kind, ProviderErrorKind::RateLimited);
//! assert_eq!(throttled.model.as_deref(), Some("amazon.nova-lite-v1:0"));
//! ```

use crate::{ModelIdentity, ProviderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Request content rejected locally, before any network activity.
    Validation,
    /// The wire event sequence broke the stream assembly invariants.
    Protocol,
    /// A complete response did not carry the expected envelope.
    ProviderResponse,
    /// The supplied transport cannot serve a required operation.
    TransportUnavailable,
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}{}: {message}", identity_suffix(.provider, .model))]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub provider: Option<ProviderId>,
    pub model: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            provider: None,
            model: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Validation, message, false)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Protocol, message, false)
    }

    pub fn provider_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ProviderResponse, message, false)
    }

    pub fn transport_unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::TransportUnavailable, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Attaches provider and model identity. Identity already present is kept.
    pub fn with_identity(mut self, identity: &ModelIdentity) -> Self {
        if self.provider.is_none() {
            self.provider = Some(identity.provider);
        }

        if self.model.is_none() {
            self.model = Some(identity.model.clone());
        }

        self
    }

    pub fn has_identity(&self) -> bool {
        self.provider.is_some() && self.model.is_some()
    }
}

fn identity_suffix(provider: &Option<ProviderId>, model: &Option<String>) -> String {
    match (provider, model) {
        (Some(provider), Some(model)) => format!(" [{provider}/{model}]"),
        (Some(provider), None) => format!(" [{provider}]"),
        (None, Some(model)) => format!(" [{model}]"),
        (None, None) => String::new(),
    }
}
