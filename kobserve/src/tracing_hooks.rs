//! Tracing-based observability hooks for provider calls.
//!
//! ```rust
//! use kobserve::TracingObservabilityHooks;
//! use kprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use kprovider::{ModelIdentity, ProviderError, ProviderOperationHooks, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_request_start(&self, identity: &ModelIdentity, operation: &str) {
        tracing::info!(
            phase = "provider",
            event = "request_start",
            provider = %identity.provider,
            model = %identity.model,
            operation
        );
    }

    fn on_first_content(&self, identity: &ModelIdentity, operation: &str, elapsed: Duration) {
        tracing::debug!(
            phase = "provider",
            event = "first_content",
            provider = %identity.provider,
            model = %identity.model,
            operation,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_usage(&self, identity: &ModelIdentity, operation: &str, usage: &TokenUsage) {
        tracing::debug!(
            phase = "provider",
            event = "usage",
            provider = %identity.provider,
            model = %identity.model,
            operation,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total_tokens
        );
    }

    fn on_provider_latency(&self, identity: &ModelIdentity, operation: &str, latency: Duration) {
        tracing::debug!(
            phase = "provider",
            event = "provider_latency",
            provider = %identity.provider,
            model = %identity.model,
            operation,
            latency_ms = latency.as_millis() as u64
        );
    }

    fn on_success(&self, identity: &ModelIdentity, operation: &str) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %identity.provider,
            model = %identity.model,
            operation
        );
    }

    fn on_failure(&self, identity: &ModelIdentity, operation: &str, error: &ProviderError) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %identity.provider,
            model = %identity.model,
            operation,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}
