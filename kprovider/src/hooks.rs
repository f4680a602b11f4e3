//! Operational hook contracts invoked around provider calls.

use std::time::Duration;

use crate::{ModelIdentity, ProviderError, TokenUsage};

/// Callbacks for one provider operation (`"complete"` or `"stream"`).
///
/// Every method defaults to a no-op so implementations only override what they record.
pub trait ProviderOperationHooks: Send + Sync {
    fn on_request_start(&self, _identity: &ModelIdentity, _operation: &str) {}

    /// Called once per call, when the first text or completed tool call arrives.
    fn on_first_content(&self, _identity: &ModelIdentity, _operation: &str, _elapsed: Duration) {}

    fn on_usage(&self, _identity: &ModelIdentity, _operation: &str, _usage: &TokenUsage) {}

    /// Latency the provider itself reports for the call, when it reports one.
    fn on_provider_latency(
        &self,
        _identity: &ModelIdentity,
        _operation: &str,
        _latency: Duration,
    ) {
    }

    fn on_success(&self, _identity: &ModelIdentity, _operation: &str) {}

    fn on_failure(&self, _identity: &ModelIdentity, _operation: &str, _error: &ProviderError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
