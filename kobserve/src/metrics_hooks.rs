//! Metrics-based observability hooks for provider calls.
//!
//! ```rust
//! use kobserve::MetricsObservabilityHooks;
//! use kprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use kprovider::{ModelIdentity, ProviderError, ProviderOperationHooks, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_request_start(&self, identity: &ModelIdentity, operation: &str) {
        metrics::counter!(
            "kestrel_provider_request_start_total",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_first_content(&self, identity: &ModelIdentity, operation: &str, elapsed: Duration) {
        metrics::histogram!(
            "kestrel_provider_time_to_first_content_seconds",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_usage(&self, identity: &ModelIdentity, operation: &str, usage: &TokenUsage) {
        metrics::counter!(
            "kestrel_provider_input_tokens_total",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .increment(u64::from(usage.input_tokens));
        metrics::counter!(
            "kestrel_provider_output_tokens_total",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .increment(u64::from(usage.output_tokens));
    }

    fn on_provider_latency(&self, identity: &ModelIdentity, operation: &str, latency: Duration) {
        metrics::histogram!(
            "kestrel_provider_server_latency_seconds",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .record(latency.as_secs_f64());
    }

    fn on_success(&self, identity: &ModelIdentity, operation: &str) {
        metrics::counter!(
            "kestrel_provider_success_total",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_failure(&self, identity: &ModelIdentity, operation: &str, error: &ProviderError) {
        metrics::counter!(
            "kestrel_provider_failure_total",
            "provider" => identity.provider.to_string(),
            "model" => identity.model.clone(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
