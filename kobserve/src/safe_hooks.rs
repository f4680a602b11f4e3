use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use kprovider::{ModelIdentity, ProviderError, ProviderOperationHooks, TokenUsage};

/// Contains panics raised by the wrapped hooks so they never abort a provider call.
pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_request_start(&self, identity: &ModelIdentity, operation: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_request_start(identity, operation)
        }));
    }

    fn on_first_content(&self, identity: &ModelIdentity, operation: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_first_content(identity, operation, elapsed)
        }));
    }

    fn on_usage(&self, identity: &ModelIdentity, operation: &str, usage: &TokenUsage) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_usage(identity, operation, usage)
        }));
    }

    fn on_provider_latency(&self, identity: &ModelIdentity, operation: &str, latency: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_provider_latency(identity, operation, latency)
        }));
    }

    fn on_success(&self, identity: &ModelIdentity, operation: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(identity, operation)
        }));
    }

    fn on_failure(&self, identity: &ModelIdentity, operation: &str, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(identity, operation, error)
        }));
    }
}

/// Forwards every callback to each member in registration order.
#[derive(Clone, Default)]
pub struct CompositeProviderHooks {
    members: Vec<Arc<dyn ProviderOperationHooks>>,
}

impl CompositeProviderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.members.push(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl ProviderOperationHooks for CompositeProviderHooks {
    fn on_request_start(&self, identity: &ModelIdentity, operation: &str) {
        for member in &self.members {
            member.on_request_start(identity, operation);
        }
    }

    fn on_first_content(&self, identity: &ModelIdentity, operation: &str, elapsed: Duration) {
        for member in &self.members {
            member.on_first_content(identity, operation, elapsed);
        }
    }

    fn on_usage(&self, identity: &ModelIdentity, operation: &str, usage: &TokenUsage) {
        for member in &self.members {
            member.on_usage(identity, operation, usage);
        }
    }

    fn on_provider_latency(&self, identity: &ModelIdentity, operation: &str, latency: Duration) {
        for member in &self.members {
            member.on_provider_latency(identity, operation, latency);
        }
    }

    fn on_success(&self, identity: &ModelIdentity, operation: &str) {
        for member in &self.members {
            member.on_success(identity, operation);
        }
    }

    fn on_failure(&self, identity: &ModelIdentity, operation: &str, error: &ProviderError) {
        for member in &self.members {
            member.on_failure(identity, operation, error);
        }
    }
}

impl std::fmt::Debug for CompositeProviderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProviderHooks")
            .field("members", &self.members.len())
            .finish()
    }
}
