//! Named provider lookup.
//!
//! Several Bedrock providers with different regions or default models can be
//! registered side by side under aliases. The first registration becomes the
//! default unless another alias is chosen explicitly.
//!
//! ```rust
//! use kprovider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.is_empty());
//! assert!(registry.resolve(None).is_err());
//! ```

use std::sync::Arc;

use kcommon::Registry;

use crate::{ModelProvider, ProviderError};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: Registry<String, Arc<dyn ModelProvider>>,
    default_name: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `name`, returning any provider it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
    ) -> Option<Arc<dyn ModelProvider>> {
        let name = name.into();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.providers.insert(name, provider)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), ProviderError> {
        if !self.providers.contains_key(name) {
            return Err(unknown_provider(name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(name).cloned()
    }

    /// The provider registered as `name`, or the default one when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        let name = match name.or(self.default_name.as_deref()) {
            Some(name) => name,
            None => {
                return Err(ProviderError::invalid_request(
                    "no provider is registered",
                ));
            }
        };

        self.get(name).ok_or_else(|| unknown_provider(name))
    }

    /// Removing the default provider leaves the registry without a default.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        if self.default_name.as_deref() == Some(name) {
            self.default_name = None;
        }
        self.providers.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered aliases in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.providers.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .field("default_name", &self.default_name)
            .finish()
    }
}

fn unknown_provider(name: &str) -> ProviderError {
    ProviderError::invalid_request(format!("no provider is registered as '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BoxedEventStream, ModelRequest, ModelResponse, ProviderErrorKind, ProviderFuture,
        ProviderId, VecEventStream,
    };

    struct FixedProvider(&'static str);

    impl ModelProvider for FixedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Bedrock
        }

        fn complete<'a>(
            &'a self,
            _request: ModelRequest,
        ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
            let text = self.0;
            Box::pin(async move { Ok(ModelResponse::text_delta(text)) })
        }

        fn stream<'a>(
            &'a self,
            _request: ModelRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            let text = self.0;
            Box::pin(async move {
                let stream = VecEventStream::new(vec![Ok(ModelResponse::text_delta(text))]);
                Ok(Box::pin(stream) as BoxedEventStream<'a>)
            })
        }
    }

    #[test]
    fn first_registration_becomes_default() {
        let mut registry = ProviderRegistry::new();
        registry.register("us", Arc::new(FixedProvider("us")));
        registry.register("eu", Arc::new(FixedProvider("eu")));

        assert_eq!(registry.default_name(), Some("us"));
        assert_eq!(registry.names(), vec!["eu", "us"]);
        assert!(registry.resolve(None).is_ok());
        assert!(registry.resolve(Some("eu")).is_ok());
    }

    #[test]
    fn unknown_names_are_invalid_requests() {
        let mut registry = ProviderRegistry::new();
        registry.register("us", Arc::new(FixedProvider("us")));

        let error = registry
            .resolve(Some("ap"))
            .err()
            .expect("unregistered alias should fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert!(error.message.contains("'ap'"));

        assert!(registry.set_default("ap").is_err());
        assert_eq!(registry.default_name(), Some("us"));
    }

    #[test]
    fn removing_the_default_clears_it() {
        let mut registry = ProviderRegistry::new();
        registry.register("us", Arc::new(FixedProvider("us")));
        registry.register("eu", Arc::new(FixedProvider("eu")));

        assert!(registry.remove("us").is_some());
        assert_eq!(registry.default_name(), None);
        assert!(registry.resolve(None).is_err());

        registry.set_default("eu").expect("eu is registered");
        assert_eq!(registry.len(), 1);
    }
}
