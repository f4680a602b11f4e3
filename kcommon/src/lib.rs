//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use kcommon::GenerationOptions;
//!
//! let options = GenerationOptions::default()
//!     .with_temperature(0.3)
//!     .with_stop_sequences(vec!["END".to_string()]);
//! assert!(options.has_inference_parameters());
//! assert_eq!(options.stop_sequences.as_deref(), Some(&["END".to_string()][..]));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use kcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod model {
    //! Shared generation settings used by request types.
    //!
    //! Every field is optional so that callers and adapters can tell "unset"
    //! apart from an explicit value. Adapters only put set fields on the wire.
    //!
    //! ```rust
    //! use kcommon::GenerationOptions;
    //!
    //! let defaults = GenerationOptions::default().with_max_tokens(512).with_top_p(0.9);
    //! let request = GenerationOptions::default().with_max_tokens(128);
    //!
    //! let merged = request.or(&defaults);
    //! assert_eq!(merged.max_tokens, Some(128));
    //! assert_eq!(merged.top_p, Some(0.9));
    //! assert_eq!(merged.temperature, None);
    //! ```

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct GenerationOptions {
        pub max_tokens: Option<u32>,
        pub temperature: Option<f32>,
        pub top_p: Option<f32>,
        pub stop_sequences: Option<Vec<String>>,
    }

    impl GenerationOptions {
        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
            self.stop_sequences = Some(stop_sequences);
            self
        }

        /// Fills every unset field from `fallback`, keeping the values already set here.
        pub fn or(&self, fallback: &GenerationOptions) -> GenerationOptions {
            GenerationOptions {
                max_tokens: self.max_tokens.or(fallback.max_tokens),
                temperature: self.temperature.or(fallback.temperature),
                top_p: self.top_p.or(fallback.top_p),
                stop_sequences: self
                    .stop_sequences
                    .clone()
                    .or_else(|| fallback.stop_sequences.clone()),
            }
        }

        pub fn has_inference_parameters(&self) -> bool {
            self.max_tokens.is_some()
                || self.temperature.is_some()
                || self.top_p.is_some()
                || self.stop_sequences.is_some()
        }
    }
}

pub mod registry {
    //! Keyed map wrapper backing the named provider registry.
    //!
    //! ```rust
    //! use kcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use registry::Registry;
