//! Transport boundary between the adapter and whatever delivers Converse calls.
//!
//! Streaming transports hand back already-decoded [`ConverseStreamEvent`] values;
//! framing and HTTP live behind these traits so the provider can be driven by
//! fakes in tests.

use std::pin::Pin;

use futures_core::Stream;

use crate::{ProviderError, ProviderFuture};

use super::types::{ConverseRequest, ConverseResponse, ConverseStreamEvent};

pub type ConverseEventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<ConverseStreamEvent, ProviderError>> + Send + 'a>>;

pub type ConverseEventIter<'a> =
    Box<dyn Iterator<Item = Result<ConverseStreamEvent, ProviderError>> + Send + 'a>;

/// Operations a transport can actually perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCapabilities {
    pub converse: bool,
    pub converse_stream: bool,
}

impl TransportCapabilities {
    pub const fn full() -> Self {
        Self {
            converse: true,
            converse_stream: true,
        }
    }

    pub const fn converse_only() -> Self {
        Self {
            converse: true,
            converse_stream: false,
        }
    }

    /// Fails with `TransportUnavailable` naming the first missing operation.
    pub fn require_all(&self) -> Result<(), ProviderError> {
        if !self.converse {
            return Err(ProviderError::transport_unavailable(
                "transport does not support the Converse operation",
            ));
        }

        if !self.converse_stream {
            return Err(ProviderError::transport_unavailable(
                "transport does not support the ConverseStream operation",
            ));
        }

        Ok(())
    }
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

pub trait BedrockTransport: Send + Sync + std::fmt::Debug {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::full()
    }

    fn converse<'a>(
        &'a self,
        request: ConverseRequest,
    ) -> ProviderFuture<'a, Result<ConverseResponse, ProviderError>>;

    fn converse_stream<'a>(
        &'a self,
        request: ConverseRequest,
    ) -> ProviderFuture<'a, Result<ConverseEventStream<'a>, ProviderError>>;
}

pub trait BlockingBedrockTransport: Send + Sync + std::fmt::Debug {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::full()
    }

    fn converse(&self, request: ConverseRequest) -> Result<ConverseResponse, ProviderError>;

    fn converse_stream<'a>(
        &'a self,
        request: ConverseRequest,
    ) -> Result<ConverseEventIter<'a>, ProviderError>;
}
