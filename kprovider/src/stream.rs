//! Streaming increment contracts and in-memory stream utilities.
//!
//! ```rust
//! use kprovider::{BoxedEventStream, ModelResponse, VecEventStream};
//!
//! let stream = VecEventStream::new(vec![Ok(ModelResponse::text_delta("hello"))]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::{Message, ModelResponse, ProviderError};

/// Provider stream contract.
///
/// Invariants for consumers:
/// - Increments are emitted in source order.
/// - Text increments carry only the newly received fragment.
/// - A tool call appears exactly once, in the increment that completed it.
/// - `usage` is present only on the increment that reported it.
/// - When tool calls completed, the last increment lists their ids in `tool_ids`.
/// - Once the stream yields `None` or an error, it must not yield additional items.
pub trait ModelEventStream: Stream<Item = Result<ModelResponse, ProviderError>> + Send {}

impl<T> ModelEventStream for T where
    T: Stream<Item = Result<ModelResponse, ProviderError>> + Send
{
}

pub type BoxedEventStream<'a> = Pin<Box<dyn ModelEventStream + 'a>>;

#[derive(Debug)]
pub struct VecEventStream {
    events: VecDeque<Result<ModelResponse, ProviderError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecEventStream {
    type Item = Result<ModelResponse, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<ModelResponse, ProviderError>>> {
        Poll::Ready(self.events.pop_front())
    }
}

/// Folds streamed increments into one complete response.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    response: ModelResponse,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self {
            response: ModelResponse::assistant(),
        }
    }
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, increment: &ModelResponse) {
        if let Some(text) = increment.content.as_deref()
            && !text.is_empty()
        {
            self.response
                .content
                .get_or_insert_with(String::new)
                .push_str(text);
        }

        self.response
            .tool_calls
            .extend(increment.tool_calls.iter().cloned());

        if increment.usage.is_some() {
            self.response.usage = increment.usage;
        }

        if increment.stop_reason.is_some() {
            self.response.stop_reason = increment.stop_reason;
        }

        if !increment.tool_ids.is_empty() {
            self.response.tool_ids = increment.tool_ids.clone();
        }
    }

    pub fn response(&self) -> &ModelResponse {
        &self.response
    }

    pub fn into_response(self) -> ModelResponse {
        self.response
    }

    /// Assistant message to append to the conversation history.
    pub fn into_message(self) -> Message {
        self.response.to_message()
    }
}

/// Drains a stream of increments into one complete response.
pub async fn collect_stream<S>(stream: S) -> Result<ModelResponse, ProviderError>
where
    S: Stream<Item = Result<ModelResponse, ProviderError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut collector = ResponseCollector::new();

    while let Some(increment) = stream.next().await {
        collector.push(&increment?);
    }

    Ok(collector.into_response())
}
