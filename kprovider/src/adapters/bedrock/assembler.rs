//! Incremental assembly of ConverseStream events into response increments.
//!
//! [`StreamAssembler`] is a synchronous state machine fed one decoded event at a
//! time. [`assemble_stream`] and [`AssembledIter`] drive it from an async stream
//! or a blocking iterator; both own their event source, so dropping them early
//! releases the source and discards any half-received tool call.
//!
//! ```rust
//! use kprovider::adapters::bedrock::{
//!     BlockDelta, ConverseStreamEvent, StreamAssembler, ToolUseStart,
//! };
//!
//! let mut assembler = StreamAssembler::new();
//! assembler
//!     .process(ConverseStreamEvent::ContentBlockStart {
//!         index: Some(0),
//!         tool_use: Some(ToolUseStart { tool_use_id: "t1".into(), name: "search".into() }),
//!     })
//!     .expect("start is valid");
//! assembler
//!     .process(ConverseStreamEvent::ContentBlockDelta {
//!         index: Some(0),
//!         delta: BlockDelta::ToolInput("{\"q\":\"ai\"}".into()),
//!     })
//!     .expect("delta is valid");
//! let done = assembler
//!     .process(ConverseStreamEvent::ContentBlockStop { index: Some(0) })
//!     .expect("stop is valid")
//!     .expect("stop completes the tool call");
//!
//! assert_eq!(done.tool_calls[0].arguments, "{\"q\":\"ai\"}");
//! assert_eq!(assembler.finish().map(|last| last.tool_ids), Some(vec!["t1".to_string()]));
//! ```

use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::{
    ModelIdentity, ModelResponse, NoopOperationHooks, ProviderError, ProviderOperationHooks,
    ToolCall,
};

use super::errors::classify_error;
use super::response::{parse_stop_reason, token_usage};
use super::types::{BlockDelta, ConverseStreamEvent, ToolUseStart};

const STREAM_OPERATION: &str = "stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPhase {
    Idle,
    TextAccumulating,
    ToolAccumulating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingToolUse {
    id: String,
    name: String,
    arguments: String,
    index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockState {
    Idle,
    Text,
    Tool(PendingToolUse),
}

/// Assembly state for exactly one streaming call.
#[derive(Debug)]
pub struct StreamAssembler {
    block: BlockState,
    completed_tool_ids: Vec<String>,
    accumulated_text: String,
    started_at: Instant,
    time_to_first_content: Option<Duration>,
    provider_latency: Option<Duration>,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Measures time to first content from `started_at`, normally the moment the
    /// request was issued rather than the moment the stream opened.
    pub fn starting_at(started_at: Instant) -> Self {
        Self {
            block: BlockState::Idle,
            completed_tool_ids: Vec::new(),
            accumulated_text: String::new(),
            started_at,
            time_to_first_content: None,
            provider_latency: None,
        }
    }

    pub fn phase(&self) -> AssemblyPhase {
        match self.block {
            BlockState::Idle => AssemblyPhase::Idle,
            BlockState::Text => AssemblyPhase::TextAccumulating,
            BlockState::Tool(_) => AssemblyPhase::ToolAccumulating,
        }
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn completed_tool_ids(&self) -> &[String] {
        &self.completed_tool_ids
    }

    pub fn pending_tool_id(&self) -> Option<&str> {
        match &self.block {
            BlockState::Tool(pending) => Some(pending.id.as_str()),
            _ => None,
        }
    }

    /// Elapsed time from the start instant to the first increment with text or a tool call.
    pub fn time_to_first_content(&self) -> Option<Duration> {
        self.time_to_first_content
    }

    /// Server-side latency from the `metadata` event, once it has arrived.
    pub fn provider_latency(&self) -> Option<Duration> {
        self.provider_latency
    }

    /// Applies one event and returns the increment it produced, if any.
    pub fn process(
        &mut self,
        event: ConverseStreamEvent,
    ) -> Result<Option<ModelResponse>, ProviderError> {
        let increment = match event {
            ConverseStreamEvent::MessageStart { .. } => None,
            ConverseStreamEvent::ContentBlockStart { index, tool_use } => {
                self.start_block(index, tool_use)?;
                None
            }
            ConverseStreamEvent::ContentBlockDelta { index, delta } => {
                self.apply_delta(index, delta)?
            }
            ConverseStreamEvent::ContentBlockStop { index } => self.stop_block(index)?,
            ConverseStreamEvent::MessageStop { stop_reason, usage } => {
                let increment = ModelResponse {
                    stop_reason: stop_reason.as_deref().map(parse_stop_reason),
                    usage: usage.map(token_usage),
                    ..ModelResponse::assistant()
                };
                (!increment.is_empty()).then_some(increment)
            }
            ConverseStreamEvent::Metadata { usage, latency_ms } => {
                if let Some(latency_ms) = latency_ms {
                    self.provider_latency = Some(Duration::from_millis(latency_ms));
                }
                usage.map(|usage| ModelResponse {
                    usage: Some(token_usage(usage)),
                    ..ModelResponse::assistant()
                })
            }
            ConverseStreamEvent::Unknown { event_type } => {
                tracing::debug!(
                    event_type = %event_type,
                    "ignoring unrecognized ConverseStream event"
                );
                None
            }
        };

        if self.time_to_first_content.is_none()
            && increment.as_ref().is_some_and(ModelResponse::has_content)
        {
            self.time_to_first_content = Some(self.started_at.elapsed());
        }

        Ok(increment)
    }

    /// Ends the stream, returning the final increment that lists completed tool ids.
    ///
    /// A tool-use block still open at this point is discarded, never reported as completed.
    pub fn finish(self) -> Option<ModelResponse> {
        if let BlockState::Tool(pending) = &self.block {
            tracing::warn!(
                tool_use_id = %pending.id,
                received_bytes = pending.arguments.len(),
                "stream ended inside a tool-use block; discarding the partial call"
            );
        }

        if self.completed_tool_ids.is_empty() {
            return None;
        }

        Some(ModelResponse {
            tool_ids: self.completed_tool_ids,
            ..ModelResponse::assistant()
        })
    }

    fn start_block(
        &mut self,
        index: Option<u32>,
        tool_use: Option<ToolUseStart>,
    ) -> Result<(), ProviderError> {
        if let BlockState::Tool(open) = &self.block {
            let started = tool_use
                .as_ref()
                .map(|tool| format!("tool-use block {}", tool.tool_use_id))
                .unwrap_or_else(|| "content block".to_string());
            return Err(ProviderError::protocol(format!(
                "{started} started while tool-use block {} is still open",
                open.id
            )));
        }

        // A tool block implicitly ends an unterminated text block.
        if let Some(tool) = tool_use {
            self.block = BlockState::Tool(PendingToolUse {
                id: tool.tool_use_id,
                name: tool.name,
                arguments: String::new(),
                index,
            });
        }

        Ok(())
    }

    fn apply_delta(
        &mut self,
        index: Option<u32>,
        delta: BlockDelta,
    ) -> Result<Option<ModelResponse>, ProviderError> {
        match delta {
            BlockDelta::ToolInput(fragment) => match &mut self.block {
                BlockState::Tool(pending) => {
                    ensure_same_block(pending, index)?;
                    pending.arguments.push_str(&fragment);
                    Ok(None)
                }
                _ => Err(ProviderError::protocol(
                    "tool input delta received outside a tool-use block",
                )),
            },
            BlockDelta::Text(fragment) => {
                if let BlockState::Tool(pending) = &self.block {
                    return Err(ProviderError::protocol(format!(
                        "text delta received inside tool-use block {}",
                        pending.id
                    )));
                }

                self.block = BlockState::Text;
                if fragment.is_empty() {
                    return Ok(None);
                }

                self.accumulated_text.push_str(&fragment);
                Ok(Some(ModelResponse::text_delta(fragment)))
            }
            BlockDelta::Unsupported => {
                tracing::debug!(index = ?index, "ignoring unsupported content block delta");
                Ok(None)
            }
        }
    }

    fn stop_block(&mut self, index: Option<u32>) -> Result<Option<ModelResponse>, ProviderError> {
        if let BlockState::Tool(pending) = &self.block {
            ensure_same_block(pending, index)?;
        }

        match std::mem::replace(&mut self.block, BlockState::Idle) {
            BlockState::Tool(pending) => {
                let arguments = finalize_arguments(&pending.id, &pending.arguments);
                self.completed_tool_ids.push(pending.id.clone());

                Ok(Some(ModelResponse {
                    tool_calls: vec![ToolCall::new(pending.id, pending.name, arguments)],
                    ..ModelResponse::assistant()
                }))
            }
            BlockState::Text | BlockState::Idle => Ok(None),
        }
    }
}

fn ensure_same_block(pending: &PendingToolUse, index: Option<u32>) -> Result<(), ProviderError> {
    match (pending.index, index) {
        (Some(open), Some(received)) if open != received => Err(ProviderError::protocol(format!(
            "event for content block {received} while tool-use block {} at index {open} is open",
            pending.id
        ))),
        _ => Ok(()),
    }
}

/// Compact JSON text of the accumulated arguments, or `{}` when they are unusable.
fn finalize_arguments(tool_use_id: &str, raw: &str) -> String {
    if raw.trim().is_empty() {
        return "{}".to_string();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value.to_string(),
        Err(error) => {
            tracing::warn!(
                tool_use_id,
                error = %error,
                "malformed tool-use arguments in stream; substituting an empty object"
            );
            "{}".to_string()
        }
    }
}

/// Identity, hooks, and request start time for one stream assembly.
#[derive(Clone)]
pub struct StreamContext {
    identity: ModelIdentity,
    hooks: Arc<dyn ProviderOperationHooks>,
    started_at: Instant,
}

impl StreamContext {
    /// Starts the time-to-first-content clock now; see [`StreamContext::with_started_at`].
    pub fn new(identity: ModelIdentity) -> Self {
        Self {
            identity,
            hooks: Arc::new(NoopOperationHooks),
            started_at: Instant::now(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Instant the request was issued, so that time to first content includes
    /// the time spent opening the stream.
    pub fn with_started_at(mut self, started_at: Instant) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamContext")
            .field("identity", &self.identity)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

struct ObservedAssembly {
    assembler: StreamAssembler,
    context: StreamContext,
    first_content_reported: bool,
    latency_reported: bool,
}

impl ObservedAssembly {
    fn new(context: StreamContext) -> Self {
        Self {
            assembler: StreamAssembler::starting_at(context.started_at),
            context,
            first_content_reported: false,
            latency_reported: false,
        }
    }

    fn step(
        &mut self,
        event: Result<ConverseStreamEvent, ProviderError>,
    ) -> Result<Option<ModelResponse>, ProviderError> {
        match event.and_then(|event| self.assembler.process(event)) {
            Ok(increment) => {
                if !self.latency_reported
                    && let Some(latency) = self.assembler.provider_latency()
                {
                    self.latency_reported = true;
                    self.context.hooks.on_provider_latency(
                        &self.context.identity,
                        STREAM_OPERATION,
                        latency,
                    );
                }
                if let Some(increment) = &increment {
                    self.observe(increment);
                }
                Ok(increment)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    fn observe(&mut self, increment: &ModelResponse) {
        let identity = &self.context.identity;

        if !self.first_content_reported
            && let Some(elapsed) = self.assembler.time_to_first_content()
        {
            self.first_content_reported = true;
            self.context
                .hooks
                .on_first_content(identity, STREAM_OPERATION, elapsed);
        }

        if let Some(usage) = &increment.usage {
            self.context.hooks.on_usage(identity, STREAM_OPERATION, usage);
        }
    }

    fn fail(&self, error: ProviderError) -> ProviderError {
        let error = classify_error(error, &self.context.identity);
        self.context
            .hooks
            .on_failure(&self.context.identity, STREAM_OPERATION, &error);
        error
    }

    fn finish(self) -> Option<ModelResponse> {
        self.context
            .hooks
            .on_success(&self.context.identity, STREAM_OPERATION);
        self.assembler.finish()
    }
}

/// Assembles an async event stream. The first error ends the stream.
pub fn assemble_stream<'a, S>(
    events: S,
    context: StreamContext,
) -> impl Stream<Item = Result<ModelResponse, ProviderError>> + Send + 'a
where
    S: Stream<Item = Result<ConverseStreamEvent, ProviderError>> + Send + 'a,
{
    try_stream! {
        let mut events = Box::pin(events);
        let mut assembly = ObservedAssembly::new(context);

        while let Some(event) = events.next().await {
            if let Some(increment) = assembly.step(event)? {
                yield increment;
            }
        }

        if let Some(last) = assembly.finish() {
            yield last;
        }
    }
}

/// Blocking counterpart of [`assemble_stream`]. Fused after the first error.
pub struct AssembledIter<I> {
    events: I,
    assembly: Option<ObservedAssembly>,
}

impl<I> AssembledIter<I>
where
    I: Iterator<Item = Result<ConverseStreamEvent, ProviderError>>,
{
    pub fn new(events: I, context: StreamContext) -> Self {
        Self {
            events,
            assembly: Some(ObservedAssembly::new(context)),
        }
    }
}

impl<I> Iterator for AssembledIter<I>
where
    I: Iterator<Item = Result<ConverseStreamEvent, ProviderError>>,
{
    type Item = Result<ModelResponse, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let assembly = self.assembly.as_mut()?;

            let Some(event) = self.events.next() else {
                return self.assembly.take().and_then(ObservedAssembly::finish).map(Ok);
            };

            match assembly.step(event) {
                Ok(Some(increment)) => return Some(Ok(increment)),
                Ok(None) => continue,
                Err(error) => {
                    self.assembly = None;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl<I> FusedIterator for AssembledIter<I> where
    I: Iterator<Item = Result<ConverseStreamEvent, ProviderError>>
{
}

impl<I> std::fmt::Debug for AssembledIter<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledIter")
            .field("finished", &self.assembly.is_none())
            .finish_non_exhaustive()
    }
}
