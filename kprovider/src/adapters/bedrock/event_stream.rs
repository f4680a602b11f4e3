//! `application/vnd.amazon.eventstream` framing.
//!
//! Each frame is a 12-byte prelude (total length, headers length, prelude CRC32),
//! typed headers, a payload and a trailing CRC32 over everything before it.
//! [`FrameDecoder`] is sans-IO: push bytes in, pull complete frames out.

use std::io::{ErrorKind, Read};

use async_stream::try_stream;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::ProviderError;

use super::errors::{classify_exception, extract_message};
use super::types::ConverseStreamEvent;

pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_FRAME_LEN: usize = PRELUDE_LEN + CRC_LEN;
const READ_CHUNK_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Bytes(Vec<u8>),
    String(String),
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    fn type_byte(&self) -> u8 {
        match self {
            Self::Bool(true) => 0,
            Self::Bool(false) => 1,
            Self::Byte(_) => 2,
            Self::Short(_) => 3,
            Self::Int(_) => 4,
            Self::Long(_) => 5,
            Self::Bytes(_) => 6,
            Self::String(_) => 7,
            Self::Timestamp(_) => 8,
            Self::Uuid(_) => 9,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            headers: Vec::new(),
            payload: payload.into(),
        }
    }

    /// An `event` frame carrying a JSON payload for `event_type`.
    pub fn event(event_type: &str, payload: impl Into<Bytes>) -> Self {
        Self::new(payload)
            .with_header(":message-type", HeaderValue::String("event".to_string()))
            .with_header(":event-type", HeaderValue::String(event_type.to_string()))
            .with_header(
                ":content-type",
                HeaderValue::String("application/json".to_string()),
            )
    }

    pub fn exception(exception_type: &str, payload: impl Into<Bytes>) -> Self {
        Self::new(payload)
            .with_header(":message-type", HeaderValue::String("exception".to_string()))
            .with_header(
                ":exception-type",
                HeaderValue::String(exception_type.to_string()),
            )
    }

    pub fn with_header(mut self, name: impl Into<String>, value: HeaderValue) -> Self {
        self.headers.push((name.into(), value));
        self
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value)
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }

    pub fn encode(&self) -> Result<Bytes, ProviderError> {
        let mut headers = BytesMut::new();
        for (name, value) in &self.headers {
            let name_len = u8::try_from(name.len()).map_err(|_| {
                ProviderError::protocol(format!("header name too long: {name}"))
            })?;
            headers.put_u8(name_len);
            headers.put_slice(name.as_bytes());
            headers.put_u8(value.type_byte());

            match value {
                HeaderValue::Bool(_) => {}
                HeaderValue::Byte(value) => headers.put_i8(*value),
                HeaderValue::Short(value) => headers.put_i16(*value),
                HeaderValue::Int(value) => headers.put_i32(*value),
                HeaderValue::Long(value) | HeaderValue::Timestamp(value) => {
                    headers.put_i64(*value)
                }
                HeaderValue::Bytes(value) => put_sized(&mut headers, name, value)?,
                HeaderValue::String(value) => put_sized(&mut headers, name, value.as_bytes())?,
                HeaderValue::Uuid(value) => headers.put_slice(value),
            }
        }

        let total_len = PRELUDE_LEN + headers.len() + self.payload.len() + CRC_LEN;
        if total_len > MAX_FRAME_LEN {
            return Err(ProviderError::protocol(format!(
                "frame of {total_len} bytes exceeds the {MAX_FRAME_LEN} byte limit"
            )));
        }

        let mut out = BytesMut::with_capacity(total_len);
        out.put_u32(total_len as u32);
        out.put_u32(headers.len() as u32);
        let prelude_crc = crc32fast::hash(&out);
        out.put_u32(prelude_crc);
        out.put_slice(&headers);
        out.put_slice(&self.payload);
        let message_crc = crc32fast::hash(&out);
        out.put_u32(message_crc);

        Ok(out.freeze())
    }

    /// Maps the frame onto a stream event, or onto the error an exception frame carries.
    pub fn into_event(self) -> Result<ConverseStreamEvent, ProviderError> {
        match self.header_str(":message-type").unwrap_or("event") {
            "event" => {
                let event_type = self.header_str(":event-type").ok_or_else(|| {
                    ProviderError::protocol("event frame is missing the :event-type header")
                })?;
                ConverseStreamEvent::from_event_type(event_type, &self.payload)
            }
            "exception" => {
                let exception_type = self
                    .header_str(":exception-type")
                    .unwrap_or("unknownException");
                let message = std::str::from_utf8(&self.payload)
                    .ok()
                    .and_then(extract_message)
                    .unwrap_or_default();
                Err(classify_exception(exception_type, &message))
            }
            "error" => {
                let code = self.header_str(":error-code").unwrap_or("UnknownError");
                let message = self.header_str(":error-message").unwrap_or_default();
                Err(classify_exception(code, message))
            }
            other => Err(ProviderError::protocol(format!(
                "unknown event-stream message type: {other}"
            ))),
        }
    }
}

fn put_sized(buffer: &mut BytesMut, name: &str, value: &[u8]) -> Result<(), ProviderError> {
    let len = u16::try_from(value.len())
        .map_err(|_| ProviderError::protocol(format!("header value too long: {name}")))?;
    buffer.put_u16(len);
    buffer.put_slice(value);
    Ok(())
}

/// Incremental frame decoder over an internal buffer.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete frame, or `None` until enough bytes have arrived.
    ///
    /// After an error the buffer is cleared; the source cannot be resynchronised.
    pub fn decode_next(&mut self) -> Result<Option<Frame>, ProviderError> {
        let result = self.try_decode();
        if result.is_err() {
            self.buffer.clear();
        }
        result
    }

    fn try_decode(&mut self) -> Result<Option<Frame>, ProviderError> {
        if self.buffer.len() < PRELUDE_LEN {
            return Ok(None);
        }

        let mut prelude = &self.buffer[..PRELUDE_LEN];
        let total_len = prelude.get_u32() as usize;
        let headers_len = prelude.get_u32() as usize;
        let prelude_crc = prelude.get_u32();

        if crc32fast::hash(&self.buffer[..8]) != prelude_crc {
            return Err(ProviderError::protocol("event-stream prelude checksum mismatch"));
        }

        if total_len < MIN_FRAME_LEN {
            return Err(ProviderError::protocol(format!(
                "event-stream frame length {total_len} is below the {MIN_FRAME_LEN} byte minimum"
            )));
        }

        if total_len > MAX_FRAME_LEN {
            return Err(ProviderError::protocol(format!(
                "event-stream frame length {total_len} exceeds the {MAX_FRAME_LEN} byte limit"
            )));
        }

        if headers_len > total_len - MIN_FRAME_LEN {
            return Err(ProviderError::protocol(format!(
                "event-stream headers length {headers_len} does not fit frame length {total_len}"
            )));
        }

        if self.buffer.len() < total_len {
            return Ok(None);
        }

        let frame = self.buffer.split_to(total_len).freeze();
        let body_end = total_len - CRC_LEN;
        let message_crc = (&frame[body_end..]).get_u32();
        if crc32fast::hash(&frame[..body_end]) != message_crc {
            return Err(ProviderError::protocol("event-stream message checksum mismatch"));
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame[PRELUDE_LEN..headers_end])?;

        Ok(Some(Frame {
            headers,
            payload: frame.slice(headers_end..body_end),
        }))
    }
}

fn parse_headers(mut buf: &[u8]) -> Result<Vec<(String, HeaderValue)>, ProviderError> {
    let mut headers = Vec::new();

    while buf.has_remaining() {
        ensure_remaining(buf, 1)?;
        let name_len = buf.get_u8() as usize;
        let name = take_utf8(&mut buf, name_len)?;

        ensure_remaining(buf, 1)?;
        let value = match buf.get_u8() {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => {
                ensure_remaining(buf, 1)?;
                HeaderValue::Byte(buf.get_i8())
            }
            3 => {
                ensure_remaining(buf, 2)?;
                HeaderValue::Short(buf.get_i16())
            }
            4 => {
                ensure_remaining(buf, 4)?;
                HeaderValue::Int(buf.get_i32())
            }
            5 => {
                ensure_remaining(buf, 8)?;
                HeaderValue::Long(buf.get_i64())
            }
            6 => {
                ensure_remaining(buf, 2)?;
                let len = buf.get_u16() as usize;
                ensure_remaining(buf, len)?;
                let value = buf[..len].to_vec();
                buf.advance(len);
                HeaderValue::Bytes(value)
            }
            7 => {
                ensure_remaining(buf, 2)?;
                let len = buf.get_u16() as usize;
                HeaderValue::String(take_utf8(&mut buf, len)?)
            }
            8 => {
                ensure_remaining(buf, 8)?;
                HeaderValue::Timestamp(buf.get_i64())
            }
            9 => {
                ensure_remaining(buf, 16)?;
                let mut uuid = [0u8; 16];
                buf.copy_to_slice(&mut uuid);
                HeaderValue::Uuid(uuid)
            }
            other => {
                return Err(ProviderError::protocol(format!(
                    "unknown event-stream header type {other} for {name}"
                )));
            }
        };

        headers.push((name, value));
    }

    Ok(headers)
}

fn ensure_remaining(buf: &[u8], needed: usize) -> Result<(), ProviderError> {
    if buf.len() < needed {
        return Err(ProviderError::protocol("truncated event-stream header"));
    }
    Ok(())
}

fn take_utf8(buf: &mut &[u8], len: usize) -> Result<String, ProviderError> {
    ensure_remaining(buf, len)?;
    let value = std::str::from_utf8(&buf[..len])
        .map_err(|_| ProviderError::protocol("event-stream header is not valid UTF-8"))?
        .to_string();
    buf.advance(len);
    Ok(value)
}

/// Decodes stream events from a blocking byte source.
pub struct EventStreamReader<R> {
    source: R,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    done: bool,
}

impl<R: Read> EventStreamReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            chunk: vec![0; READ_CHUNK_LEN],
            done: false,
        }
    }
}

impl<R: Read> Iterator for EventStreamReader<R> {
    type Item = Result<ConverseStreamEvent, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.decoder.decode_next() {
                Ok(Some(frame)) => {
                    let event = frame.into_event();
                    self.done = event.is_err();
                    return Some(event);
                }
                Ok(None) => {}
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }

            match self.source.read(&mut self.chunk) {
                Ok(0) => {
                    self.done = true;
                    if !self.decoder.is_empty() {
                        return Some(Err(truncated(self.decoder.buffered_len())));
                    }
                }
                Ok(read) => self.decoder.push(&self.chunk[..read]),
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => {
                    self.done = true;
                    return Some(Err(ProviderError::transport(format!(
                        "failed to read event stream: {error}"
                    ))));
                }
            }
        }

        None
    }
}

impl<R> std::fmt::Debug for EventStreamReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamReader")
            .field("buffered", &self.decoder.buffered_len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Decodes stream events from an async source of byte chunks.
pub fn decode_event_stream<'a, S>(
    chunks: S,
) -> impl Stream<Item = Result<ConverseStreamEvent, ProviderError>> + Send + 'a
where
    S: Stream<Item = Result<Bytes, ProviderError>> + Send + 'a,
{
    try_stream! {
        let mut chunks = Box::pin(chunks);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = chunks.next().await {
            decoder.push(&chunk?);
            while let Some(frame) = decoder.decode_next()? {
                yield frame.into_event()?;
            }
        }

        if !decoder.is_empty() {
            Err::<(), _>(truncated(decoder.buffered_len()))?;
        }
    }
}

fn truncated(buffered: usize) -> ProviderError {
    ProviderError::protocol(format!(
        "event stream ended inside a frame with {buffered} bytes buffered"
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::ProviderErrorKind;
    use crate::adapters::bedrock::types::BlockDelta;

    fn text_delta_frame(text: &str) -> Frame {
        Frame::event(
            "contentBlockDelta",
            format!(r#"{{"contentBlockIndex":0,"delta":{{"text":"{text}"}}}}"#),
        )
    }

    fn encoded(frames: &[Frame]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|frame| frame.encode().expect("frame should encode").to_vec())
            .collect()
    }

    #[test]
    fn decodes_frames_fed_one_byte_at_a_time() {
        let bytes = encoded(&[text_delta_frame("Hel"), text_delta_frame("lo")]);
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();

        for byte in bytes {
            decoder.push(&[byte]);
            while let Some(frame) = decoder.decode_next().expect("valid bytes") {
                frames.push(frame);
            }
        }

        assert_eq!(frames, vec![text_delta_frame("Hel"), text_delta_frame("lo")]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn every_header_type_survives_encoding() {
        let frame = Frame::new(Bytes::from_static(b"{}"))
            .with_header("t", HeaderValue::Bool(true))
            .with_header("f", HeaderValue::Bool(false))
            .with_header("b", HeaderValue::Byte(-3))
            .with_header("s", HeaderValue::Short(512))
            .with_header("i", HeaderValue::Int(-70_000))
            .with_header("l", HeaderValue::Long(1 << 40))
            .with_header("raw", HeaderValue::Bytes(vec![0, 1, 2]))
            .with_header("str", HeaderValue::String("value".to_string()))
            .with_header("ts", HeaderValue::Timestamp(1_700_000_000_000))
            .with_header("id", HeaderValue::Uuid([7; 16]));

        let mut decoder = FrameDecoder::new();
        decoder.push(&frame.encode().expect("frame should encode"));
        assert_eq!(decoder.decode_next().expect("valid frame"), Some(frame));
    }

    #[test]
    fn corrupted_payload_fails_message_checksum() {
        let mut bytes = encoded(&[text_delta_frame("x")]);
        let last_payload_byte = bytes.len() - CRC_LEN - 1;
        bytes[last_payload_byte] ^= 0xff;

        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);
        let error = decoder.decode_next().expect_err("checksum should fail");
        assert_eq!(error.kind, ProviderErrorKind::Protocol);
        assert!(error.message.contains("message checksum"));
        assert!(decoder.is_empty());
    }

    #[test]
    fn undersized_frame_length_is_rejected() {
        let mut prelude = BytesMut::new();
        prelude.put_u32(8);
        prelude.put_u32(0);
        let crc = crc32fast::hash(&prelude);
        prelude.put_u32(crc);

        let mut decoder = FrameDecoder::new();
        decoder.push(&prelude);
        let error = decoder.decode_next().expect_err("length 8 is invalid");
        assert!(error.message.contains("below"));
    }

    #[test]
    fn exception_frames_become_classified_errors() {
        let frame = Frame::exception("throttlingException", r#"{"message":"Rate exceeded"}"#);
        let error = frame.into_event().expect_err("exception is an error");
        assert_eq!(error.kind, ProviderErrorKind::RateLimited);
        assert_eq!(error.message, "Rate exceeded");

        let frame = Frame::new(Bytes::new())
            .with_header(":message-type", HeaderValue::String("error".to_string()))
            .with_header(
                ":error-code",
                HeaderValue::String("ValidationException".to_string()),
            )
            .with_header(":error-message", HeaderValue::String("bad".to_string()));
        assert_eq!(
            frame.into_event().expect_err("error frame").kind,
            ProviderErrorKind::InvalidRequest
        );
    }

    #[test]
    fn reader_yields_events_then_reports_truncation() {
        let mut bytes = encoded(&[text_delta_frame("a"), Frame::event("messageStop", "{}")]);
        bytes.extend_from_slice(&encoded(&[text_delta_frame("b")])[..10]);

        let items = EventStreamReader::new(Cursor::new(bytes)).collect::<Vec<_>>();
        assert_eq!(items.len(), 3);
        assert!(matches!(
            items[0],
            Ok(ConverseStreamEvent::ContentBlockDelta {
                delta: BlockDelta::Text(ref text),
                ..
            }) if text == "a"
        ));
        assert!(matches!(
            items[1],
            Ok(ConverseStreamEvent::MessageStop { .. })
        ));
        let error = items[2].as_ref().expect_err("trailing bytes are truncated");
        assert!(error.message.contains("ended inside a frame"));
    }

    #[tokio::test]
    async fn async_decoder_handles_split_chunks() {
        let bytes = encoded(&[text_delta_frame("hi"), text_delta_frame("!")]);
        let (first, second) = bytes.split_at(7);
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::copy_from_slice(first)),
            Ok(Bytes::copy_from_slice(second)),
        ]);

        let events = decode_event_stream(chunks)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("events decode");
        assert_eq!(events.len(), 2);
    }

    proptest! {
        #[test]
        fn split_points_do_not_change_decoded_frames(
            texts in proptest::collection::vec("[a-z ]{0,12}", 1..5),
            cut in any::<prop::sample::Index>(),
        ) {
            let frames = texts.iter().map(|text| text_delta_frame(text)).collect::<Vec<_>>();
            let bytes = encoded(&frames);
            let at = cut.index(bytes.len());

            let mut decoder = FrameDecoder::new();
            let mut decoded = Vec::new();
            for part in [&bytes[..at], &bytes[at..]] {
                decoder.push(part);
                while let Some(frame) = decoder.decode_next().expect("valid bytes") {
                    decoded.push(frame);
                }
            }

            prop_assert_eq!(decoded, frames);
        }
    }
}
