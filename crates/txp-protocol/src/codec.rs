//! Event framing
//!
//! Converts [`Event`] values to and from complete wire frames. Blocking
//! readers and writers are handled by [`read_event`]/[`write_event`];
//! [`FrameCodec`] does the same work incrementally over a `BytesMut` buffer.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{ProtocolError, Section};
use crate::event::Event;
use crate::frame::{FrameHeader, SectionTable, FRAME_HEADER_LEN, MAX_PAYLOAD_SIZE, SECTION_HEADER_LEN};

fn to_section<T: Serialize>(section: Section, value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value).map_err(|source| ProtocolError::SectionJson { section, source })
}

fn from_section<T>(section: Section, bytes: &[u8]) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Default,
{
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|source| ProtocolError::SectionJson { section, source })
}

/// Serialize the four sections in wire order; empty segments become empty sections
fn encode_sections(event: &Event) -> Result<[Vec<u8>; 4], ProtocolError> {
    let identity = to_section(Section::Identity, &event.identity)?;
    let trace = if event.trace.is_empty() {
        Vec::new()
    } else {
        to_section(Section::Trace, &event.trace)?
    };
    let system = if event.system.is_empty() {
        Vec::new()
    } else {
        to_section(Section::System, &event.system)?
    };
    let exec = if event.exec.is_empty() {
        Vec::new()
    } else {
        to_section(Section::Exec, &event.exec)?
    };
    Ok([identity, trace, system, exec])
}

/// Append one complete frame for `event` to `dst`
pub fn encode_event_into(event: &Event, dst: &mut BytesMut) -> Result<(), ProtocolError> {
    let sections = encode_sections(event)?;
    let table = SectionTable::new([
        sections[0].len(),
        sections[1].len(),
        sections[2].len(),
        sections[3].len(),
    ]);

    let payload_len = table.payload_length();
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    dst.reserve(FRAME_HEADER_LEN + payload_len);
    FrameHeader::new(payload_len).encode(dst);
    table.encode(dst);
    for section in &sections {
        dst.extend_from_slice(section);
    }

    trace!(
        payload_len,
        lengths = ?table.lengths,
        "Encoded frame for {}",
        event
    );
    Ok(())
}

/// Serialize `event` into a complete wire frame
pub fn encode_event(event: &Event) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::new();
    encode_event_into(event, &mut buf)?;
    Ok(buf.freeze())
}

/// Parse a payload: the section table followed by the section bodies
pub fn parse_payload(payload: &[u8]) -> Result<Event, ProtocolError> {
    let table = SectionTable::parse(payload)?;

    let actual = payload.len();
    if table.payload_length() != actual {
        return Err(ProtocolError::LengthMismatch {
            declared: table.payload_length(),
            actual,
        });
    }
    if table.length(Section::Identity) == 0 {
        return Err(ProtocolError::EmptyIdentity);
    }

    let mut offset = SECTION_HEADER_LEN;
    let slices = Section::ALL.map(|section| {
        let len = table.length(section);
        let slice = &payload[offset..offset + len];
        offset += len;
        slice
    });

    let event = Event {
        identity: from_section(Section::Identity, slices[0])?,
        trace: from_section(Section::Trace, slices[1])?,
        system: from_section(Section::System, slices[2])?,
        exec: from_section(Section::Exec, slices[3])?,
    };

    trace!(lengths = ?table.lengths, "Decoded frame: {}", event);
    Ok(event)
}

/// Parse one complete frame held in memory
///
/// Trailing bytes after the declared payload are rejected.
pub fn decode_event(frame: &[u8]) -> Result<Event, ProtocolError> {
    let header = FrameHeader::parse(frame)?;
    let expected = FRAME_HEADER_LEN + header.payload_length;
    if frame.len() < expected {
        return Err(ProtocolError::IncompleteFrame {
            expected,
            actual: frame.len(),
        });
    }
    if frame.len() > expected {
        return Err(ProtocolError::LengthMismatch {
            declared: header.payload_length,
            actual: frame.len() - FRAME_HEADER_LEN,
        });
    }
    parse_payload(&frame[FRAME_HEADER_LEN..])
}

/// Read until `buf` is full or the reader reaches end of stream
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly one frame from a blocking reader
///
/// Loops until the preamble and the declared payload are complete. End of
/// stream before the first byte is [`ProtocolError::ConnectionClosed`]; end of
/// stream inside a frame is [`ProtocolError::IncompleteFrame`].
pub fn read_event<R: Read>(reader: &mut R) -> Result<Event, ProtocolError> {
    let mut preamble = [0u8; FRAME_HEADER_LEN];
    let n = read_full(reader, &mut preamble)?;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if n < FRAME_HEADER_LEN {
        return Err(ProtocolError::IncompleteFrame {
            expected: FRAME_HEADER_LEN,
            actual: n,
        });
    }
    let header = FrameHeader::parse(&preamble)?;
    trace!(payload_len = header.payload_length, "Read frame preamble");

    let mut payload = vec![0u8; header.payload_length];
    let n = read_full(reader, &mut payload)?;
    if n < header.payload_length {
        return Err(ProtocolError::IncompleteFrame {
            expected: header.payload_length,
            actual: n,
        });
    }
    parse_payload(&payload)
}

/// Encode `event` and write the whole frame, returning the number of bytes written
pub fn write_event<W: Write>(writer: &mut W, event: &Event) -> Result<usize, ProtocolError> {
    let frame = encode_event(event)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(frame.len())
}

/// Write the frame for `event` to a file
pub fn save_event(path: impl AsRef<Path>, event: &Event) -> Result<(), ProtocolError> {
    let frame = encode_event(event)?;
    fs::write(path, &frame)?;
    Ok(())
}

/// Read a single frame from a file
pub fn load_event(path: impl AsRef<Path>) -> Result<Event, ProtocolError> {
    let bytes = fs::read(path)?;
    decode_event(&bytes)
}

/// Codec for encoding/decoding event frames over a byte buffer
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Current header being decoded (if any)
    pending_header: Option<FrameHeader>,
}

impl FrameCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            pending_header: None,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Event;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match FrameHeader::decode(src)? {
                Some(h) => h,
                None => return Ok(None), // Need more data
            },
        };

        let payload_len = header.payload_length;
        if src.len() < payload_len {
            self.pending_header = Some(header);
            src.reserve(payload_len - src.len());
            return Ok(None);
        }

        let payload = src.split_to(payload_len).freeze();
        parse_payload(&payload).map(Some)
    }
}

impl Encoder<Event> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, event: Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_event_into(&event, dst)
    }
}

impl Encoder<&Event> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, event: &Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_event_into(event, dst)
    }
}
