//! Frame header encoding/decoding
//!
//! A frame is ASCII framing around four JSON sections:
//!
//! ```text
//! #frameNewframe#v3.0:000123\n                   <- preamble, 27 bytes
//! 04,1,000031,1,000000,1,000033,1,000020\n      <- section table, 39 bytes
//! <identity><trace><sysParams><execParams>      <- section bodies
//! ```
//!
//! The preamble carries the payload length: section table plus bodies. Each
//! section table entry is a section type (always `1`, JSON) and a length.
//! Sections are concatenated without delimiters, so the lengths are
//! authoritative.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ProtocolError, Section};

/// Frame marker preceding the protocol version
pub const FRAME_MARKER: &str = "#frameNewframe#v";

/// Protocol version spoken by this crate
pub const PROTOCOL_VERSION: &str = "3.0";

/// Size of the preamble: marker, version, `:`, six digit length, `\n`
pub const FRAME_HEADER_LEN: usize = FRAME_MARKER.len() + PROTOCOL_VERSION.len() + 8;

/// Size of the section table line
pub const SECTION_HEADER_LEN: usize = 39;

/// Number of sections in every frame
pub const SECTION_COUNT: usize = 4;

/// Section type tag for JSON bodies
pub const SECTION_TYPE_JSON: u8 = 1;

/// Maximum payload length, limited by the six digit length field
pub const MAX_PAYLOAD_SIZE: usize = 999_999;

/// Parse a run of ASCII digits; anything else is rejected
fn parse_digits(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// The fixed preamble announcing a frame and its payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Bytes following the preamble: section table plus section bodies
    pub payload_length: usize,
}

impl FrameHeader {
    /// Create a new frame header
    pub fn new(payload_length: usize) -> Self {
        Self { payload_length }
    }

    /// Encode the preamble into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(FRAME_HEADER_LEN);
        dst.put_slice(FRAME_MARKER.as_bytes());
        dst.put_slice(PROTOCOL_VERSION.as_bytes());
        dst.put_slice(format!(":{:06}\n", self.payload_length).as_bytes());
    }

    /// Parse a preamble from the first `FRAME_HEADER_LEN` bytes of `src`
    pub fn parse(src: &[u8]) -> Result<Self, ProtocolError> {
        if src.len() < FRAME_HEADER_LEN {
            return Err(ProtocolError::IncompleteFrame {
                expected: FRAME_HEADER_LEN,
                actual: src.len(),
            });
        }
        let header = &src[..FRAME_HEADER_LEN];

        let rest = header
            .strip_prefix(FRAME_MARKER.as_bytes())
            .ok_or_else(|| ProtocolError::InvalidPreamble(lossy(header)))?;

        // Report a foreign version before complaining about layout
        let version_end = rest.iter().position(|b| *b == b':').unwrap_or(rest.len());
        let version = &rest[..version_end];
        if version != PROTOCOL_VERSION.as_bytes() {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: lossy(version),
            });
        }

        let length_field = &rest[version_end + 1..rest.len() - 1];
        if rest[rest.len() - 1] != b'\n' {
            return Err(ProtocolError::InvalidPreamble(lossy(header)));
        }
        let payload_length = parse_digits(length_field)
            .ok_or_else(|| ProtocolError::InvalidPreamble(lossy(header)))?;

        if payload_length < SECTION_HEADER_LEN {
            return Err(ProtocolError::InvalidPreamble(lossy(header)));
        }

        Ok(Self { payload_length })
    }

    /// Decode a preamble from a byte buffer
    ///
    /// Returns None if there aren't enough bytes in the buffer.
    /// Returns Err if the preamble is malformed or carries another version.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if src.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let header = Self::parse(src)?;
        src.advance(FRAME_HEADER_LEN);
        Ok(Some(header))
    }
}

/// The section table: the byte length of each of the four sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionTable {
    /// Lengths in wire order: identity, trace, sysParams, execParams
    pub lengths: [usize; SECTION_COUNT],
}

impl SectionTable {
    /// Create a section table from lengths in wire order
    pub fn new(lengths: [usize; SECTION_COUNT]) -> Self {
        Self { lengths }
    }

    /// Total length of the section bodies
    pub fn body_length(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// Payload length announced in the preamble
    pub fn payload_length(&self) -> usize {
        SECTION_HEADER_LEN + self.body_length()
    }

    /// Length of one section
    pub fn length(&self, section: Section) -> usize {
        self.lengths[section as usize]
    }

    /// Encode the section table line
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(SECTION_HEADER_LEN);
        dst.put_slice(format!("{:02}", SECTION_COUNT).as_bytes());
        for len in self.lengths {
            dst.put_slice(format!(",{},{:06}", SECTION_TYPE_JSON, len).as_bytes());
        }
        dst.put_u8(b'\n');
    }

    /// Parse the section table from the start of a payload
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let line_end = payload
            .iter()
            .position(|b| *b == b'\n')
            .unwrap_or(payload.len());
        let line = &payload[..line_end.min(SECTION_HEADER_LEN)];
        let invalid = || ProtocolError::InvalidSectionHeader(lossy(line));

        let count_end = line.iter().position(|b| *b == b',').ok_or_else(invalid)?;
        let count = parse_digits(&line[..count_end]).ok_or_else(invalid)?;
        if count != SECTION_COUNT {
            return Err(ProtocolError::SectionCount(count));
        }

        if payload.len() < SECTION_HEADER_LEN || payload[SECTION_HEADER_LEN - 1] != b'\n' {
            return Err(invalid());
        }

        // Fixed layout: "NN" then four ",T,LLLLLL" entries
        let mut lengths = [0usize; SECTION_COUNT];
        for (i, section) in Section::ALL.into_iter().enumerate() {
            let entry = &payload[2 + i * 9..2 + (i + 1) * 9];
            if entry[0] != b',' || entry[2] != b',' {
                return Err(invalid());
            }
            let kind = parse_digits(&entry[1..2]).ok_or_else(invalid)? as u8;
            if kind != SECTION_TYPE_JSON {
                return Err(ProtocolError::UnsupportedSectionType { section, kind });
            }
            lengths[i] = parse_digits(&entry[3..]).ok_or_else(invalid)?;
        }

        Ok(Self { lengths })
    }
}
