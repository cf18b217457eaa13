//! txp-protocol: Wire protocol for submitting events to a txProc server
//!
//! This crate defines the event record and the length-prefixed frame format
//! (`#frameNewframe#v3.0`) used between clients and the txProc event
//! processing server. It performs no socket I/O of its own beyond generic
//! `Read`/`Write` helpers.

pub mod codec;
pub mod error;
pub mod event;
pub mod frame;
pub mod params;
mod serde_utils;
pub mod vocab;

pub use codec::{
    decode_event, encode_event, encode_event_into, load_event, parse_payload, read_event,
    save_event, write_event, FrameCodec,
};
pub use error::{ParamError, ProtocolError, Section, VocabularyError};
pub use event::{Event, Identity, SystemParams, Trace};
pub use frame::{
    FrameHeader, SectionTable, FRAME_HEADER_LEN, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION,
    SECTION_HEADER_LEN,
};
pub use params::{ExecParam, ExecParams};
pub use vocab::{Command, EventType};
