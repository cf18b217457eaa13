//! Protocol error types

use std::fmt;

use thiserror::Error;

/// One of the four sections carried in every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Identity and routing (`part1`)
    Identity,
    /// Tracing and lifetime (`part2`)
    Trace,
    /// System parameters
    System,
    /// Execution parameters
    Exec,
}

impl Section {
    /// Sections in wire order
    pub const ALL: [Section; 4] = [
        Section::Identity,
        Section::Trace,
        Section::System,
        Section::Exec,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Identity => write!(f, "identity"),
            Section::Trace => write!(f, "trace"),
            Section::System => write!(f, "sysParams"),
            Section::Exec => write!(f, "execParams"),
        }
    }
}

/// Errors that can occur while framing or parsing events
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The fixed frame preamble is malformed
    #[error("Invalid frame preamble: '{0}'")]
    InvalidPreamble(String),

    /// The peer speaks a different protocol version
    #[error("Protocol version mismatch: expected '{expected}', got '{found}'")]
    VersionMismatch {
        expected: &'static str,
        found: String,
    },

    /// The inner section header line could not be parsed
    #[error("Invalid section header: '{0}'")]
    InvalidSectionHeader(String),

    /// The section header declares a section count other than 4
    #[error("Expected 4 sections, found {0}")]
    SectionCount(usize),

    /// A section carries a payload type other than JSON
    #[error("Unsupported type {kind} for {section} section")]
    UnsupportedSectionType { section: Section, kind: u8 },

    /// The identity section is mandatory
    #[error("Identity section cannot be empty")]
    EmptyIdentity,

    /// Declared section lengths disagree with the payload length
    #[error("Section lengths add up to {declared} bytes but the payload holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Payload exceeds what the six digit length field can carry
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Fewer bytes were available than the frame declared
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// The peer closed the connection before a frame started
    #[error("Connection closed before a frame was received")]
    ConnectionClosed,

    /// A section could not be converted to or from JSON
    #[error("Failed to process {section} section: {source}")]
    SectionJson {
        section: Section,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the enumerated vocabularies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// The symbolic name is not part of the vocabulary
    #[error("Unknown {vocabulary} '{name}'")]
    UnknownName {
        vocabulary: &'static str,
        name: String,
    },

    /// The wire value has no entry in the vocabulary
    #[error("{vocabulary} value {value} is out of range (0..{len})")]
    OutOfRange {
        vocabulary: &'static str,
        value: u32,
        len: usize,
    },
}

/// Errors raised by typed access to execution parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// No parameter with this key
    #[error("execParams does not contain key '{0}'")]
    MissingKey(String),

    /// Index is past the end of the parameter list
    #[error("execParams index {index} is out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The stored value does not parse as the requested type
    #[error("execParams value '{value}' cannot be converted: {reason}")]
    Invalid { value: String, reason: String },
}
