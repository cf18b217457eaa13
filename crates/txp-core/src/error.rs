//! Core error types for txProc clients

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use txp_protocol::ProtocolError;

/// Top-level error type for a client exchange
#[derive(Error, Debug)]
pub enum TxpError {
    /// Framing or parse failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Socket creation, resolution or send failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The stream greeting was missing or unacceptable
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Waiting for the socket failed
    #[error("Readiness error: {0}")]
    Readiness(#[from] ReadinessError),

    /// No reply arrived within the configured wait
    #[error("No reply within {0:?}")]
    ReplyTimeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Transport creation and delivery errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Neither a local path nor host and service were configured
    #[error("no transport definition available")]
    NoDefinition,

    /// Local sockets are not available on this platform
    #[error("Local datagram sockets are not supported on this platform")]
    Unsupported,

    /// Frame does not fit in a datagram and there is no stream fallback
    #[error("Frame of {size} bytes exceeds the datagram limit of {max} bytes and no TCP server is configured")]
    DatagramTooLarge { size: usize, max: usize },

    /// Service name is not numeric and is not listed in the services file
    #[error("Unknown service '{service}' (looked up in {path})")]
    UnknownService { service: String, path: PathBuf },

    /// The services file could not be read
    #[error("Failed to read services file {path}: {source}")]
    ServicesFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Host name resolution failed
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but produced no addresses
    #[error("No addresses found for {0}")]
    NoAddress(String),

    /// Every resolved address refused the connection
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The local datagram socket could not be opened or connected
    #[error("Failed to open local socket {path}: {source}")]
    LocalSocket {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes than the frame length were accepted by the socket
    #[error("Short write: {written} of {expected} bytes sent")]
    ShortWrite { written: usize, expected: usize },

    /// Sending failed
    #[error("Send failed: {0}")]
    Send(#[source] io::Error),
}

/// Greeting errors
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// The server closed the stream before the greeting was complete
    #[error("Connection closed during greeting after {received} bytes")]
    ConnectionClosed { received: usize },

    /// The length prefix is not a decimal number followed by `:`
    #[error("Invalid greeting length prefix: '{0}'")]
    InvalidLength(String),

    /// The greeting text carries no `pver` token
    #[error("Greeting '{0}' has no protocol version")]
    MissingVersion(String),

    /// The server speaks a different protocol version
    #[error("Greeting '{greeting}' announces protocol version '{found}', expected '{expected}'")]
    VersionMismatch {
        greeting: String,
        expected: &'static str,
        found: String,
    },

    /// I/O error while reading the greeting
    #[error("I/O error reading greeting: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the readiness wait
///
/// A timeout is not an error; see `readiness::Readiness::TimedOut`.
#[derive(Error, Debug)]
pub enum ReadinessError {
    /// The poll call itself failed
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The descriptor is not open
    #[error("Descriptor {0} is not open")]
    InvalidDescriptor(i32),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
