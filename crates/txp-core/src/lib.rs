//! txp-core: Client side of the txProc event submission protocol
//!
//! This crate opens transports to a txProc server, performs the stream
//! greeting, and drives a single submit round trip on top of the frame
//! format defined in `txp-protocol`. Everything is blocking; one exchange
//! owns at most one socket.

pub mod config;
pub mod error;
pub mod exchange;
pub mod greeting;
#[cfg(unix)]
pub mod readiness;
pub mod services;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ConfigError, HandshakeError, ReadinessError, TransportError, TxpError};
#[cfg(unix)]
pub use exchange::read_reply;
pub use exchange::{status_code, Exchange, Submission, SubmitStatus, STATUS_FAILED};
pub use greeting::{read_greeting, Greeting};
#[cfg(unix)]
pub use readiness::{wait_readable, Readiness};
pub use transport::{create_transport, Transport, TransportKind, TransportSpec, MAX_DATAGRAM_LEN};
