//! Socket creation
//!
//! Selection precedence: a local path opens a Unix datagram socket (no
//! greeting, no reply); otherwise host and service open a TCP stream
//! (greeting required, reply possible); otherwise there is nothing to connect
//! to. The pipe mode of older clients is not supported.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DEFAULT_SERVICES_FILE;
use crate::error::TransportError;
use crate::services::resolve_service;

/// Largest frame the server accepts on its datagram socket
pub const MAX_DATAGRAM_LEN: usize = 32768;

/// Session mode of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connectionless; no greeting and no reply
    Datagram,
    /// Connection oriented; greeting first, reply frame after each submission
    Stream,
}

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSpec {
    pub local_path: Option<PathBuf>,
    pub host: Option<String>,
    pub service: Option<String>,
    pub services_file: PathBuf,
}

impl Default for TransportSpec {
    fn default() -> Self {
        Self {
            local_path: None,
            host: None,
            service: None,
            services_file: PathBuf::from(DEFAULT_SERVICES_FILE),
        }
    }
}

impl TransportSpec {
    /// Local datagram socket at `path`
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// TCP stream to `host`:`service`
    pub fn remote(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            service: Some(service.into()),
            ..Self::default()
        }
    }

    fn stream_target(&self) -> Option<(&str, &str)> {
        match (self.host.as_deref(), self.service.as_deref()) {
            (Some(host), Some(service)) => Some((host, service)),
            _ => None,
        }
    }

    /// Mode that would be used, ignoring frame size
    pub fn kind(&self) -> Result<TransportKind, TransportError> {
        if self.local_path.is_some() {
            Ok(TransportKind::Datagram)
        } else if self.stream_target().is_some() {
            Ok(TransportKind::Stream)
        } else {
            Err(TransportError::NoDefinition)
        }
    }

    /// Mode for a frame of `frame_len` bytes
    ///
    /// Frames too large for a datagram go to the stream transport when one is
    /// configured.
    pub fn kind_for(&self, frame_len: usize) -> Result<TransportKind, TransportError> {
        let kind = self.kind()?;
        if kind == TransportKind::Datagram && frame_len > MAX_DATAGRAM_LEN {
            if self.stream_target().is_some() {
                warn!(
                    frame_len,
                    max = MAX_DATAGRAM_LEN,
                    "Frame too large for datagram, falling back to stream"
                );
                return Ok(TransportKind::Stream);
            }
            return Err(TransportError::DatagramTooLarge {
                size: frame_len,
                max: MAX_DATAGRAM_LEN,
            });
        }
        Ok(kind)
    }
}

/// An open, connected socket
#[derive(Debug)]
pub enum Transport {
    #[cfg(unix)]
    Datagram(UnixDatagram),
    Stream(TcpStream),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            #[cfg(unix)]
            Transport::Datagram(_) => TransportKind::Datagram,
            Transport::Stream(_) => TransportKind::Stream,
        }
    }

    /// Send one complete frame
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<usize, TransportError> {
        match self {
            #[cfg(unix)]
            Transport::Datagram(socket) => send_datagram(socket, frame),
            Transport::Stream(stream) => write_frame(stream, frame),
        }
    }
}

/// Open the transport selected by `spec`
pub fn create_transport(
    spec: &TransportSpec,
    connect_timeout: Option<Duration>,
) -> Result<Transport, TransportError> {
    create_transport_kind(spec, spec.kind()?, connect_timeout)
}

/// Open a transport of a specific kind
pub fn create_transport_kind(
    spec: &TransportSpec,
    kind: TransportKind,
    connect_timeout: Option<Duration>,
) -> Result<Transport, TransportError> {
    match kind {
        TransportKind::Datagram => {
            let path = spec.local_path.as_ref().ok_or(TransportError::NoDefinition)?;
            open_datagram(path)
        }
        TransportKind::Stream => {
            let (host, service) = spec.stream_target().ok_or(TransportError::NoDefinition)?;
            let port = resolve_service(service, &spec.services_file)?;
            connect_stream(host, port, connect_timeout).map(Transport::Stream)
        }
    }
}

#[cfg(unix)]
fn open_datagram(path: &Path) -> Result<Transport, TransportError> {
    let local_err = |source| TransportError::LocalSocket {
        path: path.to_path_buf(),
        source,
    };
    let socket = UnixDatagram::unbound().map_err(local_err)?;
    socket.connect(path).map_err(local_err)?;
    debug!(path = %path.display(), "Opened datagram transport");
    Ok(Transport::Datagram(socket))
}

#[cfg(not(unix))]
fn open_datagram(_path: &Path) -> Result<Transport, TransportError> {
    Err(TransportError::Unsupported)
}

/// Resolve `host` and connect to the first address that accepts
pub fn connect_stream(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<TcpStream, TransportError> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    let mut last_err = None;
    for addr in &addrs {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                debug!(%addr, "Opened stream transport");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(source) => Err(TransportError::Connect {
            address: format!("{}:{}", host, port),
            source,
        }),
        None => Err(TransportError::NoAddress(host.to_string())),
    }
}

/// Send a frame as one datagram; anything less than the whole frame is a failure
#[cfg(unix)]
pub fn send_datagram(socket: &UnixDatagram, frame: &[u8]) -> Result<usize, TransportError> {
    let written = socket.send(frame).map_err(TransportError::Send)?;
    if written != frame.len() {
        return Err(TransportError::ShortWrite {
            written,
            expected: frame.len(),
        });
    }
    Ok(written)
}

/// Write a whole frame to a stream; a zero-length write is a failure
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &[u8]) -> Result<usize, TransportError> {
    let mut written = 0;
    while written < frame.len() {
        match writer.write(&frame[written..]) {
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    written,
                    expected: frame.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Send(e)),
        }
    }
    writer.flush().map_err(TransportError::Send)?;
    Ok(written)
}
