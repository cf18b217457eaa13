//! Stream greeting
//!
//! After accepting a stream connection the server announces itself before any
//! frame is exchanged:
//!
//! ```text
//! 032:txProc@tiferet pver 3.0 md 32768
//! ```
//!
//! The decimal prefix up to the colon is the length of the text that follows.
//! `pver` is the protocol version (its leading digits and dots) and must
//! match exactly; `md` is the largest datagram the server accepts and is
//! informational.

use std::io::{self, Read};

use tracing::debug;
use txp_protocol::PROTOCOL_VERSION;

use crate::error::HandshakeError;

/// Longest length prefix accepted before the colon
const MAX_PREFIX_DIGITS: usize = 6;

/// A validated server greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Full greeting text after the length prefix
    pub text: String,
    /// Value of the `pver` token
    pub protocol_version: String,
    /// Value of the `md` token, if present
    pub max_datagram: Option<usize>,
}

/// Leading `[0-9.]` run of the word following `key`
fn token_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let word = text.split_whitespace().skip_while(|word| *word != key).nth(1)?;
    let end = word
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(word.len());
    (end > 0).then(|| &word[..end])
}

impl Greeting {
    /// Parse greeting text and check the protocol version
    pub fn parse(text: &str) -> Result<Self, HandshakeError> {
        let protocol_version = token_after(text, "pver")
            .ok_or_else(|| HandshakeError::MissingVersion(text.to_string()))?;

        if protocol_version != PROTOCOL_VERSION {
            return Err(HandshakeError::VersionMismatch {
                greeting: text.to_string(),
                expected: PROTOCOL_VERSION,
                found: protocol_version.to_string(),
            });
        }

        Ok(Self {
            text: text.to_string(),
            protocol_version: protocol_version.to_string(),
            max_datagram: token_after(text, "md").and_then(|md| md.parse().ok()),
        })
    }
}

fn read_byte<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Read and validate the greeting at the start of a stream
///
/// Reads one byte at a time up to the colon so that no frame bytes are
/// consumed. The stream is left open on failure.
pub fn read_greeting<R: Read + ?Sized>(reader: &mut R) -> Result<Greeting, HandshakeError> {
    let mut prefix = Vec::with_capacity(MAX_PREFIX_DIGITS + 1);
    loop {
        let byte = read_byte(reader)?.ok_or(HandshakeError::ConnectionClosed {
            received: prefix.len(),
        })?;
        if byte == b':' {
            break;
        }
        prefix.push(byte);
        if !byte.is_ascii_digit() || prefix.len() > MAX_PREFIX_DIGITS {
            return Err(HandshakeError::InvalidLength(
                String::from_utf8_lossy(&prefix).into_owned(),
            ));
        }
    }

    let len: usize = std::str::from_utf8(&prefix)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HandshakeError::InvalidLength(String::from_utf8_lossy(&prefix).into_owned()))?;

    let mut body = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut body[filled..]) {
            Ok(0) => {
                return Err(HandshakeError::ConnectionClosed {
                    received: prefix.len() + 1 + filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let text = String::from_utf8_lossy(&body);
    let greeting = Greeting::parse(text.trim_end())?;
    debug!(
        pver = %greeting.protocol_version,
        md = ?greeting.max_datagram,
        "Received greeting"
    );
    Ok(greeting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn greeting_bytes(text: &str) -> Vec<u8> {
        format!("{:03}:{}", text.len(), text).into_bytes()
    }

    #[test]
    fn test_read_greeting() {
        let mut cursor = Cursor::new(greeting_bytes("txProc@tiferet pver 3.0 md 32768"));
        let greeting = read_greeting(&mut cursor).unwrap();

        assert_eq!(greeting.protocol_version, "3.0");
        assert_eq!(greeting.max_datagram, Some(32768));
        assert_eq!(greeting.text, "txProc@tiferet pver 3.0 md 32768");
    }

    #[test]
    fn test_leaves_following_bytes_unread() {
        let mut bytes = greeting_bytes("txProc@host pver 3.0");
        bytes.extend_from_slice(b"#frameNewframe#");
        let mut cursor = Cursor::new(bytes);

        let greeting = read_greeting(&mut cursor).unwrap();
        assert_eq!(greeting.max_datagram, None);

        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "#frameNewframe#");
    }

    #[test]
    fn test_short_prefix() {
        let mut cursor = Cursor::new(b"20:txProc@host pver 3.0".to_vec());
        assert_eq!(read_greeting(&mut cursor).unwrap().protocol_version, "3.0");
    }

    #[test]
    fn test_version_mismatch() {
        for version in ["2.0", "3.01", "3"] {
            let text = format!("txProc@host pver {} md 32768", version);
            let mut cursor = Cursor::new(greeting_bytes(&text));
            assert!(
                matches!(
                    read_greeting(&mut cursor),
                    Err(HandshakeError::VersionMismatch { ref found, .. }) if found == version
                ),
                "version {}",
                version
            );
        }
    }

    #[test]
    fn test_trailing_punctuation() {
        let mut cursor = Cursor::new(greeting_bytes("txProc@host pver 3.0, md 32768;"));
        let greeting = read_greeting(&mut cursor).unwrap();
        assert_eq!(greeting.protocol_version, "3.0");
        assert_eq!(greeting.max_datagram, Some(32768));

        let mut cursor = Cursor::new(greeting_bytes("txProc@host pver 2.0;"));
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::VersionMismatch { ref found, .. }) if found == "2.0"
        ));

        let mut cursor = Cursor::new(greeting_bytes("txProc@host pver v3"));
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::MissingVersion(_))
        ));
    }

    #[test]
    fn test_missing_version() {
        let mut cursor = Cursor::new(greeting_bytes("txProc@host md 32768"));
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::MissingVersion(_))
        ));
    }

    #[test]
    fn test_bad_prefix() {
        let mut cursor = Cursor::new(b"abc:txProc".to_vec());
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::InvalidLength(_))
        ));

        let mut cursor = Cursor::new(b":txProc".to_vec());
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_truncated_greeting() {
        let mut cursor = Cursor::new(b"040:txProc@host pver 3.0".to_vec());
        assert!(matches!(
            read_greeting(&mut cursor),
            Err(HandshakeError::ConnectionClosed { .. })
        ));

        let mut empty = Cursor::new(Vec::new());
        assert!(matches!(
            read_greeting(&mut empty),
            Err(HandshakeError::ConnectionClosed { received: 0 })
        ));
    }
}
