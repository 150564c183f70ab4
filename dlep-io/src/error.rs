//! Error type for the socket glue layer: wraps the underlying transport's
//! error alongside the handful of framing problems that are this crate's
//! own (not `dlep-proto`'s, since a malformed *discovery* datagram never
//! reaches a `Session`).

use core::fmt;
use std::string::String;

/// Errors produced while discovering peers or running a session's socket
/// loop. Generic over the transport's own error type, mirroring
/// `edge_dhcp::io::Error<E>`.
#[derive(Debug)]
pub enum Error<E> {
    /// The underlying socket returned an error.
    Io(E),
    /// A UDP discovery datagram didn't start with the `"DLEP"` magic
    /// prefix (§5 "Wire framing") and was dropped.
    MissingMagic,
    /// The peer closed the TCP connection (read returned zero bytes).
    Closed,
    /// A socket factory call failed with an error type other than `E`
    /// (e.g. binding the TCP listener while `E` tracks the UDP socket's
    /// error type); formatted eagerly since the two error types have no
    /// common trait to carry across unchanged.
    Bind(String),
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Io(value)
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::MissingMagic => write!(f, "discovery datagram missing \"DLEP\" magic prefix"),
            Self::Closed => write!(f, "peer closed the connection"),
            Self::Bind(msg) => write!(f, "socket factory error: {msg}"),
        }
    }
}

impl<E> std::error::Error for Error<E> where E: std::error::Error + 'static {}
