//! Session-level error taxonomy: wraps `dlep_proto::Error` with the session
//! context (§7's propagation policy) an extension processor can also raise.

use core::fmt;

use dlep_proto::StatusCode;

/// Why a session is being torn down. Distinguishes the three propagation
/// paths §7 describes: a wire-format/TLV violation, an extension or L2DB
/// failure, and a transport-level failure that precludes even sending
/// Termination.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    Protocol(dlep_proto::Error),
    UnexpectedSignal { expected: Option<u16>, got: u16 },
    L2Db(alloc::string::String),
    ExtensionConflict(u16),
    TransportClosed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::UnexpectedSignal { expected, got } => match expected {
                Some(expected) => write!(f, "expected signal {expected}, got {got}"),
                None => write!(f, "unexpected signal {got} for this session's state"),
            },
            Self::L2Db(msg) => write!(f, "L2DB error: {msg}"),
            Self::ExtensionConflict(id) => {
                write!(f, "TLV {id} registered with conflicting bounds by two extensions")
            }
            Self::TransportClosed => write!(f, "transport closed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SessionError {}

impl From<dlep_proto::Error> for SessionError {
    fn from(e: dlep_proto::Error) -> Self {
        Self::Protocol(e)
    }
}

impl SessionError {
    /// Whether this error can be reported to the peer via a Termination
    /// signal, or whether the transport is already gone (§7: "socket-level
    /// errors ... close the session silently").
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::TransportClosed)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Protocol(e) => e.status_code(),
            Self::UnexpectedSignal { .. } => StatusCode::UnexpectedMessage,
            Self::L2Db(_) | Self::ExtensionConflict(_) => StatusCode::InvalidData,
            Self::TransportClosed => StatusCode::Okay,
        }
    }
}
