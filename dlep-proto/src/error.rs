use core::fmt;

use crate::ids::TlvId;

/// The parser/dispatch error taxonomy from the specification's error
/// handling design (§7). `Okay` is intentionally absent: success is
/// represented by `Ok(..)`, not by a variant of this enum.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    IncompleteHeader,
    IncompleteSignal,
    IncompleteTlvHeader,
    IncompleteTlv,
    UnsupportedTlv(TlvId),
    IllegalTlvLength(TlvId),
    MissingMandatoryTlv(TlvId),
    DuplicateTlv(TlvId),
    OutOfMemory,
    InternalError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteHeader => write!(f, "incomplete signal header"),
            Self::IncompleteSignal => write!(f, "incomplete signal body"),
            Self::IncompleteTlvHeader => write!(f, "incomplete TLV header"),
            Self::IncompleteTlv => write!(f, "incomplete TLV value"),
            Self::UnsupportedTlv(id) => write!(f, "unsupported TLV {id}"),
            Self::IllegalTlvLength(id) => write!(f, "illegal length for TLV {id}"),
            Self::MissingMandatoryTlv(id) => write!(f, "missing mandatory TLV {id}"),
            Self::DuplicateTlv(id) => write!(f, "duplicate TLV {id}"),
            Self::OutOfMemory => write!(f, "parser value storage exhausted"),
            Self::InternalError => write!(f, "internal DLEP engine error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Whether this error is recoverable on a stream transport: the caller
    /// should keep the bytes buffered and wait for more to arrive, rather
    /// than tearing the session down (§7: "recoverable: leave the bytes in
    /// the input buffer and wait for more").
    pub fn is_recoverable_on_stream(&self) -> bool {
        matches!(self, Self::IncompleteHeader | Self::IncompleteSignal)
    }

    /// The Status TLV code a Peer Termination carrying this error should
    /// report, per §7's propagation policy.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedTlv(_)
            | Self::IllegalTlvLength(_)
            | Self::MissingMandatoryTlv(_)
            | Self::DuplicateTlv(_)
            | Self::IncompleteTlvHeader
            | Self::IncompleteTlv => StatusCode::InvalidData,
            Self::OutOfMemory | Self::InternalError => StatusCode::RequestDenied,
            Self::IncompleteHeader | Self::IncompleteSignal => StatusCode::InvalidData,
        }
    }
}

/// Status codes carried by the Status TLV. Taken from the reference
/// implementation's `dlep_status` enum (`dlep_iana.h`) since `spec.md`
/// names several of these by string (`InvalidData`, `UnexpectedMessage`,
/// `OK`) without enumerating the full set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum StatusCode {
    Okay = 0,
    UnknownMessage = 1,
    UnexpectedMessage = 2,
    InvalidData = 3,
    InvalidDestination = 4,
    NotInterested = 100,
    RequestDenied = 101,
    TimedOut = 102,
}

impl StatusCode {
    pub fn from_wire(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Okay,
            1 => Self::UnknownMessage,
            2 => Self::UnexpectedMessage,
            3 => Self::InvalidData,
            4 => Self::InvalidDestination,
            100 => Self::NotInterested,
            101 => Self::RequestDenied,
            102 => Self::TimedOut,
            _ => return None,
        })
    }

    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Okay)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Okay => "OK",
            Self::UnknownMessage => "unknown message",
            Self::UnexpectedMessage => "unexpected message",
            Self::InvalidData => "invalid data",
            Self::InvalidDestination => "invalid destination",
            Self::NotInterested => "not interested",
            Self::RequestDenied => "request denied",
            Self::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}
