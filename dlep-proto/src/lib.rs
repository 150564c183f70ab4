//! Wire codec, TLV catalog and parser state for the Dynamic Link Exchange
//! Protocol (DLEP), draft-ietf-manet-dlep-16 framing (2-byte signal header,
//! 2-byte TLV headers).
//!
//! This crate only knows about bytes: it has no notion of sockets, timers or
//! sessions. `dlep-session` builds the protocol engine on top of it.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
pub(crate) mod compat {
    pub use std::string::String;
    pub use std::vec::Vec;
}

#[cfg(not(feature = "std"))]
pub(crate) mod compat {
    extern crate alloc;
    pub use alloc::string::String;
    pub use alloc::vec::Vec;
}

pub mod codec;
pub mod error;
pub mod ids;
pub mod parser;
pub mod tlv;

pub use codec::{Reader, Writer};
pub use error::{Error, StatusCode};
pub use ids::{SignalId, TlvId};
pub use parser::{ParsedSignal, ParsedTlv, TlvBounds, TlvRegistry};
