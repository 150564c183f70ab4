//! The DLEP protocol engine: extension dispatch, session state machine and
//! destination (neighbor) lifecycle, built on top of `dlep-proto`'s wire
//! codec.
//!
//! This crate knows nothing about sockets or timers beyond the durations it
//! is configured with: `Session::feed` consumes bytes and produces bytes,
//! and `Session::poll_timers` is a pure function of "now" that the caller
//! (`dlep-io`) drives from an actual event loop. This mirrors how
//! `edge_dhcp::server::Server::handle_request` stays synchronous while
//! `edge_dhcp::io::server::Server::run` owns the async socket loop.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod ext;
pub mod extension;
pub mod l2db;
pub mod neighbor;
pub mod session;

pub use error::SessionError;
pub use extension::{Extension, Registry, SignalSpec};
pub use l2db::{Field, IpPrefix, L2Db, L2Value, NeighId, NetId, OriginId};
pub use neighbor::{DestState, LocalNeighbor, NeighborKey};
pub use session::{Event, Role, Session, SessionConfig, SessionState};
