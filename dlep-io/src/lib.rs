//! Async glue binding `edge-nal`'s socket factories to `dlep-session`'s
//! pure, byte-in/byte-out `Session` (§4.9). Everything in `dlep-session`
//! and `dlep-proto` is `no_std` + `alloc`; this crate is the one place the
//! workspace touches an actual clock, an actual socket, and `tokio`.

pub mod discovery;
pub mod error;
pub mod interface;
pub mod tcp;

pub use discovery::{Discovery, Offer};
pub use error::Error;
pub use interface::{RadioConfig, RouterConfig};
