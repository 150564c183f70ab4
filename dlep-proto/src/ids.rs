//! Stable wire identifiers for DLEP signals, TLVs and extensions.
//!
//! Values are taken from the IANA-style enumeration in the reference
//! implementation this core was distilled from (`dlep_iana.h`), continued
//! where that source left gaps for TLVs it didn't keep (link-id) and for
//! extension ids this protocol invents itself (link-id, IP).

/// A DLEP signal type, as carried in the 16-bit signal header.
pub type SignalId = u16;

/// A DLEP TLV type, as carried in the 16-bit TLV header.
pub type TlvId = u16;

/// A DLEP extension id. Negative values are reserved for the two
/// always-present base extensions; non-negative values are negotiated via
/// the Extensions Supported TLV.
pub type ExtensionId = i32;

pub mod signal {
    use super::SignalId;

    pub const PEER_DISCOVERY: SignalId = 1;
    pub const PEER_OFFER: SignalId = 2;
    pub const PEER_INITIALIZATION: SignalId = 3;
    pub const PEER_INITIALIZATION_ACK: SignalId = 4;
    pub const PEER_UPDATE: SignalId = 5;
    pub const PEER_UPDATE_ACK: SignalId = 6;
    pub const PEER_TERMINATION: SignalId = 7;
    pub const PEER_TERMINATION_ACK: SignalId = 8;
    pub const DESTINATION_UP: SignalId = 9;
    pub const DESTINATION_UP_ACK: SignalId = 10;
    pub const DESTINATION_DOWN: SignalId = 11;
    pub const DESTINATION_DOWN_ACK: SignalId = 12;
    pub const DESTINATION_UPDATE: SignalId = 13;
    pub const HEARTBEAT: SignalId = 14;
    pub const LINK_CHARACTERISTICS_REQUEST: SignalId = 15;
    pub const LINK_CHARACTERISTICS_ACK: SignalId = 16;

    /// Returns a human-readable name, for logging.
    pub fn name(id: SignalId) -> &'static str {
        match id {
            PEER_DISCOVERY => "Peer Discovery",
            PEER_OFFER => "Peer Offer",
            PEER_INITIALIZATION => "Peer Initialization",
            PEER_INITIALIZATION_ACK => "Peer Initialization Ack",
            PEER_UPDATE => "Peer Update",
            PEER_UPDATE_ACK => "Peer Update Ack",
            PEER_TERMINATION => "Peer Termination",
            PEER_TERMINATION_ACK => "Peer Termination Ack",
            DESTINATION_UP => "Destination Up",
            DESTINATION_UP_ACK => "Destination Up Ack",
            DESTINATION_DOWN => "Destination Down",
            DESTINATION_DOWN_ACK => "Destination Down Ack",
            DESTINATION_UPDATE => "Destination Update",
            HEARTBEAT => "Heartbeat",
            LINK_CHARACTERISTICS_REQUEST => "Link Characteristics Request",
            LINK_CHARACTERISTICS_ACK => "Link Characteristics Ack",
            _ => "Unknown",
        }
    }
}

pub mod tlv {
    use super::TlvId;

    pub const STATUS: TlvId = 1;
    pub const IPV4_CONPOINT: TlvId = 2;
    pub const IPV6_CONPOINT: TlvId = 3;
    pub const PEER_TYPE: TlvId = 4;
    pub const HEARTBEAT_INTERVAL: TlvId = 5;
    pub const EXTENSIONS_SUPPORTED: TlvId = 6;
    pub const MAC_ADDRESS: TlvId = 7;
    pub const IPV4_ADDRESS: TlvId = 8;
    pub const IPV6_ADDRESS: TlvId = 9;
    pub const IPV4_SUBNET: TlvId = 10;
    pub const IPV6_SUBNET: TlvId = 11;
    pub const MDRR: TlvId = 12;
    pub const MDRT: TlvId = 13;
    pub const CDRR: TlvId = 14;
    pub const CDRT: TlvId = 15;
    pub const LATENCY: TlvId = 16;
    pub const RESR: TlvId = 17;
    pub const REST: TlvId = 18;
    pub const RLQR: TlvId = 19;
    pub const RLQT: TlvId = 20;
    pub const LINK_CHAR_ACK_TIMER: TlvId = 21;
    // 22-24 reserved by the original implementation for credit-window
    // flow control; that extension is out of scope (not in SPEC_FULL.md's
    // module list), but the ids stay reserved so a future extension slots
    // in without a wire-format break.
    pub const FREQUENCY: TlvId = 25;
    pub const BANDWIDTH: TlvId = 26;
    pub const NOISE_LEVEL: TlvId = 27;
    pub const CHANNEL_ACTIVE: TlvId = 28;
    pub const CHANNEL_BUSY: TlvId = 29;
    pub const CHANNEL_RX: TlvId = 30;
    pub const CHANNEL_TX: TlvId = 31;
    pub const SIGNAL_RX: TlvId = 32;
    pub const SIGNAL_TX: TlvId = 33;
    pub const FRAMES_R: TlvId = 34;
    pub const FRAMES_T: TlvId = 35;
    pub const BYTES_R: TlvId = 36;
    pub const BYTES_T: TlvId = 37;
    pub const THROUGHPUT_T: TlvId = 38;
    pub const FRAMES_RETRIES: TlvId = 39;
    pub const FRAMES_FAILED: TlvId = 40;
    /// Not present in the kept slice of the reference source; assigned here
    /// to continue its enum. See `DESIGN.md` ("Open Questions resolved").
    pub const LINK_ID: TlvId = 41;
}

pub mod extension {
    use super::ExtensionId;

    pub const BASE_PROTO: ExtensionId = -2;
    pub const BASE_METRIC: ExtensionId = -1;
    pub const L1_STATS: ExtensionId = 256;
    pub const L2_STATS: ExtensionId = 257;
    /// Not assigned an id in the kept slice of the reference source;
    /// chosen here out of the non-negative negotiated range. See
    /// `DESIGN.md`.
    pub const LINK_ID: ExtensionId = 512;
    pub const IP: ExtensionId = 513;

    /// Extensions present on every session regardless of negotiation.
    pub const BASE: &[ExtensionId] = &[BASE_PROTO, BASE_METRIC];
}

/// Add/remove indicator carried by the IP/subnet address TLVs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AddrOp {
    Remove = 0,
    Add = 1,
}

impl AddrOp {
    pub fn from_flag(b: u8) -> Self {
        if b != 0 {
            Self::Add
        } else {
            Self::Remove
        }
    }

    pub fn flag(self) -> u8 {
        self as u8
    }
}
