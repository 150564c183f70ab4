//! The TLV catalog: per-id length bounds and typed value decode/encode.
//!
//! Mirrors the shape of the reference implementation's per-TLV reader
//! functions (`dlep_reader_*`) and the teacher's `DhcpOption` enum
//! (`edge-dhcp`): one `TlvValue` variant per catalog entry, each knowing its
//! own wire id, decode and encode.

use core::net::{Ipv4Addr, Ipv6Addr};

use crate::codec::{self, Writer};
use crate::error::{Error, StatusCode};
use crate::ids::tlv;

/// Static length bounds for one TLV id, as installed into a session's
/// allowed-TLV map by the extension that declares it (§4.2).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TlvBounds {
    pub min_len: u16,
    pub max_len: u16,
    /// Whether this TLV id may legally appear more than once in a single
    /// signal (§8 P5's "duplicate set").
    pub repeatable: bool,
}

impl TlvBounds {
    pub const fn fixed(len: u16) -> Self {
        Self {
            min_len: len,
            max_len: len,
            repeatable: false,
        }
    }

    pub const fn range(min_len: u16, max_len: u16) -> Self {
        Self {
            min_len,
            max_len,
            repeatable: false,
        }
    }

    pub const fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn accepts(&self, len: u16) -> bool {
        len >= self.min_len && len <= self.max_len
    }
}

/// Bounds for every TLV this core knows how to decode, keyed by id. Base
/// protocol and base metric ids are always present; L1/L2 stats, link-id
/// and IP extension ids are added by `dlep-session`'s extension registry
/// only once that extension has been negotiated (§4.2, §4.3).
pub const fn bounds_for(id: u16) -> Option<TlvBounds> {
    Some(match id {
        tlv::STATUS => TlvBounds::range(1, 255),
        tlv::IPV4_CONPOINT => TlvBounds::range(4, 6),
        tlv::IPV6_CONPOINT => TlvBounds::range(16, 18),
        tlv::PEER_TYPE => TlvBounds::range(1, 255),
        tlv::HEARTBEAT_INTERVAL => TlvBounds::fixed(2),
        tlv::EXTENSIONS_SUPPORTED => TlvBounds::range(0, 510),
        tlv::MAC_ADDRESS => TlvBounds::range(6, 8),
        tlv::IPV4_ADDRESS => TlvBounds::range(5, 5).repeatable(),
        tlv::IPV6_ADDRESS => TlvBounds::range(17, 17).repeatable(),
        tlv::IPV4_SUBNET => TlvBounds::fixed(6).repeatable(),
        tlv::IPV6_SUBNET => TlvBounds::fixed(18).repeatable(),
        tlv::MDRR | tlv::MDRT | tlv::CDRR | tlv::CDRT => TlvBounds::fixed(8),
        tlv::LATENCY => TlvBounds::fixed(4),
        tlv::RESR | tlv::REST | tlv::RLQR | tlv::RLQT => TlvBounds::fixed(1),
        tlv::LINK_CHAR_ACK_TIMER => TlvBounds::fixed(1),
        tlv::FREQUENCY | tlv::BANDWIDTH => TlvBounds::range(8, 16),
        tlv::NOISE_LEVEL
        | tlv::CHANNEL_ACTIVE
        | tlv::CHANNEL_BUSY
        | tlv::CHANNEL_RX
        | tlv::CHANNEL_TX => TlvBounds::fixed(8),
        tlv::SIGNAL_RX | tlv::SIGNAL_TX => TlvBounds::fixed(4),
        tlv::FRAMES_R
        | tlv::FRAMES_T
        | tlv::BYTES_R
        | tlv::BYTES_T
        | tlv::THROUGHPUT_T
        | tlv::FRAMES_RETRIES
        | tlv::FRAMES_FAILED => TlvBounds::fixed(8),
        tlv::LINK_ID => TlvBounds::range(1, 255),
        _ => return None,
    })
}

/// A decoded TLV value. Scalars that feed the L2DB (§4.6) are widened to
/// `u64`/`i64` here; callers needing the raw field width read `value()`
/// directly via `dlep_proto::codec`'s helpers instead.
#[derive(Clone, Debug, PartialEq)]
pub enum TlvValue {
    Status { code: StatusCode, reason: alloc_str::Str },
    Ipv4ConPoint { addr: Ipv4Addr, port: Option<u16> },
    Ipv6ConPoint { addr: Ipv6Addr, port: Option<u16> },
    PeerType(alloc_str::Str),
    HeartbeatInterval(u16),
    ExtensionsSupported(crate::compat::Vec<u16>),
    MacAddress([u8; 8]),
    Ipv4Address { add: bool, addr: Ipv4Addr },
    Ipv6Address { add: bool, addr: Ipv6Addr },
    Ipv4Subnet { add: bool, addr: Ipv4Addr, prefix: u8 },
    Ipv6Subnet { add: bool, addr: Ipv6Addr, prefix: u8 },
    Mdrr(u64),
    Mdrt(u64),
    Cdrr(u64),
    Cdrt(u64),
    Latency(u32),
    Resr(u8),
    Rest(u8),
    Rlqr(u8),
    Rlqt(u8),
    LinkCharAckTimer(u8),
    Frequency { primary: u64, secondary: Option<u64> },
    Bandwidth { primary: u64, secondary: Option<u64> },
    NoiseLevel(u64),
    ChannelActive(u64),
    ChannelBusy(u64),
    ChannelRx(u64),
    ChannelTx(u64),
    SignalRx(i32),
    SignalTx(i32),
    FramesR(u64),
    FramesT(u64),
    BytesR(u64),
    BytesT(u64),
    ThroughputT(u64),
    FramesRetries(u64),
    FramesFailed(u64),
    LinkId(crate::compat::Vec<u8>),
}

impl TlvValue {
    pub fn id(&self) -> u16 {
        match self {
            Self::Status { .. } => tlv::STATUS,
            Self::Ipv4ConPoint { .. } => tlv::IPV4_CONPOINT,
            Self::Ipv6ConPoint { .. } => tlv::IPV6_CONPOINT,
            Self::PeerType(_) => tlv::PEER_TYPE,
            Self::HeartbeatInterval(_) => tlv::HEARTBEAT_INTERVAL,
            Self::ExtensionsSupported(_) => tlv::EXTENSIONS_SUPPORTED,
            Self::MacAddress(_) => tlv::MAC_ADDRESS,
            Self::Ipv4Address { .. } => tlv::IPV4_ADDRESS,
            Self::Ipv6Address { .. } => tlv::IPV6_ADDRESS,
            Self::Ipv4Subnet { .. } => tlv::IPV4_SUBNET,
            Self::Ipv6Subnet { .. } => tlv::IPV6_SUBNET,
            Self::Mdrr(_) => tlv::MDRR,
            Self::Mdrt(_) => tlv::MDRT,
            Self::Cdrr(_) => tlv::CDRR,
            Self::Cdrt(_) => tlv::CDRT,
            Self::Latency(_) => tlv::LATENCY,
            Self::Resr(_) => tlv::RESR,
            Self::Rest(_) => tlv::REST,
            Self::Rlqr(_) => tlv::RLQR,
            Self::Rlqt(_) => tlv::RLQT,
            Self::LinkCharAckTimer(_) => tlv::LINK_CHAR_ACK_TIMER,
            Self::Frequency { .. } => tlv::FREQUENCY,
            Self::Bandwidth { .. } => tlv::BANDWIDTH,
            Self::NoiseLevel(_) => tlv::NOISE_LEVEL,
            Self::ChannelActive(_) => tlv::CHANNEL_ACTIVE,
            Self::ChannelBusy(_) => tlv::CHANNEL_BUSY,
            Self::ChannelRx(_) => tlv::CHANNEL_RX,
            Self::ChannelTx(_) => tlv::CHANNEL_TX,
            Self::SignalRx(_) => tlv::SIGNAL_RX,
            Self::SignalTx(_) => tlv::SIGNAL_TX,
            Self::FramesR(_) => tlv::FRAMES_R,
            Self::FramesT(_) => tlv::FRAMES_T,
            Self::BytesR(_) => tlv::BYTES_R,
            Self::BytesT(_) => tlv::BYTES_T,
            Self::ThroughputT(_) => tlv::THROUGHPUT_T,
            Self::FramesRetries(_) => tlv::FRAMES_RETRIES,
            Self::FramesFailed(_) => tlv::FRAMES_FAILED,
            Self::LinkId(_) => tlv::LINK_ID,
        }
    }

    /// Decodes a TLV value given its wire id and raw bytes. Length bounds
    /// must already have been checked by the parser against `bounds_for`;
    /// this only handles the internal shape (e.g. one vs. two `u64`s for
    /// Frequency/Bandwidth).
    pub fn decode(id: u16, value: &[u8]) -> Result<Self, Error> {
        Ok(match id {
            tlv::STATUS => {
                let (code, reason) = codec::read_status(value)?;
                Self::Status {
                    code,
                    reason: alloc_str::Str::from(reason),
                }
            }
            tlv::IPV4_CONPOINT => {
                let (addr, port) = codec::read_conpoint_v4(value)?;
                Self::Ipv4ConPoint { addr, port }
            }
            tlv::IPV6_CONPOINT => {
                let (addr, port) = codec::read_conpoint_v6(value)?;
                Self::Ipv6ConPoint { addr, port }
            }
            tlv::PEER_TYPE => {
                let s = core::str::from_utf8(value).map_err(|_| Error::IllegalTlvLength(id))?;
                Self::PeerType(alloc_str::Str::from(s))
            }
            tlv::HEARTBEAT_INTERVAL => Self::HeartbeatInterval(u16::from_be_bytes(
                value.try_into().map_err(|_| Error::IllegalTlvLength(id))?,
            )),
            tlv::EXTENSIONS_SUPPORTED => Self::ExtensionsSupported(codec::read_extensions(value)?),
            tlv::MAC_ADDRESS => Self::MacAddress(codec::read_mac(value)?),
            tlv::IPV4_ADDRESS => {
                let (add, addr, _) = codec::read_ipv4_change(value)?;
                Self::Ipv4Address { add, addr }
            }
            tlv::IPV6_ADDRESS => {
                let (add, addr, _) = codec::read_ipv6_change(value)?;
                Self::Ipv6Address { add, addr }
            }
            tlv::IPV4_SUBNET => {
                let (add, addr, prefix) = codec::read_ipv4_change(value)?;
                Self::Ipv4Subnet {
                    add,
                    addr,
                    prefix: prefix.ok_or(Error::IllegalTlvLength(id))?,
                }
            }
            tlv::IPV6_SUBNET => {
                let (add, addr, prefix) = codec::read_ipv6_change(value)?;
                Self::Ipv6Subnet {
                    add,
                    addr,
                    prefix: prefix.ok_or(Error::IllegalTlvLength(id))?,
                }
            }
            tlv::MDRR => Self::Mdrr(codec::read_unsigned(value)?),
            tlv::MDRT => Self::Mdrt(codec::read_unsigned(value)?),
            tlv::CDRR => Self::Cdrr(codec::read_unsigned(value)?),
            tlv::CDRT => Self::Cdrt(codec::read_unsigned(value)?),
            tlv::LATENCY => Self::Latency(codec::read_unsigned(value)? as u32),
            tlv::RESR => Self::Resr(value.first().copied().ok_or(Error::IllegalTlvLength(id))?),
            tlv::REST => Self::Rest(value.first().copied().ok_or(Error::IllegalTlvLength(id))?),
            tlv::RLQR => Self::Rlqr(value.first().copied().ok_or(Error::IllegalTlvLength(id))?),
            tlv::RLQT => Self::Rlqt(value.first().copied().ok_or(Error::IllegalTlvLength(id))?),
            tlv::LINK_CHAR_ACK_TIMER => {
                Self::LinkCharAckTimer(value.first().copied().ok_or(Error::IllegalTlvLength(id))?)
            }
            tlv::FREQUENCY | tlv::BANDWIDTH => {
                let (primary, secondary) = decode_one_or_two_u64(value, id)?;
                if id == tlv::FREQUENCY {
                    Self::Frequency { primary, secondary }
                } else {
                    Self::Bandwidth { primary, secondary }
                }
            }
            tlv::NOISE_LEVEL => Self::NoiseLevel(codec::read_unsigned(value)?),
            tlv::CHANNEL_ACTIVE => Self::ChannelActive(codec::read_unsigned(value)?),
            tlv::CHANNEL_BUSY => Self::ChannelBusy(codec::read_unsigned(value)?),
            tlv::CHANNEL_RX => Self::ChannelRx(codec::read_unsigned(value)?),
            tlv::CHANNEL_TX => Self::ChannelTx(codec::read_unsigned(value)?),
            tlv::SIGNAL_RX => Self::SignalRx(codec::read_signed(value)? as i32),
            tlv::SIGNAL_TX => Self::SignalTx(codec::read_signed(value)? as i32),
            tlv::FRAMES_R => Self::FramesR(codec::read_unsigned(value)?),
            tlv::FRAMES_T => Self::FramesT(codec::read_unsigned(value)?),
            tlv::BYTES_R => Self::BytesR(codec::read_unsigned(value)?),
            tlv::BYTES_T => Self::BytesT(codec::read_unsigned(value)?),
            tlv::THROUGHPUT_T => Self::ThroughputT(codec::read_unsigned(value)?),
            tlv::FRAMES_RETRIES => Self::FramesRetries(codec::read_unsigned(value)?),
            tlv::FRAMES_FAILED => Self::FramesFailed(codec::read_unsigned(value)?),
            tlv::LINK_ID => Self::LinkId(value.to_vec_compat()),
            _ => return Err(Error::UnsupportedTlv(id)),
        })
    }

    /// Appends this value's TLV encoding onto `writer`.
    pub fn encode(&self, writer: &mut Writer) {
        match self {
            Self::Status { code, reason } => writer.add_status(tlv::STATUS, *code, reason.as_str()),
            Self::Ipv4ConPoint { addr, port } => {
                let sock = match port {
                    Some(p) => core::net::SocketAddr::new((*addr).into(), *p),
                    None => core::net::SocketAddr::new((*addr).into(), 0),
                };
                if port.is_some() {
                    writer.add_conpoint(tlv::IPV4_CONPOINT, sock);
                } else {
                    writer.add_ipv4(tlv::IPV4_CONPOINT, *addr);
                }
            }
            Self::Ipv6ConPoint { addr, port } => {
                let sock = core::net::SocketAddr::new((*addr).into(), port.unwrap_or(0));
                if port.is_some() {
                    writer.add_conpoint(tlv::IPV6_CONPOINT, sock);
                } else {
                    writer.add_ipv6(tlv::IPV6_CONPOINT, *addr);
                }
            }
            Self::PeerType(s) => writer.add_str(tlv::PEER_TYPE, s.as_str()),
            Self::HeartbeatInterval(v) => writer.add_u16(tlv::HEARTBEAT_INTERVAL, *v),
            Self::ExtensionsSupported(ids) => writer.add_extensions(tlv::EXTENSIONS_SUPPORTED, ids),
            Self::MacAddress(mac) => writer.add_mac(tlv::MAC_ADDRESS, mac),
            Self::Ipv4Address { add, addr } => {
                writer.add_ipv4_change(tlv::IPV4_ADDRESS, *add, *addr, None)
            }
            Self::Ipv6Address { add, addr } => {
                writer.add_ipv6_change(tlv::IPV6_ADDRESS, *add, *addr, None)
            }
            Self::Ipv4Subnet { add, addr, prefix } => {
                writer.add_ipv4_change(tlv::IPV4_SUBNET, *add, *addr, Some(*prefix))
            }
            Self::Ipv6Subnet { add, addr, prefix } => {
                writer.add_ipv6_change(tlv::IPV6_SUBNET, *add, *addr, Some(*prefix))
            }
            Self::Mdrr(v) => writer.add_u64(tlv::MDRR, *v),
            Self::Mdrt(v) => writer.add_u64(tlv::MDRT, *v),
            Self::Cdrr(v) => writer.add_u64(tlv::CDRR, *v),
            Self::Cdrt(v) => writer.add_u64(tlv::CDRT, *v),
            Self::Latency(v) => writer.add_u32(tlv::LATENCY, *v),
            Self::Resr(v) => writer.add_u8(tlv::RESR, *v),
            Self::Rest(v) => writer.add_u8(tlv::REST, *v),
            Self::Rlqr(v) => writer.add_u8(tlv::RLQR, *v),
            Self::Rlqt(v) => writer.add_u8(tlv::RLQT, *v),
            Self::LinkCharAckTimer(v) => writer.add_u8(tlv::LINK_CHAR_ACK_TIMER, *v),
            Self::Frequency { primary, secondary } => {
                encode_one_or_two_u64(writer, tlv::FREQUENCY, *primary, *secondary)
            }
            Self::Bandwidth { primary, secondary } => {
                encode_one_or_two_u64(writer, tlv::BANDWIDTH, *primary, *secondary)
            }
            Self::NoiseLevel(v) => writer.add_u64(tlv::NOISE_LEVEL, *v),
            Self::ChannelActive(v) => writer.add_u64(tlv::CHANNEL_ACTIVE, *v),
            Self::ChannelBusy(v) => writer.add_u64(tlv::CHANNEL_BUSY, *v),
            Self::ChannelRx(v) => writer.add_u64(tlv::CHANNEL_RX, *v),
            Self::ChannelTx(v) => writer.add_u64(tlv::CHANNEL_TX, *v),
            Self::SignalRx(v) => writer.add_i32(tlv::SIGNAL_RX, *v),
            Self::SignalTx(v) => writer.add_i32(tlv::SIGNAL_TX, *v),
            Self::FramesR(v) => writer.add_u64(tlv::FRAMES_R, *v),
            Self::FramesT(v) => writer.add_u64(tlv::FRAMES_T, *v),
            Self::BytesR(v) => writer.add_u64(tlv::BYTES_R, *v),
            Self::BytesT(v) => writer.add_u64(tlv::BYTES_T, *v),
            Self::ThroughputT(v) => writer.add_u64(tlv::THROUGHPUT_T, *v),
            Self::FramesRetries(v) => writer.add_u64(tlv::FRAMES_RETRIES, *v),
            Self::FramesFailed(v) => writer.add_u64(tlv::FRAMES_FAILED, *v),
            Self::LinkId(key) => writer.add_lid(tlv::LINK_ID, key),
        }
    }
}

fn decode_one_or_two_u64(value: &[u8], id: u16) -> Result<(u64, Option<u64>), Error> {
    match value.len() {
        8 => Ok((u64::from_be_bytes(value.try_into().unwrap()), None)),
        16 => {
            let primary = u64::from_be_bytes(value[..8].try_into().unwrap());
            let secondary = u64::from_be_bytes(value[8..].try_into().unwrap());
            Ok((primary, Some(secondary)))
        }
        _ => Err(Error::IllegalTlvLength(id)),
    }
}

fn encode_one_or_two_u64(writer: &mut Writer, id: u16, primary: u64, secondary: Option<u64>) {
    match secondary {
        None => writer.add_u64(id, primary),
        Some(secondary) => {
            let mut value = [0u8; 16];
            value[..8].copy_from_slice(&primary.to_be_bytes());
            value[8..].copy_from_slice(&secondary.to_be_bytes());
            writer.add_tlv(id, &value);
        }
    }
}

trait VecExt {
    fn to_vec_compat(&self) -> crate::compat::Vec<u8>;
}

impl VecExt for [u8] {
    fn to_vec_compat(&self) -> crate::compat::Vec<u8> {
        let mut v = crate::compat::Vec::new();
        v.extend_from_slice(self);
        v
    }
}

/// A tiny owned-string wrapper that is `String` under `std` and a
/// `heapless`-free `alloc::string::String` under `no_std`+`alloc`, so
/// `TlvValue` doesn't need two shapes for text-bearing TLVs.
pub mod alloc_str {
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Str(crate::compat::String);

    impl Str {
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl From<&str> for Str {
        fn from(s: &str) -> Self {
            let mut owned = crate::compat::String::new();
            owned.push_str(s);
            Self(owned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        let mut w = Writer::new();
        w.start_signal(crate::ids::signal::PEER_TERMINATION);
        let v = TlvValue::Status {
            code: StatusCode::Okay,
            reason: alloc_str::Str::from(""),
        };
        v.encode(&mut w);
        let framed = w.finish_signal().to_vec();
        let decoded = TlvValue::decode(tlv::STATUS, &framed[8..]).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn frequency_with_secondary_channel() {
        let mut w = Writer::new();
        w.start_signal(crate::ids::signal::PEER_INITIALIZATION_ACK);
        let v = TlvValue::Frequency {
            primary: 2_412_000_000,
            secondary: Some(2_417_000_000),
        };
        v.encode(&mut w);
        let framed = w.finish_signal().to_vec();
        let decoded = TlvValue::decode(tlv::FREQUENCY, &framed[8..]).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn bounds_reject_out_of_range_length() {
        let bounds = bounds_for(tlv::HEARTBEAT_INTERVAL).unwrap();
        assert!(bounds.accepts(2));
        assert!(!bounds.accepts(3));
    }

    #[test]
    fn unknown_tlv_id_is_unsupported() {
        assert_eq!(TlvValue::decode(9999, &[]).unwrap_err(), Error::UnsupportedTlv(9999));
    }
}
