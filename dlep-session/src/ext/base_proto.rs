//! Base Protocol extension (§4.4/§4.5): the always-installed extension that
//! carries the handshake TLVs (heartbeat interval, peer type, extensions
//! supported), the destination-carrying MAC address, and status reporting
//! on acknowledgement and termination signals.
//!
//! The handshake itself (`Peer Initialization`/`Ack` parsing, extension
//! negotiation) is driven directly by `Session` rather than through
//! `process`, since negotiating the active extension set has to happen
//! before any extension's `process` can run. This extension's `process` is
//! limited to logging a non-Okay status on the acknowledgement signals.

use alloc::string::String;

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::{ParsedSignal, StatusCode};

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::neighbor::NeighborKey;
use crate::session::Session;

const HANDSHAKE_TLVS: &[TlvId] = &[tlv::HEARTBEAT_INTERVAL, tlv::EXTENSIONS_SUPPORTED];
const DESTINATION_TLVS: &[TlvId] = &[tlv::MAC_ADDRESS];
const STATUS_TLV: &[TlvId] = &[tlv::STATUS];

const SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        signal: signal::PEER_INITIALIZATION,
        mandatory: HANDSHAKE_TLVS,
        supported: &[tlv::HEARTBEAT_INTERVAL, tlv::EXTENSIONS_SUPPORTED, tlv::PEER_TYPE],
    },
    SignalSpec {
        signal: signal::PEER_INITIALIZATION_ACK,
        mandatory: HANDSHAKE_TLVS,
        supported: &[tlv::HEARTBEAT_INTERVAL, tlv::EXTENSIONS_SUPPORTED, tlv::PEER_TYPE],
    },
    SignalSpec {
        signal: signal::PEER_UPDATE,
        mandatory: &[],
        supported: &[tlv::HEARTBEAT_INTERVAL, tlv::PEER_TYPE],
    },
    SignalSpec {
        signal: signal::PEER_UPDATE_ACK,
        mandatory: &[],
        supported: STATUS_TLV,
    },
    SignalSpec {
        signal: signal::PEER_TERMINATION,
        mandatory: STATUS_TLV,
        supported: STATUS_TLV,
    },
    SignalSpec {
        signal: signal::PEER_TERMINATION_ACK,
        mandatory: &[],
        supported: STATUS_TLV,
    },
    SignalSpec {
        signal: signal::HEARTBEAT,
        mandatory: &[],
        supported: &[],
    },
    SignalSpec {
        signal: signal::DESTINATION_UP,
        mandatory: DESTINATION_TLVS,
        supported: DESTINATION_TLVS,
    },
    SignalSpec {
        signal: signal::DESTINATION_UP_ACK,
        mandatory: DESTINATION_TLVS,
        supported: &[tlv::MAC_ADDRESS, tlv::STATUS],
    },
    SignalSpec {
        signal: signal::DESTINATION_DOWN,
        mandatory: DESTINATION_TLVS,
        supported: DESTINATION_TLVS,
    },
    SignalSpec {
        signal: signal::DESTINATION_DOWN_ACK,
        mandatory: DESTINATION_TLVS,
        supported: &[tlv::MAC_ADDRESS, tlv::STATUS],
    },
    SignalSpec {
        signal: signal::DESTINATION_UPDATE,
        mandatory: DESTINATION_TLVS,
        supported: DESTINATION_TLVS,
    },
    SignalSpec {
        signal: signal::LINK_CHARACTERISTICS_REQUEST,
        mandatory: DESTINATION_TLVS,
        supported: DESTINATION_TLVS,
    },
    SignalSpec {
        signal: signal::LINK_CHARACTERISTICS_ACK,
        mandatory: DESTINATION_TLVS,
        supported: &[tlv::MAC_ADDRESS, tlv::LINK_CHAR_ACK_TIMER],
    },
];

#[derive(Debug)]
pub struct BaseProto;

impl Extension for BaseProto {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::BASE_PROTO
    }

    fn name(&self) -> &'static str {
        "base-proto"
    }

    fn tlvs(&self) -> &'static [TlvId] {
        &[
            tlv::STATUS,
            tlv::PEER_TYPE,
            tlv::HEARTBEAT_INTERVAL,
            tlv::EXTENSIONS_SUPPORTED,
            tlv::MAC_ADDRESS,
        ]
    }

    fn signals(&self) -> &'static [SignalSpec] {
        SIGNALS
    }

    fn add_tlvs(&self, session: &mut Session, wire_signal: SignalId, neigh: Option<&NeighborKey>) {
        if wire_signal == signal::PEER_INITIALIZATION || wire_signal == signal::PEER_INITIALIZATION_ACK {
            let secs = session.cfg().heartbeat_interval.as_secs().min(65535) as u16;
            session.writer_mut().add_u16(tlv::HEARTBEAT_INTERVAL, secs);
            if let Some(pt) = session.peer_type.clone() {
                session.writer_mut().add_str(tlv::PEER_TYPE, &pt);
            }
            let ids: alloc::vec::Vec<u16> = session.local_ids().iter().map(|id| *id as u16).collect();
            session.writer_mut().add_extensions(tlv::EXTENSIONS_SUPPORTED, &ids);
        } else if wire_signal == signal::PEER_TERMINATION {
            let (code, reason) = session
                .pending_status()
                .unwrap_or((StatusCode::Okay, String::new()));
            session.writer_mut().add_status(tlv::STATUS, code, &reason);
        } else if wire_signal == signal::PEER_TERMINATION_ACK
            || wire_signal == signal::DESTINATION_UP_ACK
            || wire_signal == signal::DESTINATION_DOWN_ACK
        {
            session.writer_mut().add_status(tlv::STATUS, StatusCode::Okay, "");
        }

        if let Some(key) = neigh {
            session.writer_mut().add_mac(tlv::MAC_ADDRESS, mac_bytes(&key.mac));
        }
    }

    fn process(
        &self,
        _session: &mut Session,
        parsed: &ParsedSignal,
        _neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError> {
        if let Some(status) = parsed.first_value_of(tlv::STATUS) {
            let (code, reason) = dlep_proto::codec::read_status(status.value())?;
            if !code.is_success() {
                log::warn!(
                    "{} replied with non-success status {code:?}: {reason}",
                    signal::name(parsed.signal_id)
                );
            }
        }
        Ok(())
    }
}

/// A MAC stored in our 8-byte `NeighborKey` slot is either a real 6-byte
/// 802 MAC zero-padded to 8, or a genuine 8-byte EUI-64; trailing zero
/// bytes disambiguate the former on the wire (§3 "Local neighbor").
fn mac_bytes(mac: &[u8; 8]) -> &[u8] {
    if mac[6] == 0 && mac[7] == 0 {
        &mac[..6]
    } else {
        &mac[..]
    }
}

pub static INSTANCE: BaseProto = BaseProto;
