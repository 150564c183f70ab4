//! Link-ID extension (§4.7): extends a destination's identity with an
//! opaque, session-chosen token so colliding MACs across sessions on one
//! interface don't alias to the same neighbor.

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::neighbor::NeighborKey;
use crate::session::Session;

const ALL: &[TlvId] = &[tlv::LINK_ID];

const SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        signal: signal::DESTINATION_UP,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::DESTINATION_UP_ACK,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::DESTINATION_DOWN,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::DESTINATION_DOWN_ACK,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::DESTINATION_UPDATE,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::LINK_CHARACTERISTICS_REQUEST,
        mandatory: ALL,
        supported: ALL,
    },
    SignalSpec {
        signal: signal::LINK_CHARACTERISTICS_ACK,
        mandatory: ALL,
        supported: ALL,
    },
];

#[derive(Debug)]
pub struct LinkId;

impl Extension for LinkId {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::LINK_ID
    }

    fn name(&self) -> &'static str {
        "link-id"
    }

    fn tlvs(&self) -> &'static [TlvId] {
        ALL
    }

    fn signals(&self) -> &'static [SignalSpec] {
        SIGNALS
    }

    fn add_tlvs(&self, session: &mut Session, _signal: SignalId, neigh: Option<&NeighborKey>) {
        let Some(key) = neigh else { return };
        if let Some(link_id) = &key.link_id {
            session.writer_mut().add_lid(tlv::LINK_ID, link_id);
        }
    }

    // The Link-ID's value doesn't feed the L2DB; it is already consumed by
    // `Session::extract_neighbor_key` to build `neigh` before dispatch, so
    // there is nothing left for this extension to do on the inbound path.
    fn process(
        &self,
        _session: &mut Session,
        _signal: &ParsedSignal,
        _neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError> {
        Ok(())
    }
}

pub static INSTANCE: LinkId = LinkId;
