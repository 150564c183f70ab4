//! L2 (link-layer) Statistics extension (§4.6 supplement): frame and byte
//! counters. All fields are optional.

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::l2db::{Field, L2Value};
use crate::neighbor::NeighborKey;
use crate::session::{self, Session};

const ALL: &[TlvId] = &[
    tlv::FRAMES_R,
    tlv::FRAMES_T,
    tlv::BYTES_R,
    tlv::BYTES_T,
    tlv::THROUGHPUT_T,
    tlv::FRAMES_RETRIES,
    tlv::FRAMES_FAILED,
];

const SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        signal: signal::DESTINATION_UP,
        mandatory: &[],
        supported: ALL,
    },
    SignalSpec {
        signal: signal::DESTINATION_UPDATE,
        mandatory: &[],
        supported: ALL,
    },
    SignalSpec {
        signal: signal::LINK_CHARACTERISTICS_ACK,
        mandatory: &[],
        supported: ALL,
    },
];

#[derive(Debug)]
pub struct L2Stats;

const FIELDS: &[(TlvId, Field)] = &[
    (tlv::FRAMES_R, Field::FramesR),
    (tlv::FRAMES_T, Field::FramesT),
    (tlv::BYTES_R, Field::BytesR),
    (tlv::BYTES_T, Field::BytesT),
    (tlv::THROUGHPUT_T, Field::ThroughputT),
    (tlv::FRAMES_RETRIES, Field::FramesRetries),
    (tlv::FRAMES_FAILED, Field::FramesFailed),
];

impl Extension for L2Stats {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::L2_STATS
    }

    fn name(&self) -> &'static str {
        "l2-stats"
    }

    fn tlvs(&self) -> &'static [TlvId] {
        ALL
    }

    fn signals(&self) -> &'static [SignalSpec] {
        SIGNALS
    }

    fn add_tlvs(&self, session: &mut Session, _signal: SignalId, neigh: Option<&NeighborKey>) {
        let Some(key) = neigh else { return };
        let Some(row) = session::neighbor_row(session, key) else {
            return;
        };
        let l2db = session.l2db();
        let db = l2db.borrow();

        for (id, field) in FIELDS {
            if let Some(v) = db.data_get(row, *field) {
                session.writer_mut().add_u64(*id, v.as_u64().unwrap_or(0));
            }
        }
    }

    fn process(
        &self,
        session: &mut Session,
        parsed: &ParsedSignal,
        neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError> {
        let Some(key) = neigh else { return Ok(()) };
        let Some(row) = session::neighbor_row(session, key) else {
            return Ok(());
        };
        let origin = session.origin();
        let l2db = session.l2db();
        let mut db = l2db.borrow_mut();

        for (id, field) in FIELDS {
            if let Some(v) = parsed.first_value_of(*id) {
                db.data_set(row, *field, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
            }
        }

        Ok(())
    }
}

pub static INSTANCE: L2Stats = L2Stats;
