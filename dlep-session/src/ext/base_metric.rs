//! Base Metric extension (§4.6): the nine mandatory-on-first-contact
//! performance metrics DLEP carries per destination.

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::l2db::{ensure_default, Field, L2Value};
use crate::neighbor::NeighborKey;
use crate::session::{self, Session};

const ALL: &[TlvId] = &[
    tlv::MDRR,
    tlv::MDRT,
    tlv::CDRR,
    tlv::CDRT,
    tlv::LATENCY,
    tlv::RESR,
    tlv::REST,
    tlv::RLQR,
    tlv::RLQT,
];

const SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        signal: signal::DESTINATION_UP,
        mandatory: ALL,
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

/// The always-installed base metric extension singleton (§4.3's `BASE`).
#[derive(Debug)]
pub struct BaseMetric;

impl Extension for BaseMetric {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::BASE_METRIC
    }

    fn name(&self) -> &'static str {
        "base-metric"
    }

    fn tlvs(&self) -> &'static [TlvId] {
        ALL
    }

    fn signals(&self) -> &'static [SignalSpec] {
        SIGNALS
    }

    fn add_tlvs(&self, session: &mut Session, signal: SignalId, neigh: Option<&NeighborKey>) {
        let Some(key) = neigh else { return };
        let Some(row) = session::neighbor_row(session, key) else {
            return;
        };

        let force_defaults = signal == dlep_proto::ids::signal::DESTINATION_UP;
        let origin = session.origin();
        let l2db = session.l2db();

        let mut get = |field: Field| -> Option<L2Value> {
            if force_defaults {
                Some(ensure_default(&mut *l2db.borrow_mut(), row, field, origin, L2Value::U64(0)))
            } else {
                l2db.borrow().data_get(row, field)
            }
        };

        if let Some(v) = get(Field::Mdrr) {
            session.writer_mut().add_u64(tlv::MDRR, v.as_u64().unwrap_or(0));
        }
        if let Some(v) = get(Field::Mdrt) {
            session.writer_mut().add_u64(tlv::MDRT, v.as_u64().unwrap_or(0));
        }
        if let Some(v) = get(Field::Cdrr) {
            session.writer_mut().add_u64(tlv::CDRR, v.as_u64().unwrap_or(0));
        }
        if let Some(v) = get(Field::Cdrt) {
            session.writer_mut().add_u64(tlv::CDRT, v.as_u64().unwrap_or(0));
        }
        if let Some(v) = get(Field::Latency) {
            session.writer_mut().add_u32(tlv::LATENCY, v.as_u64().unwrap_or(0) as u32);
        }
        if let Some(v) = get(Field::Resr) {
            session.writer_mut().add_u8(tlv::RESR, v.as_u64().unwrap_or(0) as u8);
        }
        if let Some(v) = get(Field::Rest) {
            session.writer_mut().add_u8(tlv::REST, v.as_u64().unwrap_or(0) as u8);
        }
        if let Some(v) = get(Field::Rlqr) {
            session.writer_mut().add_u8(tlv::RLQR, v.as_u64().unwrap_or(0) as u8);
        }
        if let Some(v) = get(Field::Rlqt) {
            session.writer_mut().add_u8(tlv::RLQT, v.as_u64().unwrap_or(0) as u8);
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

        if let Some(v) = parsed.first_value_of(tlv::MDRR) {
            db.data_set(row, Field::Mdrr, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::MDRT) {
            db.data_set(row, Field::Mdrt, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::CDRR) {
            db.data_set(row, Field::Cdrr, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::CDRT) {
            db.data_set(row, Field::Cdrt, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::LATENCY) {
            db.data_set(row, Field::Latency, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::RESR) {
            db.data_set(row, Field::Resr, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::REST) {
            db.data_set(row, Field::Rest, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::RLQR) {
            db.data_set(row, Field::Rlqr, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::RLQT) {
            db.data_set(row, Field::Rlqt, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }

        Ok(())
    }
}

pub static INSTANCE: BaseMetric = BaseMetric;
