//! L1 (radio-layer) Statistics extension (§4.6 supplement): frequency,
//! bandwidth, noise and channel/signal measurements. All fields are
//! optional — a radio reports whichever its hardware exposes.

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::l2db::{Field, L2Value};
use crate::neighbor::NeighborKey;
use crate::session::{self, Session};

const ALL: &[TlvId] = &[
    tlv::FREQUENCY,
    tlv::BANDWIDTH,
    tlv::NOISE_LEVEL,
    tlv::CHANNEL_ACTIVE,
    tlv::CHANNEL_BUSY,
    tlv::CHANNEL_RX,
    tlv::CHANNEL_TX,
    tlv::SIGNAL_RX,
    tlv::SIGNAL_TX,
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
pub struct L1Stats;

impl Extension for L1Stats {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::L1_STATS
    }

    fn name(&self) -> &'static str {
        "l1-stats"
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

        if let Some(v) = db.data_get(row, Field::FreqPrimary) {
            let secondary = db.data_get(row, Field::FreqSecondary).and_then(|v| v.as_u64());
            session.writer_mut().add_tlv(
                tlv::FREQUENCY,
                &encode_one_or_two(v.as_u64().unwrap_or(0), secondary),
            );
        }
        emit_bandwidth(session, &*db, row);
        emit_scalar(session, &*db, row);
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

        if let Some(v) = parsed.first_value_of(tlv::FREQUENCY) {
            let (primary, secondary) = decode_one_or_two(v.value())?;
            db.data_set(row, Field::FreqPrimary, origin, L2Value::U64(primary));
            if let Some(s) = secondary {
                db.data_set(row, Field::FreqSecondary, origin, L2Value::U64(s));
            }
        }
        if let Some(v) = parsed.first_value_of(tlv::BANDWIDTH) {
            let (primary, secondary) = decode_one_or_two(v.value())?;
            db.data_set(row, Field::BandwidthPrimary, origin, L2Value::U64(primary));
            if let Some(s) = secondary {
                db.data_set(row, Field::BandwidthSecondary, origin, L2Value::U64(s));
            }
        }
        if let Some(v) = parsed.first_value_of(tlv::NOISE_LEVEL) {
            db.data_set(row, Field::Noise, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::CHANNEL_ACTIVE) {
            db.data_set(
                row,
                Field::ChannelActive,
                origin,
                L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?),
            );
        }
        if let Some(v) = parsed.first_value_of(tlv::CHANNEL_BUSY) {
            db.data_set(row, Field::ChannelBusy, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::CHANNEL_RX) {
            db.data_set(row, Field::ChannelRx, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::CHANNEL_TX) {
            db.data_set(row, Field::ChannelTx, origin, L2Value::U64(dlep_proto::codec::read_unsigned(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::SIGNAL_RX) {
            db.data_set(row, Field::SignalRx, origin, L2Value::I64(dlep_proto::codec::read_signed(v.value())?));
        }
        if let Some(v) = parsed.first_value_of(tlv::SIGNAL_TX) {
            db.data_set(row, Field::SignalTx, origin, L2Value::I64(dlep_proto::codec::read_signed(v.value())?));
        }

        Ok(())
    }
}

fn emit_bandwidth(session: &mut Session, db: &dyn crate::l2db::L2Db, row: crate::l2db::NeighId) {
    if let Some(v) = db.data_get(row, Field::BandwidthPrimary) {
        let secondary = db.data_get(row, Field::BandwidthSecondary).and_then(|v| v.as_u64());
        session
            .writer_mut()
            .add_tlv(tlv::BANDWIDTH, &encode_one_or_two(v.as_u64().unwrap_or(0), secondary));
    }
}

fn emit_scalar(session: &mut Session, db: &dyn crate::l2db::L2Db, row: crate::l2db::NeighId) {
    if let Some(v) = db.data_get(row, Field::Noise) {
        session.writer_mut().add_u64(tlv::NOISE_LEVEL, v.as_u64().unwrap_or(0));
    }
    if let Some(v) = db.data_get(row, Field::ChannelActive) {
        session.writer_mut().add_u64(tlv::CHANNEL_ACTIVE, v.as_u64().unwrap_or(0));
    }
    if let Some(v) = db.data_get(row, Field::ChannelBusy) {
        session.writer_mut().add_u64(tlv::CHANNEL_BUSY, v.as_u64().unwrap_or(0));
    }
    if let Some(v) = db.data_get(row, Field::ChannelRx) {
        session.writer_mut().add_u64(tlv::CHANNEL_RX, v.as_u64().unwrap_or(0));
    }
    if let Some(v) = db.data_get(row, Field::ChannelTx) {
        session.writer_mut().add_u64(tlv::CHANNEL_TX, v.as_u64().unwrap_or(0));
    }
    if let Some(v) = db.data_get(row, Field::SignalRx) {
        session.writer_mut().add_i32(tlv::SIGNAL_RX, v.as_i64().unwrap_or(0) as i32);
    }
    if let Some(v) = db.data_get(row, Field::SignalTx) {
        session.writer_mut().add_i32(tlv::SIGNAL_TX, v.as_i64().unwrap_or(0) as i32);
    }
}

fn decode_one_or_two(value: &[u8]) -> Result<(u64, Option<u64>), SessionError> {
    match value.len() {
        8 => Ok((u64::from_be_bytes(value.try_into().unwrap()), None)),
        16 => Ok((
            u64::from_be_bytes(value[..8].try_into().unwrap()),
            Some(u64::from_be_bytes(value[8..].try_into().unwrap())),
        )),
        _ => Err(SessionError::Protocol(dlep_proto::Error::IllegalTlvLength(tlv::FREQUENCY))),
    }
}

fn encode_one_or_two(primary: u64, secondary: Option<u64>) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::with_capacity(16);
    out.extend_from_slice(&primary.to_be_bytes());
    if let Some(s) = secondary {
        out.extend_from_slice(&s.to_be_bytes());
    }
    out
}

pub static INSTANCE: L1Stats = L1Stats;
