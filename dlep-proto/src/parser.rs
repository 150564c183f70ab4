//! Per-signal parser state: TLV registry, parsed value chains and the
//! `parse` entry point (§4.1 steps 1-6, §4.2).
//!
//! The registry only carries wire-level length bounds; the signal-specific
//! mandatory/duplicate-allowed sets live with the extension that declares
//! them (`dlep-session`) and are passed in by the caller on each parse, so
//! this crate stays ignorant of the signal catalog's semantics.

use crate::codec::Reader;
use crate::error::Error;
use crate::ids::{SignalId, TlvId};
use crate::tlv::TlvBounds;

/// A session's current allowed-TLV map, rebuilt whenever the active
/// extension set changes (§4.2). Backed by a flat `Vec` rather than a hash
/// map: sessions carry on the order of a few dozen TLV ids at most, so
/// linear lookup is both simpler and cache-friendlier than hashing.
#[derive(Clone, Debug, Default)]
pub struct TlvRegistry {
    entries: crate::compat::Vec<(TlvId, TlvBounds)>,
}

impl TlvRegistry {
    pub fn new() -> Self {
        Self {
            entries: crate::compat::Vec::new(),
        }
    }

    /// Registers `id`'s bounds. Returns `Err(id)` if `id` is already
    /// registered with a different, conflicting set of bounds (§3 I2: two
    /// extensions declaring the same TLV id with conflicting length bounds
    /// fails session initialization).
    pub fn insert(&mut self, id: TlvId, bounds: TlvBounds) -> Result<(), TlvId> {
        if let Some((_, existing)) = self.entries.iter().find(|(existing_id, _)| *existing_id == id) {
            if *existing != bounds {
                return Err(id);
            }
            return Ok(());
        }
        self.entries.push((id, bounds));
        Ok(())
    }

    pub fn get(&self, id: TlvId) -> Option<TlvBounds> {
        self.entries
            .iter()
            .find(|(existing_id, _)| *existing_id == id)
            .map(|(_, bounds)| *bounds)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One TLV occurrence within a parsed signal: its id, the byte range of its
/// value within the original buffer, and a link to the next occurrence of
/// the same TLV id in arrival order (the "linked list in a flat array" the
/// design notes call for).
#[derive(Clone, Copy, Debug)]
pub struct ParsedTlv {
    pub id: TlvId,
    offset: usize,
    length: usize,
    next: Option<usize>,
}

/// The result of walking one signal's TLVs. Holds the flat value array and
/// a small head/tail index per distinct TLV id seen, so a caller can either
/// iterate every TLV in arrival order (`iter()`) or every occurrence of one
/// id (`values_of(id)`) without ever touching `values`/`heads` directly.
pub struct ParsedSignal<'a> {
    pub signal_id: SignalId,
    buf: &'a [u8],
    values: crate::compat::Vec<ParsedTlv>,
    heads: crate::compat::Vec<(TlvId, usize, usize)>,
}

impl<'a> ParsedSignal<'a> {
    /// The first occurrence of `id`, if any.
    pub fn first_value_of(&self, id: TlvId) -> Option<TlvOccurrence<'a, '_>> {
        let head = self.heads.iter().find(|(existing, _, _)| *existing == id)?.1;
        Some(TlvOccurrence {
            signal: self,
            index: head,
        })
    }

    pub fn contains(&self, id: TlvId) -> bool {
        self.heads.iter().any(|(existing, _, _)| *existing == id)
    }

    pub fn count_of(&self, id: TlvId) -> usize {
        self.values_of(id).count()
    }

    /// Iterates every occurrence of `id` in arrival order.
    pub fn values_of(&self, id: TlvId) -> TlvValues<'a, '_> {
        TlvValues {
            next: self.first_value_of(id),
        }
    }

    /// Iterates every TLV in the signal in arrival order, regardless of id.
    pub fn iter(&self) -> impl Iterator<Item = TlvOccurrence<'a, '_>> + '_ {
        (0..self.values.len()).map(move |index| TlvOccurrence {
            signal: self,
            index,
        })
    }

    pub fn tlv_count(&self) -> usize {
        self.values.len()
    }
}

/// A single, positioned TLV occurrence borrowed from a `ParsedSignal`.
#[derive(Clone, Copy)]
pub struct TlvOccurrence<'a, 's> {
    signal: &'s ParsedSignal<'a>,
    index: usize,
}

impl<'a, 's> TlvOccurrence<'a, 's> {
    pub fn id(&self) -> TlvId {
        self.signal.values[self.index].id
    }

    pub fn value(&self) -> &'a [u8] {
        let v = &self.signal.values[self.index];
        &self.signal.buf[v.offset..v.offset + v.length]
    }

    fn next(&self) -> Option<TlvOccurrence<'a, 's>> {
        self.signal.values[self.index].next.map(|index| TlvOccurrence {
            signal: self.signal,
            index,
        })
    }
}

/// Iterator over every occurrence of one TLV id, in arrival order.
pub struct TlvValues<'a, 's> {
    next: Option<TlvOccurrence<'a, 's>>,
}

impl<'a, 's> Iterator for TlvValues<'a, 's> {
    type Item = TlvOccurrence<'a, 's>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.next();
        Some(current)
    }
}

/// Parses exactly one signal from the front of `buf`.
///
/// `registry` supplies length bounds for TLVs this session currently
/// accepts; `mandatory` lists the TLV ids the caller's signal-specific
/// extension tables require to be present at least once (§4.3/§4.5-4.8
/// own that knowledge, not this crate). Returns the parsed signal and the
/// number of bytes consumed from `buf`, so the caller can advance past it
/// and parse the next signal in the same read.
pub fn parse<'a>(
    buf: &'a [u8],
    registry: &TlvRegistry,
    mandatory: &[TlvId],
) -> Result<(ParsedSignal<'a>, usize), Error> {
    if buf.len() < 4 {
        return Err(Error::IncompleteHeader);
    }
    let signal_id = u16::from_be_bytes([buf[0], buf[1]]);
    let body_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < 4 + body_len {
        return Err(Error::IncompleteSignal);
    }
    let body = &buf[4..4 + body_len];

    let mut values = crate::compat::Vec::new();
    let mut heads: crate::compat::Vec<(TlvId, usize, usize)> = crate::compat::Vec::new();
    let mut reader = Reader::new(body);

    while !reader.is_empty() {
        if reader.len() < 4 {
            return Err(Error::IncompleteTlvHeader);
        }
        let id = reader.u16()?;
        let len = reader.u16()? as usize;
        if reader.len() < len {
            return Err(Error::IncompleteTlv);
        }
        let offset = body.len() - reader.len();
        let value = reader.slice(len)?;
        let _ = value;

        if let Some(bounds) = registry.get(id) {
            if !bounds.accepts(len as u16) {
                return Err(Error::IllegalTlvLength(id));
            }
            if !bounds.repeatable && heads.iter().any(|(existing, _, _)| *existing == id) {
                return Err(Error::DuplicateTlv(id));
            }
        }

        let index = values.len();
        values.push(ParsedTlv {
            id,
            offset,
            length: len,
            next: None,
        });

        match heads.iter_mut().find(|(existing, _, _)| *existing == id) {
            Some((_, _head, tail)) => {
                values[*tail].next = Some(index);
                *tail = index;
            }
            None => heads.push((id, index, index)),
        }
    }

    // I1's final check: every TLV id present must be one this session
    // recognizes (registered in the allowed map); anything else is
    // `UnsupportedTlv`, reported for the first offending occurrence found.
    for (id, _, _) in &heads {
        if registry.get(*id).is_none() {
            return Err(Error::UnsupportedTlv(*id));
        }
    }

    for id in mandatory {
        if !heads.iter().any(|(existing, _, _)| existing == id) {
            return Err(Error::MissingMandatoryTlv(*id));
        }
    }

    Ok((
        ParsedSignal {
            signal_id,
            buf,
            values,
            heads,
        },
        4 + body_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Writer;
    use crate::ids::{signal, tlv};

    fn registry_for_heartbeat() -> TlvRegistry {
        let mut r = TlvRegistry::new();
        r.insert(tlv::HEARTBEAT_INTERVAL, crate::tlv::bounds_for(tlv::HEARTBEAT_INTERVAL).unwrap())
            .unwrap();
        r
    }

    #[test]
    fn parses_single_tlv_signal() {
        let mut w = Writer::new();
        w.start_signal(signal::HEARTBEAT);
        w.add_u16(tlv::HEARTBEAT_INTERVAL, 2);
        let framed = w.finish_signal().to_vec();

        let registry = registry_for_heartbeat();
        let (parsed, consumed) = parse(&framed, &registry, &[tlv::HEARTBEAT_INTERVAL]).unwrap();
        assert_eq!(consumed, framed.len());
        assert_eq!(parsed.signal_id, signal::HEARTBEAT);
        let v = parsed.first_value_of(tlv::HEARTBEAT_INTERVAL).unwrap();
        assert_eq!(v.value(), &[0, 2]);
    }

    #[test]
    fn missing_mandatory_tlv_is_rejected() {
        let mut w = Writer::new();
        w.start_signal(signal::PEER_INITIALIZATION);
        let framed = w.finish_signal().to_vec();

        let registry = registry_for_heartbeat();
        let err = parse(&framed, &registry, &[tlv::HEARTBEAT_INTERVAL]).unwrap_err();
        assert_eq!(err, Error::MissingMandatoryTlv(tlv::HEARTBEAT_INTERVAL));
    }

    #[test]
    fn duplicate_non_repeatable_tlv_is_rejected() {
        let mut w = Writer::new();
        w.start_signal(signal::HEARTBEAT);
        w.add_u16(tlv::HEARTBEAT_INTERVAL, 2);
        w.add_u16(tlv::HEARTBEAT_INTERVAL, 3);
        let framed = w.finish_signal().to_vec();

        let registry = registry_for_heartbeat();
        let err = parse(&framed, &registry, &[]).unwrap_err();
        assert_eq!(err, Error::DuplicateTlv(tlv::HEARTBEAT_INTERVAL));
    }

    #[test]
    fn repeatable_tlv_yields_values_in_arrival_order() {
        let mut w = Writer::new();
        w.start_signal(signal::PEER_UPDATE);
        w.add_ipv4_change(tlv::IPV4_ADDRESS, true, core::net::Ipv4Addr::new(192, 0, 2, 1), None);
        w.add_ipv4_change(tlv::IPV4_ADDRESS, false, core::net::Ipv4Addr::new(192, 0, 2, 2), None);
        let framed = w.finish_signal().to_vec();

        let mut registry = TlvRegistry::new();
        registry
            .insert(tlv::IPV4_ADDRESS, crate::tlv::bounds_for(tlv::IPV4_ADDRESS).unwrap())
            .unwrap();

        let (parsed, _) = parse(&framed, &registry, &[]).unwrap();
        let values: crate::compat::Vec<_> = parsed.values_of(tlv::IPV4_ADDRESS).map(|o| o.value().to_vec()).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][0], 1); // add
        assert_eq!(values[1][0], 0); // remove
    }

    #[test]
    fn unsupported_tlv_is_rejected() {
        let mut w = Writer::new();
        w.start_signal(signal::HEARTBEAT);
        w.add_u16(999, 7);
        let framed = w.finish_signal().to_vec();

        let registry = TlvRegistry::new();
        let err = parse(&framed, &registry, &[]).unwrap_err();
        assert_eq!(err, Error::UnsupportedTlv(999));
    }

    #[test]
    fn incomplete_header_is_recoverable() {
        let err = parse(&[0, 14], &TlvRegistry::new(), &[]).unwrap_err();
        assert!(err.is_recoverable_on_stream());
    }
}
