//! Byte-level encode/decode primitives.
//!
//! Mirrors the split the reference implementation uses (`dlep_reader.c` /
//! `dlep_writer.c`): a `Writer` that assembles one outgoing signal into a
//! growable buffer and patches the length prefix on `finish_signal`, and a
//! handful of free `read_*` functions that turn a raw TLV value slice into
//! a typed scalar. Byte order is network (big-endian) throughout.

use core::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::{Error, StatusCode};
use crate::ids::{SignalId, TlvId};

/// Assembles one outgoing signal's bytes.
///
/// Call `start_signal`, then any number of `add_tlv`/typed helpers, then
/// `finish_signal` to patch the 16-bit length prefix and get the framed
/// bytes back. A `Writer` can be reused for the next signal by calling
/// `start_signal` again; this mirrors §5's requirement that parser/writer
/// memory is reused across signals on the same session rather than
/// reallocated per signal.
#[derive(Debug, Default)]
pub struct Writer {
    buf: crate::compat::Vec<u8>,
    header_at: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buf: crate::compat::Vec::new(),
            header_at: 0,
        }
    }

    /// Starts a new signal, clearing any previous contents.
    pub fn start_signal(&mut self, id: SignalId) {
        self.buf.clear();
        self.header_at = 0;
        self.buf.extend_from_slice(&id.to_be_bytes());
        self.buf.extend_from_slice(&0u16.to_be_bytes()); // length placeholder
    }

    /// Appends a TLV with an already-encoded value.
    pub fn add_tlv(&mut self, id: TlvId, value: &[u8]) {
        self.buf.extend_from_slice(&id.to_be_bytes());
        self.buf
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(value);
    }

    pub fn add_u8(&mut self, id: TlvId, v: u8) {
        self.add_tlv(id, &[v]);
    }

    pub fn add_u16(&mut self, id: TlvId, v: u16) {
        self.add_tlv(id, &v.to_be_bytes());
    }

    pub fn add_u32(&mut self, id: TlvId, v: u32) {
        self.add_tlv(id, &v.to_be_bytes());
    }

    pub fn add_u64(&mut self, id: TlvId, v: u64) {
        self.add_tlv(id, &v.to_be_bytes());
    }

    pub fn add_i32(&mut self, id: TlvId, v: i32) {
        self.add_tlv(id, &v.to_be_bytes());
    }

    pub fn add_str(&mut self, id: TlvId, s: &str) {
        self.add_tlv(id, s.as_bytes());
    }

    /// Appends a MAC-address-shaped TLV (6 or 8 bytes, per §3's catalog).
    pub fn add_mac(&mut self, id: TlvId, mac: &[u8]) {
        debug_assert!(mac.len() == 6 || mac.len() == 8);
        self.add_tlv(id, mac);
    }

    pub fn add_ipv4(&mut self, id: TlvId, addr: Ipv4Addr) {
        self.add_tlv(id, &addr.octets());
    }

    pub fn add_ipv6(&mut self, id: TlvId, addr: Ipv6Addr) {
        self.add_tlv(id, &addr.octets());
    }

    /// Add/remove-tagged IPv4 address or subnet TLV.
    pub fn add_ipv4_change(&mut self, id: TlvId, add: bool, addr: Ipv4Addr, prefix: Option<u8>) {
        let mut value = [0u8; 6];
        value[0] = add as u8;
        value[1..5].copy_from_slice(&addr.octets());
        let mut len = 5;
        if let Some(p) = prefix {
            value[5] = p;
            len = 6;
        }
        self.add_tlv(id, &value[..len]);
    }

    /// Add/remove-tagged IPv6 address or subnet TLV.
    pub fn add_ipv6_change(&mut self, id: TlvId, add: bool, addr: Ipv6Addr, prefix: Option<u8>) {
        let mut value = [0u8; 18];
        value[0] = add as u8;
        value[1..17].copy_from_slice(&addr.octets());
        let mut len = 17;
        if let Some(p) = prefix {
            value[17] = p;
            len = 18;
        }
        self.add_tlv(id, &value[..len]);
    }

    /// Appends an IPv4 or IPv6 connection-point TLV (address + optional port).
    pub fn add_conpoint(&mut self, id: TlvId, addr: SocketAddr) {
        match addr {
            SocketAddr::V4(a) => {
                let mut value = [0u8; 6];
                value[..4].copy_from_slice(&a.ip().octets());
                value[4..].copy_from_slice(&a.port().to_be_bytes());
                self.add_tlv(id, &value);
            }
            SocketAddr::V6(a) => {
                let mut value = [0u8; 18];
                value[..16].copy_from_slice(&a.ip().octets());
                value[16..].copy_from_slice(&a.port().to_be_bytes());
                self.add_tlv(id, &value);
            }
        }
    }

    pub fn add_status(&mut self, id: TlvId, status: StatusCode, reason: &str) {
        let mut value = crate::compat::Vec::with_capacity(1 + reason.len());
        value.push(status.wire());
        value.extend_from_slice(reason.as_bytes());
        self.add_tlv(id, &value);
    }

    pub fn add_lid(&mut self, id: TlvId, key: &[u8]) {
        self.add_tlv(id, key);
    }

    pub fn add_extensions(&mut self, id: TlvId, ids: &[u16]) {
        let mut value = crate::compat::Vec::with_capacity(ids.len() * 2);
        for i in ids {
            value.extend_from_slice(&i.to_be_bytes());
        }
        self.add_tlv(id, &value);
    }

    /// Patches the length prefix and returns the framed signal bytes.
    pub fn finish_signal(&mut self) -> &[u8] {
        let body_len = (self.buf.len() - 4) as u16;
        self.buf[2..4].copy_from_slice(&body_len.to_be_bytes());
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= 4
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.header_at = 0;
    }
}

/// A read cursor over a borrowed byte slice. Used both by the signal framer
/// and by scalar decoders below; never allocates or copies beyond the
/// fixed-size arrays scalars are extracted into.
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == self.data.len()
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.arr::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes(self.arr::<2>()?))
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.arr::<4>()?))
    }

    pub fn u64(&mut self) -> Result<u64, Error> {
        Ok(u64::from_be_bytes(self.arr::<8>()?))
    }

    pub fn arr<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let slice = self.slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.len() {
            return Err(Error::IncompleteTlv);
        }
        let s = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(s)
    }

    pub fn remaining(&mut self) -> &'a [u8] {
        let s = &self.data[self.offset..];
        self.offset = self.data.len();
        s
    }
}

/// Sign-extends a 1/2/4/8-byte big-endian field into an i64 slot, per §4.6's
/// numeric conversion rules (TLV length determines signedness handling for
/// the caller; this function does the raw sign-extension once the caller
/// has decided the field is signed).
pub fn read_signed(bytes: &[u8]) -> Result<i64, Error> {
    Ok(match bytes.len() {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_be_bytes(bytes.try_into().unwrap()) as i64,
        4 => i32::from_be_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_be_bytes(bytes.try_into().unwrap()),
        _ => return Err(Error::InternalError),
    })
}

/// Zero-extends a 1/2/4/8-byte big-endian field into a u64 slot.
pub fn read_unsigned(bytes: &[u8]) -> Result<u64, Error> {
    Ok(match bytes.len() {
        1 => bytes[0] as u64,
        2 => u16::from_be_bytes(bytes.try_into().unwrap()) as u64,
        4 => u32::from_be_bytes(bytes.try_into().unwrap()) as u64,
        8 => u64::from_be_bytes(bytes.try_into().unwrap()),
        _ => return Err(Error::InternalError),
    })
}

pub fn read_mac(bytes: &[u8]) -> Result<[u8; 8], Error> {
    match bytes.len() {
        6 => {
            let mut mac = [0u8; 8];
            mac[..6].copy_from_slice(bytes);
            Ok(mac)
        }
        8 => {
            let mut mac = [0u8; 8];
            mac.copy_from_slice(bytes);
            Ok(mac)
        }
        _ => Err(Error::IllegalTlvLength(crate::ids::tlv::MAC_ADDRESS)),
    }
}

pub fn read_ipv4(bytes: &[u8]) -> Result<Ipv4Addr, Error> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| Error::IllegalTlvLength(crate::ids::tlv::IPV4_ADDRESS))?;
    Ok(Ipv4Addr::from(arr))
}

pub fn read_ipv6(bytes: &[u8]) -> Result<Ipv6Addr, Error> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| Error::IllegalTlvLength(crate::ids::tlv::IPV6_ADDRESS))?;
    Ok(Ipv6Addr::from(arr))
}

/// Reads an add/remove-tagged IPv4 address or subnet TLV value.
/// `value[0]` is the add/remove flag, `value[1..5]` is the address, and an
/// optional trailing byte is the prefix length.
pub fn read_ipv4_change(value: &[u8]) -> Result<(bool, Ipv4Addr, Option<u8>), Error> {
    if value.len() != 5 && value.len() != 6 {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::IPV4_ADDRESS));
    }
    let add = value[0] != 0;
    let addr = read_ipv4(&value[1..5])?;
    let prefix = if value.len() == 6 { Some(value[5]) } else { None };
    Ok((add, addr, prefix))
}

/// Reads an add/remove-tagged IPv6 address or subnet TLV value.
pub fn read_ipv6_change(value: &[u8]) -> Result<(bool, Ipv6Addr, Option<u8>), Error> {
    if value.len() != 17 && value.len() != 18 {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::IPV6_ADDRESS));
    }
    let add = value[0] != 0;
    let addr = read_ipv6(&value[1..17])?;
    let prefix = if value.len() == 18 { Some(value[17]) } else { None };
    Ok((add, addr, prefix))
}

pub fn read_conpoint_v4(value: &[u8]) -> Result<(Ipv4Addr, Option<u16>), Error> {
    if value.len() != 4 && value.len() != 6 {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::IPV4_CONPOINT));
    }
    let addr = read_ipv4(&value[..4])?;
    let port = if value.len() == 6 {
        Some(u16::from_be_bytes([value[4], value[5]]))
    } else {
        None
    };
    Ok((addr, port))
}

pub fn read_conpoint_v6(value: &[u8]) -> Result<(Ipv6Addr, Option<u16>), Error> {
    if value.len() != 16 && value.len() != 18 {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::IPV6_CONPOINT));
    }
    let addr = read_ipv6(&value[..16])?;
    let port = if value.len() == 18 {
        Some(u16::from_be_bytes([value[16], value[17]]))
    } else {
        None
    };
    Ok((addr, port))
}

pub fn read_status(value: &[u8]) -> Result<(StatusCode, &str), Error> {
    if value.is_empty() {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::STATUS));
    }
    let code = StatusCode::from_wire(value[0]).ok_or(Error::IllegalTlvLength(crate::ids::tlv::STATUS))?;
    let reason = core::str::from_utf8(&value[1..]).map_err(|_| Error::IllegalTlvLength(crate::ids::tlv::STATUS))?;
    Ok((code, reason))
}

pub fn read_extensions(value: &[u8]) -> Result<crate::compat::Vec<u16>, Error> {
    if value.len() % 2 != 0 {
        return Err(Error::IllegalTlvLength(crate::ids::tlv::EXTENSIONS_SUPPORTED));
    }
    let mut out = crate::compat::Vec::with_capacity(value.len() / 2);
    let mut cursor = Reader::new(value);
    while !cursor.is_empty() {
        out.push(cursor.u16()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_finishes_with_correct_length() {
        let mut w = Writer::new();
        w.start_signal(crate::ids::signal::HEARTBEAT);
        w.add_u16(crate::ids::tlv::HEARTBEAT_INTERVAL, 1000);
        let framed = w.finish_signal();
        assert_eq!(&framed[0..2], &14u16.to_be_bytes());
        let len = u16::from_be_bytes([framed[2], framed[3]]);
        assert_eq!(len as usize, framed.len() - 4);
        assert_eq!(len, 4);
    }

    #[test]
    fn signed_sign_extension() {
        assert_eq!(read_signed(&[0xff]).unwrap(), -1);
        assert_eq!(read_signed(&[0xff, 0xff]).unwrap(), -1);
        assert_eq!(read_unsigned(&[0xff]).unwrap(), 255);
    }

    #[test]
    fn ipv4_change_round_trips() {
        let mut w = Writer::new();
        w.start_signal(crate::ids::signal::PEER_UPDATE);
        w.add_ipv4_change(
            crate::ids::tlv::IPV4_ADDRESS,
            true,
            Ipv4Addr::new(192, 0, 2, 5),
            None,
        );
        let framed = w.finish_signal().to_vec();
        let value = &framed[8..];
        let (add, addr, prefix) = read_ipv4_change(value).unwrap();
        assert!(add);
        assert_eq!(addr, Ipv4Addr::new(192, 0, 2, 5));
        assert_eq!(prefix, None);
    }
}
