//! IP extension (§4.8): per-interface and per-neighbor IPv4/IPv6 address and
//! subnet add/remove announcements.

use core::net::IpAddr;

use dlep_proto::ids::{signal, tlv, ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::extension::{Extension, SignalSpec};
use crate::l2db::IpPrefix;
use crate::neighbor::NeighborKey;
use crate::session::{self, Session};

const ALL: &[TlvId] = &[tlv::IPV4_ADDRESS, tlv::IPV6_ADDRESS, tlv::IPV4_SUBNET, tlv::IPV6_SUBNET];

const SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        signal: signal::PEER_UPDATE,
        mandatory: &[],
        supported: ALL,
    },
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
];

#[derive(Debug)]
pub struct Ip;

impl Extension for Ip {
    fn id(&self) -> ExtensionId {
        dlep_proto::ids::extension::IP
    }

    fn name(&self) -> &'static str {
        "ip"
    }

    fn tlvs(&self) -> &'static [TlvId] {
        ALL
    }

    fn signals(&self) -> &'static [SignalSpec] {
        SIGNALS
    }

    fn add_tlvs(&self, session: &mut Session, signal: SignalId, neigh: Option<&NeighborKey>) {
        let changes = match neigh {
            Some(key) => session
                .neighbor_mut(key)
                .map(|n| n.drain_ip_changes())
                .unwrap_or_default(),
            None if signal == dlep_proto::ids::signal::PEER_UPDATE => {
                session.drain_interface_ip_changes()
            }
            None => return,
        };

        for (prefix, add) in changes {
            write_change(session.writer_mut(), prefix, add);
        }
    }

    fn process(
        &self,
        session: &mut Session,
        parsed: &ParsedSignal,
        neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError> {
        let origin = session.origin();
        let net = session.net();
        let l2db = session.l2db();
        let mut db = l2db.borrow_mut();

        let row = match neigh {
            Some(key) => session::neighbor_row(session, key),
            None => None,
        };

        for occ in parsed.iter() {
            let (prefix, add) = match occ.id() {
                tlv::IPV4_ADDRESS => {
                    let (add, addr, _) = dlep_proto::codec::read_ipv4_change(occ.value())?;
                    (IpPrefix::host(IpAddr::V4(addr)), add)
                }
                tlv::IPV6_ADDRESS => {
                    let (add, addr, _) = dlep_proto::codec::read_ipv6_change(occ.value())?;
                    (IpPrefix::host(IpAddr::V6(addr)), add)
                }
                tlv::IPV4_SUBNET => {
                    let (add, addr, prefix) = dlep_proto::codec::read_ipv4_change(occ.value())?;
                    let prefix = prefix.ok_or(dlep_proto::Error::IllegalTlvLength(tlv::IPV4_SUBNET))?;
                    (IpPrefix::subnet(IpAddr::V4(addr), prefix), add)
                }
                tlv::IPV6_SUBNET => {
                    let (add, addr, prefix) = dlep_proto::codec::read_ipv6_change(occ.value())?;
                    let prefix = prefix.ok_or(dlep_proto::Error::IllegalTlvLength(tlv::IPV6_SUBNET))?;
                    (IpPrefix::subnet(IpAddr::V6(addr), prefix), add)
                }
                _ => continue,
            };

            match row {
                Some(row) => {
                    if add {
                        db.neigh_addr_set(row, origin, prefix);
                    } else {
                        db.neigh_addr_clear(row, origin, prefix);
                    }
                }
                None => {
                    if add {
                        db.net_addr_set(net, origin, prefix);
                    } else {
                        db.net_addr_clear(net, origin, prefix);
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_change(writer: &mut dlep_proto::Writer, prefix: IpPrefix, add: bool) {
    match (prefix.addr, prefix.prefix) {
        (IpAddr::V4(addr), None) => writer.add_ipv4_change(tlv::IPV4_ADDRESS, add, addr, None),
        (IpAddr::V4(addr), Some(p)) => writer.add_ipv4_change(tlv::IPV4_SUBNET, add, addr, Some(p)),
        (IpAddr::V6(addr), None) => writer.add_ipv6_change(tlv::IPV6_ADDRESS, add, addr, None),
        (IpAddr::V6(addr), Some(p)) => writer.add_ipv6_change(tlv::IPV6_SUBNET, add, addr, Some(p)),
    }
}

pub static INSTANCE: Ip = Ip;
