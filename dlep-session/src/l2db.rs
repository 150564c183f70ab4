//! The layer-2 database interface the session engine consumes (§6). Out of
//! scope per `spec.md` §1: this module only defines the trait and the small
//! value types the core needs to call it; `dlep::l2db::MemoryL2Db` is the
//! concrete, testable implementation that lives in the root crate.
//!
//! Rows and origins are opaque handles per the design notes ("L2DB origin
//! tag: treat as an opaque handle the session allocates on create and
//! releases on destroy"). This core represents them as plain integers
//! rather than an associated type per implementation, which keeps
//! `L2Db` object-safe: a session is built against `Rc<RefCell<dyn L2Db>>`
//! so the extension list can be a `Vec<&'static dyn Extension>` without
//! threading a generic parameter through every extension impl.

use alloc::vec::Vec;
use core::net::IpAddr;

use crate::neighbor::NeighborKey;

pub type NetId = u32;
pub type NeighId = u64;
pub type OriginId = u32;

/// One typed metric slot, named after the TLV it is populated from (§4.6).
/// Network-wide fields (none currently defined by the base/L1/L2 extensions;
/// all their mappings are per-neighbor) and per-neighbor fields share one
/// enum since both `data_set`/`net_data_set` take a `Field`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Field {
    Mdrr,
    Mdrt,
    Cdrr,
    Cdrt,
    Latency,
    Resr,
    Rest,
    Rlqr,
    Rlqt,
    FreqPrimary,
    FreqSecondary,
    BandwidthPrimary,
    BandwidthSecondary,
    Noise,
    ChannelActive,
    ChannelBusy,
    ChannelRx,
    ChannelTx,
    SignalRx,
    SignalTx,
    FramesR,
    FramesT,
    BytesR,
    BytesT,
    ThroughputT,
    FramesRetries,
    FramesFailed,
}

/// A decoded metric value, widened per §4.6's numeric conversion rules.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum L2Value {
    U64(u64),
    I64(i64),
}

impl L2Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            Self::I64(v) => u64::try_from(*v).ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::I64(v) => Some(*v),
        }
    }
}

/// An IPv4/IPv6 host address (`prefix = None`) or subnet (`prefix = Some`),
/// as carried by the IP extension's address/subnet TLVs (§4.8).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub prefix: Option<u8>,
}

impl IpPrefix {
    pub fn host(addr: IpAddr) -> Self {
        Self { addr, prefix: None }
    }

    pub fn subnet(addr: IpAddr, prefix: u8) -> Self {
        Self {
            addr,
            prefix: Some(prefix),
        }
    }
}

/// The layer-2 database interface consumed by the session engine (§6).
///
/// Every mutating call is tagged with the calling session's `OriginId`
/// (I3): `origin_remove` is the only correct way to withdraw everything a
/// session contributed, and implementors must cascade it atomically
/// (Property P7).
pub trait L2Db {
    fn net_add(&mut self, name: &str) -> NetId;
    fn net_get(&self, name: &str) -> Option<NetId>;
    /// Removes the network row if, after this call, no origin has any data
    /// or neighbor attached to it. A no-op if the network is still in use.
    fn net_remove_if_origin_empty(&mut self, net: NetId, origin: OriginId);

    fn neigh_add(&mut self, net: NetId, key: &NeighborKey) -> NeighId;
    fn neigh_get(&self, net: NetId, key: &NeighborKey) -> Option<NeighId>;
    /// Removes `origin`'s contribution to the neighbor; the row itself is
    /// deleted once no origin has data left on it (I3).
    fn neigh_remove(&mut self, neigh: NeighId, origin: OriginId);

    fn data_set(&mut self, neigh: NeighId, field: Field, origin: OriginId, value: L2Value);
    fn data_clear(&mut self, neigh: NeighId, field: Field, origin: OriginId);
    fn data_get(&self, neigh: NeighId, field: Field) -> Option<L2Value>;

    fn net_data_set(&mut self, net: NetId, field: Field, origin: OriginId, value: L2Value);
    fn net_data_clear(&mut self, net: NetId, field: Field, origin: OriginId);
    fn net_data_get(&self, net: NetId, field: Field) -> Option<L2Value>;

    fn neigh_addr_set(&mut self, neigh: NeighId, origin: OriginId, prefix: IpPrefix);
    fn neigh_addr_clear(&mut self, neigh: NeighId, origin: OriginId, prefix: IpPrefix);
    fn neigh_addrs(&self, neigh: NeighId) -> Vec<IpPrefix>;

    fn net_addr_set(&mut self, net: NetId, origin: OriginId, prefix: IpPrefix);
    fn net_addr_clear(&mut self, net: NetId, origin: OriginId, prefix: IpPrefix);
    fn net_addrs(&self, net: NetId) -> Vec<IpPrefix>;

    fn origin_register(&mut self, name: &str, proactive: bool, priority: i32) -> OriginId;
    /// Withdraws everything this origin contributed: all `data_set`/
    /// `neigh_addr_set`/`net_addr_set` calls made under it, and any
    /// neighbor or network row left with no remaining data (I3, P7).
    fn origin_remove(&mut self, origin: OriginId);
}

/// Helper used by extensions implementing §4.6's "mandatory field gets a
/// default written to the L2DB the first time it's missing" rule.
pub fn ensure_default(
    l2db: &mut dyn L2Db,
    neigh: NeighId,
    field: Field,
    origin: OriginId,
    default: L2Value,
) -> L2Value {
    if let Some(v) = l2db.data_get(neigh, field) {
        v
    } else {
        l2db.data_set(neigh, field, origin, default);
        default
    }
}
