//! Destination (neighbor) key and per-destination sub-state-machine (§3
//! "Local neighbor", §4.4 "Destination sub-machine").

use alloc::vec::Vec;
use core::time::Duration;

use crate::l2db::{IpPrefix, NeighId};

/// A destination's identity. Plain MAC when the link-id extension is not
/// active; extended with an opaque link-id when it is (§4.7): "two sessions
/// running on the same interface may refer to the same MAC with distinct
/// link-ids without collision".
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NeighborKey {
    pub mac: [u8; 8],
    pub link_id: Option<Vec<u8>>,
}

impl NeighborKey {
    pub fn mac_only(mac: [u8; 8]) -> Self {
        Self { mac, link_id: None }
    }

    pub fn with_link_id(mac: [u8; 8], link_id: Vec<u8>) -> Self {
        Self {
            mac,
            link_id: Some(link_id),
        }
    }
}

/// A destination's lifecycle state (§3 "Lifecycles: Destination").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DestState {
    Idle,
    UpSent,
    UpAcked,
    DownSent,
    DownAcked,
}

/// One radio-observed or router-learned destination.
pub struct LocalNeighbor {
    pub key: NeighborKey,
    pub state: DestState,
    /// Set when the radio-side observer sees a metric/IP change while the
    /// destination is `UpAcked`; cleared once a Destination Update has been
    /// generated for it.
    pub changed_pending: bool,
    /// Deadline for the current transient state (`UpSent`/`DownSent`); a
    /// stuck destination is forced to its terminal state past this point
    /// (§3 I6, §5 "every transient state ... has an explicit timer").
    pub ack_deadline: Option<Duration>,
    /// Pending add/remove IP changes not yet flushed onto the wire (§4.8).
    pub ip_queue: Vec<(IpPrefix, bool)>,
    /// The L2DB neighbor row backing this destination, once created.
    pub row: Option<NeighId>,
}

impl LocalNeighbor {
    pub fn new(key: NeighborKey) -> Self {
        Self {
            key,
            state: DestState::Idle,
            changed_pending: false,
            ack_deadline: None,
            ip_queue: Vec::new(),
            row: None,
        }
    }

    pub fn queue_ip_change(&mut self, prefix: IpPrefix, add: bool) {
        self.ip_queue.push((prefix, add));
    }

    pub fn drain_ip_changes(&mut self) -> Vec<(IpPrefix, bool)> {
        core::mem::take(&mut self.ip_queue)
    }
}
