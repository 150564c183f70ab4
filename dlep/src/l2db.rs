//! `MemoryL2Db`: an in-memory implementation of `dlep_session::L2Db` (§6),
//! keyed the way the original's `oonf_layer2` subsystem keys its rows
//! (interface name -> neighbor key -> data slot), used by the demo
//! binaries and the integration tests. `spec.md` deliberately keeps the
//! real L2DB out of scope; this is new code with no line-for-line teacher
//! analog, grounded directly on the `L2Db` trait spec.md §6 defines.

use std::collections::BTreeMap;

use dlep_session::{Field, IpPrefix, L2Db, NeighId, NeighborKey, NetId, OriginId};

struct Slot<V> {
    // last writer wins on overlapping origins, as spec.md's L2DB interface
    // doesn't define a merge policy beyond "an origin's writes are its own"
    by_origin: BTreeMap<OriginId, V>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            by_origin: BTreeMap::new(),
        }
    }
}

impl<V: Clone> Slot<V> {
    fn set(&mut self, origin: OriginId, value: V) {
        self.by_origin.insert(origin, value);
    }

    fn clear(&mut self, origin: OriginId) {
        self.by_origin.remove(&origin);
    }

    fn get(&self) -> Option<&V> {
        // Arbitrary but deterministic: highest origin id (most recently
        // registered) wins when more than one origin has written the same
        // slot.
        self.by_origin.values().next_back()
    }

    fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }
}

struct NeighborRow {
    key: NeighborKey,
    data: BTreeMap<Field, Slot<dlep_session::L2Value>>,
    addrs: Slot<Vec<IpPrefix>>,
}

impl NeighborRow {
    fn new(key: NeighborKey) -> Self {
        Self {
            key,
            data: BTreeMap::new(),
            addrs: Slot::default(),
        }
    }

    fn touched_by(&self, origin: OriginId) -> bool {
        self.data.values().any(|s| s.by_origin.contains_key(&origin))
            || self.addrs.by_origin.contains_key(&origin)
    }

    fn is_empty(&self) -> bool {
        self.data.values().all(Slot::is_empty) && self.addrs.is_empty()
    }
}

#[derive(Default)]
struct NetRow {
    name: String,
    neighbors: BTreeMap<NeighId, NeighborRow>,
    data: BTreeMap<Field, Slot<dlep_session::L2Value>>,
    addrs: Slot<Vec<IpPrefix>>,
}

impl NetRow {
    fn touched_by(&self, origin: OriginId) -> bool {
        self.neighbors.values().any(|n| n.touched_by(origin))
            || self.data.values().any(|s| s.by_origin.contains_key(&origin))
            || self.addrs.by_origin.contains_key(&origin)
    }
}

struct Origin {
    #[allow(dead_code)]
    name: String,
    #[allow(dead_code)]
    proactive: bool,
    #[allow(dead_code)]
    priority: i32,
}

/// In-memory `L2Db`. Not thread-safe by design: sessions on the same
/// daemon share one instance behind an `Rc<RefCell<_>>` and the daemon
/// runs single-threaded (§5).
#[derive(Default)]
pub struct MemoryL2Db {
    nets: BTreeMap<NetId, NetRow>,
    next_net: NetId,
    next_neigh: NeighId,
    origins: BTreeMap<OriginId, Origin>,
    next_origin: OriginId,
}

impl MemoryL2Db {
    pub fn new() -> Self {
        Self::default()
    }
}

impl L2Db for MemoryL2Db {
    fn net_add(&mut self, name: &str) -> NetId {
        if let Some(id) = self.net_get(name) {
            return id;
        }
        let id = self.next_net;
        self.next_net += 1;
        self.nets.insert(
            id,
            NetRow {
                name: name.to_string(),
                ..Default::default()
            },
        );
        id
    }

    fn net_get(&self, name: &str) -> Option<NetId> {
        self.nets.iter().find(|(_, n)| n.name == name).map(|(id, _)| *id)
    }

    fn net_remove_if_origin_empty(&mut self, net: NetId, origin: OriginId) {
        if let Some(row) = self.nets.get(&net) {
            if !row.touched_by(origin) {
                return;
            }
        } else {
            return;
        }
        // Withdraw this origin's contributions first, then drop the net
        // entirely if nothing else is left on it.
        self.withdraw_net(net, origin);
        let empty = self
            .nets
            .get(&net)
            .is_some_and(|row| row.neighbors.is_empty() && row.data.values().all(Slot::is_empty) && row.addrs.is_empty());
        if empty {
            self.nets.remove(&net);
        }
    }

    fn neigh_add(&mut self, net: NetId, key: &NeighborKey) -> NeighId {
        if let Some(id) = self.neigh_get(net, key) {
            return id;
        }
        let id = self.next_neigh;
        self.next_neigh += 1;
        if let Some(row) = self.nets.get_mut(&net) {
            row.neighbors.insert(id, NeighborRow::new(key.clone()));
        }
        id
    }

    fn neigh_get(&self, net: NetId, key: &NeighborKey) -> Option<NeighId> {
        self.nets
            .get(&net)?
            .neighbors
            .iter()
            .find(|(_, n)| &n.key == key)
            .map(|(id, _)| *id)
    }

    fn neigh_remove(&mut self, neigh: NeighId, origin: OriginId) {
        for net in self.nets.values_mut() {
            if let Some(row) = net.neighbors.get_mut(&neigh) {
                for slot in row.data.values_mut() {
                    slot.clear(origin);
                }
                row.addrs.clear(origin);
                if row.is_empty() {
                    net.neighbors.remove(&neigh);
                }
                return;
            }
        }
    }

    fn data_set(&mut self, neigh: NeighId, field: Field, origin: OriginId, value: dlep_session::L2Value) {
        if let Some(row) = self.neighbor_mut(neigh) {
            row.data.entry(field).or_default().set(origin, value);
        }
    }

    fn data_clear(&mut self, neigh: NeighId, field: Field, origin: OriginId) {
        if let Some(row) = self.neighbor_mut(neigh) {
            if let Some(slot) = row.data.get_mut(&field) {
                slot.clear(origin);
            }
        }
    }

    fn data_get(&self, neigh: NeighId, field: Field) -> Option<dlep_session::L2Value> {
        self.neighbor(neigh)?.data.get(&field)?.get().copied()
    }

    fn net_data_set(&mut self, net: NetId, field: Field, origin: OriginId, value: dlep_session::L2Value) {
        if let Some(row) = self.nets.get_mut(&net) {
            row.data.entry(field).or_default().set(origin, value);
        }
    }

    fn net_data_clear(&mut self, net: NetId, field: Field, origin: OriginId) {
        if let Some(row) = self.nets.get_mut(&net) {
            if let Some(slot) = row.data.get_mut(&field) {
                slot.clear(origin);
            }
        }
    }

    fn net_data_get(&self, net: NetId, field: Field) -> Option<dlep_session::L2Value> {
        self.nets.get(&net)?.data.get(&field)?.get().copied()
    }

    fn neigh_addr_set(&mut self, neigh: NeighId, origin: OriginId, prefix: IpPrefix) {
        if let Some(row) = self.neighbor_mut(neigh) {
            let mut addrs = row.addrs.get().cloned().unwrap_or_default();
            if !addrs.contains(&prefix) {
                addrs.push(prefix);
            }
            row.addrs.set(origin, addrs);
        }
    }

    fn neigh_addr_clear(&mut self, neigh: NeighId, origin: OriginId, prefix: IpPrefix) {
        if let Some(row) = self.neighbor_mut(neigh) {
            if let Some(addrs) = row.addrs.by_origin.get_mut(&origin) {
                addrs.retain(|p| p != &prefix);
            }
        }
    }

    fn neigh_addrs(&self, neigh: NeighId) -> Vec<IpPrefix> {
        self.neighbor(neigh)
            .and_then(|row| row.addrs.get().cloned())
            .unwrap_or_default()
    }

    fn net_addr_set(&mut self, net: NetId, origin: OriginId, prefix: IpPrefix) {
        if let Some(row) = self.nets.get_mut(&net) {
            let mut addrs = row.addrs.get().cloned().unwrap_or_default();
            if !addrs.contains(&prefix) {
                addrs.push(prefix);
            }
            row.addrs.set(origin, addrs);
        }
    }

    fn net_addr_clear(&mut self, net: NetId, origin: OriginId, prefix: IpPrefix) {
        if let Some(row) = self.nets.get_mut(&net) {
            if let Some(addrs) = row.addrs.by_origin.get_mut(&origin) {
                addrs.retain(|p| p != &prefix);
            }
        }
    }

    fn net_addrs(&self, net: NetId) -> Vec<IpPrefix> {
        self.nets
            .get(&net)
            .and_then(|row| row.addrs.get().cloned())
            .unwrap_or_default()
    }

    fn origin_register(&mut self, name: &str, proactive: bool, priority: i32) -> OriginId {
        let id = self.next_origin;
        self.next_origin += 1;
        self.origins.insert(
            id,
            Origin {
                name: name.to_string(),
                proactive,
                priority,
            },
        );
        id
    }

    fn origin_remove(&mut self, origin: OriginId) {
        self.origins.remove(&origin);

        let nets: Vec<NetId> = self.nets.keys().copied().collect();
        for net in nets {
            self.withdraw_net(net, origin);
        }
    }
}

impl MemoryL2Db {
    fn neighbor(&self, neigh: NeighId) -> Option<&NeighborRow> {
        self.nets.values().find_map(|net| net.neighbors.get(&neigh))
    }

    fn neighbor_mut(&mut self, neigh: NeighId) -> Option<&mut NeighborRow> {
        self.nets.values_mut().find_map(|net| net.neighbors.get_mut(&neigh))
    }

    /// Withdraws `origin`'s contributions from `net` and every neighbor
    /// under it, deleting any row left with no data (I3, P7).
    fn withdraw_net(&mut self, net: NetId, origin: OriginId) {
        let Some(row) = self.nets.get_mut(&net) else {
            return;
        };

        for slot in row.data.values_mut() {
            slot.clear(origin);
        }
        row.addrs.clear(origin);

        let empty_neighbors: Vec<NeighId> = row
            .neighbors
            .iter_mut()
            .filter_map(|(id, n)| {
                for slot in n.data.values_mut() {
                    slot.clear(origin);
                }
                n.addrs.clear(origin);
                n.is_empty().then_some(*id)
            })
            .collect();

        for id in empty_neighbors {
            row.neighbors.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlep_session::NeighborKey;

    #[test]
    fn origin_remove_cascades_to_neighbor_rows() {
        let mut db = MemoryL2Db::new();
        let net = db.net_add("wlan0");
        let origin = db.origin_register("wlan0", true, 0);

        let key = NeighborKey::mac_only([1, 2, 3, 4, 5, 6, 0, 0]);
        let neigh = db.neigh_add(net, &key);
        db.data_set(neigh, Field::Mdrr, origin, dlep_session::L2Value::U64(1000));
        assert!(db.data_get(neigh, Field::Mdrr).is_some());

        db.origin_remove(origin);
        assert!(db.data_get(neigh, Field::Mdrr).is_none());
        assert!(db.neigh_get(net, &key).is_none());
    }

    #[test]
    fn net_remove_if_origin_empty_is_noop_while_other_origin_holds_data() {
        let mut db = MemoryL2Db::new();
        let net = db.net_add("wlan0");
        let a = db.origin_register("radio", true, 0);
        let b = db.origin_register("router", false, 0);

        db.net_data_set(net, Field::Mdrr, a, dlep_session::L2Value::U64(1));
        db.net_data_set(net, Field::Mdrt, b, dlep_session::L2Value::U64(2));

        db.net_remove_if_origin_empty(net, a);
        assert!(db.net_get("wlan0").is_some());
        assert!(db.net_data_get(net, Field::Mdrt).is_some());

        db.net_remove_if_origin_empty(net, b);
        assert!(db.net_get("wlan0").is_none());
    }
}
