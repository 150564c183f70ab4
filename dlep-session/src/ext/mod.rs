//! The concrete extension catalog: one module per negotiable capability,
//! each exposing a `'static` singleton `Extension` impl looked up by id
//! during negotiation (`Registry::install`).

mod base_metric;
mod base_proto;
mod ip;
mod l1_stats;
mod l2_stats;
mod lid;

use dlep_proto::ids::ExtensionId;

use crate::extension::Extension;

/// Resolves an extension id to its singleton implementation. Returns
/// `None` for an id nothing in this build's catalog recognizes, which
/// `Registry::install` silently drops rather than failing negotiation —
/// an unknown id only ever comes from a peer advertising a capability
/// this build doesn't implement.
pub fn by_id(id: ExtensionId) -> Option<&'static dyn Extension> {
    match id {
        dlep_proto::ids::extension::BASE_PROTO => Some(&base_proto::INSTANCE),
        dlep_proto::ids::extension::BASE_METRIC => Some(&base_metric::INSTANCE),
        dlep_proto::ids::extension::L1_STATS => Some(&l1_stats::INSTANCE),
        dlep_proto::ids::extension::L2_STATS => Some(&l2_stats::INSTANCE),
        dlep_proto::ids::extension::LINK_ID => Some(&lid::INSTANCE),
        dlep_proto::ids::extension::IP => Some(&ip::INSTANCE),
        _ => None,
    }
}
