//! The extension framework (§4.3): a process-wide catalog of extensions,
//! negotiation of the active set, and per-signal dispatch.
//!
//! Per the design notes ("dynamic dispatch via function-pointer structs ...
//! model as a trait/interface set"), each extension is a zero-sized type
//! implementing `Extension`, referenced as `&'static dyn Extension` so a
//! session's active list is a plain `Vec` of trait objects assembled once at
//! install time and otherwise never touched until the next renegotiation.

use alloc::vec::Vec;

use dlep_proto::ids::{ExtensionId, SignalId, TlvId};
use dlep_proto::ParsedSignal;

use crate::error::SessionError;
use crate::neighbor::NeighborKey;
use crate::session::Session;

/// One signal an extension participates in: which TLVs it requires, and
/// which it merely accepts (§3 "Extension" metadata).
#[derive(Clone, Copy, Debug)]
pub struct SignalSpec {
    pub signal: SignalId,
    pub mandatory: &'static [TlvId],
    pub supported: &'static [TlvId],
}

/// A negotiated DLEP capability: base protocol, base metrics, L1/L2 stats,
/// link-id or IP (§3 "Extension", §4.3).
pub trait Extension: core::fmt::Debug + Send + Sync {
    fn id(&self) -> ExtensionId;
    fn name(&self) -> &'static str;

    /// TLV ids this extension contributes to the session's allowed-TLV map
    /// (§4.2), each with its static length bounds resolved via
    /// `dlep_proto::tlv::bounds_for`.
    fn tlvs(&self) -> &'static [TlvId];

    /// Signals this extension declares an interest in, for both inbound
    /// dispatch (§4.3 "calls ... the process callback of every extension
    /// that declares this signal") and to compute a signal's combined
    /// mandatory-TLV set across all active extensions.
    fn signals(&self) -> &'static [SignalSpec];

    fn mandatory_for(&self, signal: SignalId) -> &'static [TlvId] {
        self.signals()
            .iter()
            .find(|s| s.signal == signal)
            .map(|s| s.mandatory)
            .unwrap_or(&[])
    }

    fn declares(&self, signal: SignalId) -> bool {
        self.signals().iter().any(|s| s.signal == signal)
    }

    /// Appends this extension's contribution to an outgoing `signal` onto
    /// `session`'s transmit buffer. `neigh` is the destination key for
    /// destination-carrying signals.
    fn add_tlvs(&self, session: &mut Session, signal: SignalId, neigh: Option<&NeighborKey>);

    /// Processes this extension's TLVs out of an inbound `signal` this
    /// extension declared. Errors here are fatal to the session (§7).
    fn process(
        &self,
        session: &mut Session,
        signal: &ParsedSignal,
        neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError>;
}

/// Computes the installed extension set for a session, given the locally
/// configured ids and the ids the peer advertised (§4.3, Property P6): the
/// intersection of both, unioned with the always-present base extensions,
/// in ascending-id order.
pub struct Registry;

impl Registry {
    pub fn install(
        local: &[ExtensionId],
        remote: &[ExtensionId],
    ) -> Vec<&'static dyn Extension> {
        let mut ids: Vec<ExtensionId> = dlep_proto::ids::extension::BASE.to_vec();

        for id in local {
            if remote.contains(id) && !ids.contains(id) {
                ids.push(*id);
            }
        }

        ids.sort_unstable();
        ids.into_iter().filter_map(crate::ext::by_id).collect()
    }
}
