//! The session state machine (§4.4): discovery-complete handshake through
//! active heartbeating to termination, plus the per-destination lifecycle
//! (§4.4 "Destination sub-machine").
//!
//! A `Session` only knows bytes in, bytes out and a monotonic `now`
//! supplied by the caller on every call (`core::time::Duration`, read as
//! "time elapsed since some fixed epoch the host picks" so this crate
//! never has to depend on `std::time::Instant`). `dlep-io` is the only
//! crate that talks to an actual clock or socket.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::time::Duration;

use dlep_proto::codec::Writer;
use dlep_proto::ids::{extension, signal, tlv, ExtensionId, SignalId};
use dlep_proto::parser::{parse, ParsedSignal, TlvRegistry};
use dlep_proto::StatusCode;

use crate::error::SessionError;
use crate::extension::{Extension, Registry};
use crate::l2db::{L2Db, NeighId, NetId, OriginId};
use crate::neighbor::{DestState, LocalNeighbor, NeighborKey};

/// Which side of the DLEP conversation this session plays.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Radio,
    Router,
}

/// Per-session tunables (§6's per-interface configuration keys that are
/// session-scoped rather than socket-scoped; `discovery_interval` and
/// `single_session` live in `dlep::Config`/`dlep-io` since they govern the
/// pre-session UDP phase this crate doesn't own).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub peer_type: Option<String>,
    pub heartbeat_interval: Duration,
    /// How long a transient state (`WaitingForInit`, `WaitingForInitAck`,
    /// `WaitingForTerminationAck`, destination `UpSent`/`DownSent`) is
    /// allowed to persist before being forced to its terminal state (§5).
    /// Not given a wire-visible default by `spec.md`; resolved here as
    /// noted in `DESIGN.md`.
    pub ack_timeout: Duration,
    /// Non-base extension ids this side is willing to negotiate (§4.3).
    pub extensions: Vec<ExtensionId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            peer_type: None,
            heartbeat_interval: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(5),
            extensions: alloc::vec![
                extension::L1_STATS,
                extension::L2_STATS,
                extension::LINK_ID,
                extension::IP,
            ],
        }
    }
}

impl SessionConfig {
    /// Clamps `heartbeat_interval` into `[1, 65535]` seconds (§6).
    pub fn clamp_heartbeat(&mut self) {
        let secs = self.heartbeat_interval.as_secs().clamp(1, 65535);
        self.heartbeat_interval = Duration::from_secs(secs);
    }
}

/// Coarse session lifecycle state (§3 "Lifecycles: Session").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    WaitingForInit,
    WaitingForInitAck,
    Active,
    WaitingForTerminationAck,
    Destroyed,
}

/// What happened during a `poll_timers` call, for logging and tests.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    None,
    HeartbeatSent,
    LivenessTimeout,
    Destroyed,
}

pub struct Session {
    role: Role,
    iface: String,
    net: NetId,
    origin: OriginId,
    l2db: Rc<RefCell<dyn L2Db>>,
    cfg: SessionConfig,
    local_ids: Vec<ExtensionId>,
    state: SessionState,
    registry: TlvRegistry,
    active: Vec<&'static dyn Extension>,
    remote_heartbeat_interval: Duration,
    pub peer_type: Option<String>,
    pub remote_peer_type: Option<String>,
    local_heartbeat_deadline: Duration,
    liveness_deadline: Duration,
    term_deadline: Option<Duration>,
    neighbors: BTreeMap<NeighborKey, LocalNeighbor>,
    iface_ip_queue: Vec<(crate::l2db::IpPrefix, bool)>,
    writer: Writer,
    outbox: Vec<u8>,
    pending_status: Option<(StatusCode, String)>,
}

impl Session {
    fn new(
        role: Role,
        iface: &str,
        mut cfg: SessionConfig,
        l2db: Rc<RefCell<dyn L2Db>>,
        now: Duration,
    ) -> Self {
        cfg.clamp_heartbeat();

        let (net, origin) = {
            let mut db = l2db.borrow_mut();
            let net = db.net_add(iface);
            let origin = db.origin_register(iface, role == Role::Radio, 0);
            (net, origin)
        };

        let mut session = Self {
            role,
            iface: String::from(iface),
            net,
            origin,
            l2db,
            local_ids: cfg.extensions.clone(),
            peer_type: cfg.peer_type.clone(),
            cfg,
            state: SessionState::WaitingForInit,
            registry: TlvRegistry::new(),
            active: Vec::new(),
            remote_heartbeat_interval: Duration::from_secs(1),
            remote_peer_type: None,
            local_heartbeat_deadline: now,
            liveness_deadline: now,
            term_deadline: None,
            neighbors: BTreeMap::new(),
            iface_ip_queue: Vec::new(),
            writer: Writer::new(),
            outbox: Vec::new(),
            pending_status: None,
        };

        // §4.4 create(): "installs base extensions" — negotiating against
        // an empty remote set still installs `extension::BASE` per
        // `Registry::install`.
        let _ = session.negotiate(&[]);
        session
    }

    /// Creates a radio-role session on an already-accepted TCP stream,
    /// waiting for the router's Peer Initialization.
    pub fn create_radio(
        iface: &str,
        cfg: SessionConfig,
        l2db: Rc<RefCell<dyn L2Db>>,
        now: Duration,
    ) -> Self {
        let mut session = Self::new(Role::Radio, iface, cfg, l2db, now);
        session.state = SessionState::WaitingForInit;
        // `WaitingForInit` is itself a transient state per `ack_timeout`'s
        // doc comment; reuse `term_deadline` to force a destroy if the
        // router never sends its Peer Initialization.
        session.term_deadline = Some(now + session.cfg.ack_timeout);
        session
    }

    /// Creates a router-role session on an already-connected TCP stream,
    /// immediately queuing the Peer Initialization signal.
    pub fn create_router(
        iface: &str,
        cfg: SessionConfig,
        l2db: Rc<RefCell<dyn L2Db>>,
        now: Duration,
    ) -> Self {
        let mut session = Self::new(Role::Router, iface, cfg, l2db, now);
        session.state = SessionState::WaitingForInitAck;
        session.term_deadline = Some(now + session.cfg.ack_timeout);
        session.generate(signal::PEER_INITIALIZATION, None);
        session
    }

    // ---- accessors used by extension implementations ----

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn iface(&self) -> &str {
        &self.iface
    }

    pub fn net(&self) -> NetId {
        self.net
    }

    pub fn origin(&self) -> OriginId {
        self.origin
    }

    pub fn l2db(&self) -> Rc<RefCell<dyn L2Db>> {
        self.l2db.clone()
    }

    pub fn cfg(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn local_ids(&self) -> &[ExtensionId] {
        &self.local_ids
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == SessionState::Destroyed
    }

    pub fn remote_heartbeat_interval(&self) -> Duration {
        self.remote_heartbeat_interval
    }

    pub fn link_id_active(&self) -> bool {
        self.active.iter().any(|e| e.id() == extension::LINK_ID)
    }

    pub fn ip_active(&self) -> bool {
        self.active.iter().any(|e| e.id() == extension::IP)
    }

    pub fn neighbor(&self, key: &NeighborKey) -> Option<&LocalNeighbor> {
        self.neighbors.get(key)
    }

    pub fn neighbor_mut(&mut self, key: &NeighborKey) -> Option<&mut LocalNeighbor> {
        self.neighbors.get_mut(key)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &LocalNeighbor> {
        self.neighbors.values()
    }

    pub fn writer_mut(&mut self) -> &mut Writer {
        &mut self.writer
    }

    pub fn pending_status(&self) -> Option<(StatusCode, String)> {
        self.pending_status.clone()
    }

    pub fn queue_interface_ip_change(&mut self, prefix: crate::l2db::IpPrefix, add: bool) {
        self.iface_ip_queue.push((prefix, add));
    }

    pub fn drain_interface_ip_changes(&mut self) -> Vec<(crate::l2db::IpPrefix, bool)> {
        core::mem::take(&mut self.iface_ip_queue)
    }

    pub fn queue_neighbor_ip_change(&mut self, key: &NeighborKey, prefix: crate::l2db::IpPrefix, add: bool) {
        if let Some(n) = self.neighbors.get_mut(key) {
            n.queue_ip_change(prefix, add);
        }
    }

    // ---- byte interface ----

    /// Drains and returns bytes queued for transmission (§5: "written
    /// contiguously to the transmit buffer and flushed before the next
    /// inbound event is processed" — the caller is expected to flush this
    /// after every `feed`/`poll_timers` call).
    pub fn take_outbox(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.outbox)
    }

    pub fn has_outbox(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Parses and processes as many complete signals as `buf` holds,
    /// returning the number of bytes consumed. Incomplete trailing bytes
    /// are left for the next call (§7: recoverable on a stream transport).
    pub fn feed(&mut self, buf: &[u8], now: Duration) -> usize {
        let mut consumed = 0;

        while self.state != SessionState::Destroyed {
            let remaining = &buf[consumed..];
            if remaining.len() < 4 {
                break;
            }

            let signal_id = u16::from_be_bytes([remaining[0], remaining[1]]);
            let mandatory = self.mandatory_for(signal_id);

            match parse(remaining, &self.registry, &mandatory) {
                Ok((parsed, used)) => {
                    consumed += used;
                    if let Err(err) = self.dispatch(&parsed, now) {
                        self.fail(err, now);
                        break;
                    }
                }
                Err(err) if err.is_recoverable_on_stream() => break,
                Err(err) => {
                    self.fail(err.into(), now);
                    break;
                }
            }
        }

        consumed
    }

    fn mandatory_for(&self, signal: SignalId) -> Vec<dlep_proto::ids::TlvId> {
        let mut out = Vec::new();
        for ext in &self.active {
            for id in ext.mandatory_for(signal) {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        }
        out
    }

    fn signal_allowed(&self, id: SignalId) -> bool {
        match self.state {
            SessionState::WaitingForInit => id == signal::PEER_INITIALIZATION,
            SessionState::WaitingForInitAck => id == signal::PEER_INITIALIZATION_ACK,
            SessionState::WaitingForTerminationAck => {
                id == signal::PEER_TERMINATION_ACK || id == signal::PEER_TERMINATION
            }
            SessionState::Active => true,
            SessionState::Destroyed => false,
        }
    }

    fn dispatch(&mut self, parsed: &ParsedSignal, now: Duration) -> Result<(), SessionError> {
        if !self.signal_allowed(parsed.signal_id) {
            return Err(SessionError::UnexpectedSignal {
                expected: None,
                got: parsed.signal_id,
            });
        }

        // Any inbound signal resets remote liveness (§4.4).
        self.liveness_deadline = now + 2 * self.remote_heartbeat_interval.max(Duration::from_millis(1));

        let neigh_key = self.extract_neighbor_key(parsed)?;

        match parsed.signal_id {
            signal::PEER_INITIALIZATION => self.on_peer_init(parsed, now)?,
            signal::PEER_INITIALIZATION_ACK => self.on_peer_init_ack(parsed, now)?,
            signal::PEER_UPDATE => self.on_peer_update(parsed)?,
            signal::PEER_UPDATE_ACK => self.on_peer_update_ack(parsed)?,
            signal::PEER_TERMINATION => self.on_peer_termination(parsed)?,
            signal::PEER_TERMINATION_ACK => self.destroy(),
            signal::HEARTBEAT => {}
            signal::DESTINATION_UP => {
                let key = require_key(neigh_key)?;
                self.on_destination_up(parsed, key)?;
            }
            signal::DESTINATION_UP_ACK => {
                let key = require_key(neigh_key)?;
                self.on_destination_up_ack(key);
            }
            signal::DESTINATION_DOWN => {
                let key = require_key(neigh_key)?;
                self.on_destination_down(key);
            }
            signal::DESTINATION_DOWN_ACK => {
                let key = require_key(neigh_key)?;
                self.neighbors.remove(&key);
            }
            signal::DESTINATION_UPDATE => {
                let key = require_key(neigh_key)?;
                self.dispatch_process(parsed, Some(&key))?;
            }
            signal::LINK_CHARACTERISTICS_REQUEST => {
                let key = require_key(neigh_key)?;
                self.generate(signal::LINK_CHARACTERISTICS_ACK, Some(&key));
            }
            signal::LINK_CHARACTERISTICS_ACK => {
                let key = require_key(neigh_key)?;
                self.dispatch_process(parsed, Some(&key))?;
            }
            _ => return Err(SessionError::Protocol(dlep_proto::Error::InternalError)),
        }

        Ok(())
    }

    fn extract_neighbor_key(&self, parsed: &ParsedSignal) -> Result<Option<NeighborKey>, SessionError> {
        let destination_signal = matches!(
            parsed.signal_id,
            signal::DESTINATION_UP
                | signal::DESTINATION_UP_ACK
                | signal::DESTINATION_DOWN
                | signal::DESTINATION_DOWN_ACK
                | signal::DESTINATION_UPDATE
                | signal::LINK_CHARACTERISTICS_REQUEST
                | signal::LINK_CHARACTERISTICS_ACK
        );
        if !destination_signal {
            return Ok(None);
        }

        let mac_val = parsed
            .first_value_of(tlv::MAC_ADDRESS)
            .ok_or(dlep_proto::Error::MissingMandatoryTlv(tlv::MAC_ADDRESS))?;
        let mac = dlep_proto::codec::read_mac(mac_val.value())?;

        if self.link_id_active() {
            let lid_val = parsed
                .first_value_of(tlv::LINK_ID)
                .ok_or(dlep_proto::Error::MissingMandatoryTlv(tlv::LINK_ID))?;
            Ok(Some(NeighborKey::with_link_id(mac, lid_val.value().to_vec())))
        } else {
            Ok(Some(NeighborKey::mac_only(mac)))
        }
    }

    fn negotiate(&mut self, remote_ext: &[ExtensionId]) -> Result<(), SessionError> {
        let active = Registry::install(&self.local_ids, remote_ext);

        let mut registry = TlvRegistry::new();
        for ext in &active {
            for id in ext.tlvs() {
                let bounds = dlep_proto::tlv::bounds_for(*id).ok_or(SessionError::ExtensionConflict(*id))?;
                registry
                    .insert(*id, bounds)
                    .map_err(SessionError::ExtensionConflict)?;
            }
        }

        self.active = active;
        self.registry = registry;
        Ok(())
    }

    fn read_remote_extensions(parsed: &ParsedSignal) -> Result<Vec<ExtensionId>, SessionError> {
        let ids = match parsed.first_value_of(tlv::EXTENSIONS_SUPPORTED) {
            Some(v) => dlep_proto::codec::read_extensions(v.value())?,
            None => Vec::new(),
        };
        Ok(ids.into_iter().map(|v| v as ExtensionId).collect())
    }

    fn on_peer_init(&mut self, parsed: &ParsedSignal, now: Duration) -> Result<(), SessionError> {
        self.apply_handshake_tlvs(parsed)?;
        let remote_ext = Self::read_remote_extensions(parsed)?;
        self.negotiate(&remote_ext)?;

        self.state = SessionState::Active;
        self.term_deadline = None;
        self.local_heartbeat_deadline = now + self.cfg.heartbeat_interval;
        self.liveness_deadline = now + 2 * self.remote_heartbeat_interval;

        self.generate(signal::PEER_INITIALIZATION_ACK, None);
        Ok(())
    }

    fn on_peer_init_ack(&mut self, parsed: &ParsedSignal, now: Duration) -> Result<(), SessionError> {
        self.apply_handshake_tlvs(parsed)?;
        let remote_ext = Self::read_remote_extensions(parsed)?;
        self.negotiate(&remote_ext)?;

        self.state = SessionState::Active;
        self.term_deadline = None;
        self.local_heartbeat_deadline = now + self.cfg.heartbeat_interval;
        self.liveness_deadline = now + 2 * self.remote_heartbeat_interval;

        self.dispatch_process(parsed, None)?;
        Ok(())
    }

    fn apply_handshake_tlvs(&mut self, parsed: &ParsedSignal) -> Result<(), SessionError> {
        let hb = parsed
            .first_value_of(tlv::HEARTBEAT_INTERVAL)
            .ok_or(dlep_proto::Error::MissingMandatoryTlv(tlv::HEARTBEAT_INTERVAL))?;
        let secs = u16::from_be_bytes(
            hb.value()
                .try_into()
                .map_err(|_| dlep_proto::Error::IllegalTlvLength(tlv::HEARTBEAT_INTERVAL))?,
        );
        self.remote_heartbeat_interval = Duration::from_secs(secs.max(1) as u64);

        if let Some(pt) = parsed.first_value_of(tlv::PEER_TYPE) {
            self.remote_peer_type = core::str::from_utf8(pt.value()).ok().map(String::from);
        }

        Ok(())
    }

    fn on_peer_update(&mut self, parsed: &ParsedSignal) -> Result<(), SessionError> {
        if let Some(hb) = parsed.first_value_of(tlv::HEARTBEAT_INTERVAL) {
            let secs = u16::from_be_bytes(
                hb.value()
                    .try_into()
                    .map_err(|_| dlep_proto::Error::IllegalTlvLength(tlv::HEARTBEAT_INTERVAL))?,
            );
            self.remote_heartbeat_interval = Duration::from_secs(secs.max(1) as u64);
        }
        if let Some(pt) = parsed.first_value_of(tlv::PEER_TYPE) {
            self.remote_peer_type = core::str::from_utf8(pt.value()).ok().map(String::from);
        }

        self.dispatch_process(parsed, None)?;
        self.generate(signal::PEER_UPDATE_ACK, None);
        Ok(())
    }

    fn on_peer_update_ack(&mut self, parsed: &ParsedSignal) -> Result<(), SessionError> {
        self.dispatch_process(parsed, None)
    }

    fn on_peer_termination(&mut self, _parsed: &ParsedSignal) -> Result<(), SessionError> {
        self.generate(signal::PEER_TERMINATION_ACK, None);
        self.destroy();
        Ok(())
    }

    fn dispatch_process(
        &mut self,
        parsed: &ParsedSignal,
        neigh: Option<&NeighborKey>,
    ) -> Result<(), SessionError> {
        let active = self.active.clone();
        for ext in active {
            if ext.declares(parsed.signal_id) {
                ext.process(self, parsed, neigh)?;
            }
        }
        Ok(())
    }

    fn on_destination_up(&mut self, parsed: &ParsedSignal, key: NeighborKey) -> Result<(), SessionError> {
        let row = {
            let mut db = self.l2db.borrow_mut();
            db.neigh_add(self.net, &key)
        };

        let local = self
            .neighbors
            .entry(key.clone())
            .or_insert_with(|| LocalNeighbor::new(key.clone()));
        local.row = Some(row);
        local.state = DestState::UpAcked;

        self.dispatch_process(parsed, Some(&key))?;
        self.generate(signal::DESTINATION_UP_ACK, Some(&key));
        Ok(())
    }

    fn on_destination_up_ack(&mut self, key: NeighborKey) {
        if let Some(n) = self.neighbors.get_mut(&key) {
            n.state = DestState::UpAcked;
            n.ack_deadline = None;
        }
    }

    fn on_destination_down(&mut self, key: NeighborKey) {
        if let Some(n) = self.neighbors.get(&key) {
            if let Some(row) = n.row {
                self.l2db.borrow_mut().neigh_remove(row, self.origin);
            }
        }
        self.neighbors.remove(&key);
        self.generate(signal::DESTINATION_DOWN_ACK, Some(&key));
    }

    // ---- radio-side observer API: called by the host glue whenever the
    // underlying L2DB this radio's hardware feeds changes (§4.4,
    // "Destination sub-machine (radio side)"). ----

    pub fn neighbor_up(&mut self, key: NeighborKey, now: Duration) {
        if self.state != SessionState::Active {
            return;
        }
        let entry = self
            .neighbors
            .entry(key.clone())
            .or_insert_with(|| LocalNeighbor::new(key.clone()));
        if entry.state != DestState::Idle {
            return;
        }
        entry.state = DestState::UpSent;
        entry.ack_deadline = Some(now + self.cfg.ack_timeout);

        // A radio-originated Destination Up must carry the mandatory
        // base-metric TLVs same as a router-received one, which means a
        // row has to exist in the L2DB before `generate` runs any
        // extension's `add_tlvs` (mirrors `on_destination_up`).
        let row = self.l2db.borrow_mut().neigh_add(self.net, &key);
        if let Some(n) = self.neighbors.get_mut(&key) {
            n.row = Some(row);
        }

        self.generate(signal::DESTINATION_UP, Some(&key));
    }

    pub fn neighbor_down(&mut self, key: NeighborKey, now: Duration) {
        let should_send = matches!(
            self.neighbors.get(&key).map(|n| n.state),
            Some(DestState::UpSent) | Some(DestState::UpAcked)
        );
        if !should_send {
            return;
        }
        if let Some(n) = self.neighbors.get_mut(&key) {
            n.state = DestState::DownSent;
            n.ack_deadline = Some(now + self.cfg.ack_timeout);
        }
        self.generate(signal::DESTINATION_DOWN, Some(&key));
    }

    pub fn neighbor_changed(&mut self, key: NeighborKey) {
        let up_acked = matches!(self.neighbors.get(&key).map(|n| n.state), Some(DestState::UpAcked));
        if up_acked {
            self.generate(signal::DESTINATION_UPDATE, Some(&key));
        } else if let Some(n) = self.neighbors.get_mut(&key) {
            n.changed_pending = true;
        }
    }

    /// Router-side: ask the radio to re-emit a destination's current
    /// mapped metrics (supplemented feature, §4.5's Link-Characteristics
    /// Request/Ack handling).
    pub fn request_link_char(&mut self, key: NeighborKey) {
        self.generate(signal::LINK_CHARACTERISTICS_REQUEST, Some(&key));
    }

    // ---- outgoing signal assembly (§4.4 `generate`) ----

    pub fn generate(&mut self, signal: SignalId, neigh: Option<&NeighborKey>) {
        self.writer.start_signal(signal);

        let active = self.active.clone();
        for ext in active {
            if ext.declares(signal) {
                ext.add_tlvs(self, signal, neigh);
            }
        }

        let framed = self.writer.finish_signal();
        self.outbox.extend_from_slice(framed);
    }

    // ---- teardown ----

    fn fail(&mut self, err: SessionError, now: Duration) {
        if self.state == SessionState::Destroyed {
            return;
        }
        log::warn!("session on {} failing: {err}", self.iface);
        if err.is_reportable() && self.state != SessionState::WaitingForTerminationAck {
            self.queue_termination(err.status_code(), now);
        } else {
            self.destroy();
        }
    }

    fn queue_termination(&mut self, status: StatusCode, now: Duration) {
        self.pending_status = Some((status, String::new()));
        self.generate(signal::PEER_TERMINATION, None);
        self.state = SessionState::WaitingForTerminationAck;
        self.term_deadline = Some(now + self.cfg.ack_timeout);
    }

    /// User-initiated graceful shutdown (§4.4 `terminate`).
    pub fn terminate(&mut self, now: Duration) {
        if self.state == SessionState::Active {
            self.queue_termination(StatusCode::Okay, now);
        }
    }

    fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.l2db.borrow_mut().origin_remove(self.origin);
        self.neighbors.clear();
        self.state = SessionState::Destroyed;
    }

    /// Releases this interface's L2DB network row once no session is using
    /// it (called by the glue layer on interface deactivation, not on
    /// every session teardown — an interface can be reused by a new
    /// session immediately after this one destroys).
    pub fn release_interface(&self) {
        self.l2db.borrow_mut().net_remove_if_origin_empty(self.net, self.origin);
    }

    // ---- timers (§4.4 heartbeat, §5 cancellation/timeouts) ----

    pub fn poll_timers(&mut self, now: Duration) -> Event {
        if self.state == SessionState::Destroyed {
            return Event::None;
        }

        if let Some(deadline) = self.term_deadline {
            if now >= deadline {
                log::warn!(
                    "{} stuck in {:?} past its ack timeout, forcing destroy",
                    self.iface,
                    self.state
                );
                self.destroy();
                return Event::Destroyed;
            }
        }

        if self.state == SessionState::Active {
            if now >= self.liveness_deadline {
                self.queue_termination(StatusCode::Okay, now);
                return Event::LivenessTimeout;
            }
            if now >= self.local_heartbeat_deadline {
                self.generate(signal::HEARTBEAT, None);
                self.local_heartbeat_deadline = now + self.cfg.heartbeat_interval;
                return Event::HeartbeatSent;
            }
        }

        self.poll_destination_timers(now);
        Event::None
    }

    fn poll_destination_timers(&mut self, now: Duration) {
        let expired: Vec<NeighborKey> = self
            .neighbors
            .iter()
            .filter(|(_, n)| {
                matches!(n.state, DestState::UpSent | DestState::DownSent)
                    && n.ack_deadline.is_some_and(|d| now >= d)
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in expired {
            if let Some(n) = self.neighbors.get_mut(&key) {
                log::warn!("destination {:?} stuck in {:?}, forcing terminal state", n.key, n.state);
                n.ack_deadline = None;
                match n.state {
                    DestState::UpSent => n.state = DestState::UpAcked,
                    DestState::DownSent => {
                        n.state = DestState::DownAcked;
                        self.neighbors.remove(&key);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Earliest `now` at which `poll_timers` has something to do, so the
    /// caller's event loop can sleep precisely instead of busy-polling.
    pub fn next_wake(&self) -> Option<Duration> {
        let mut candidates: Vec<Duration> = Vec::new();
        if let Some(d) = self.term_deadline {
            candidates.push(d);
        }
        if self.state == SessionState::Active {
            candidates.push(self.liveness_deadline);
            candidates.push(self.local_heartbeat_deadline);
        }
        for n in self.neighbors.values() {
            if let Some(d) = n.ack_deadline {
                candidates.push(d);
            }
        }
        candidates.into_iter().min()
    }
}

fn require_key(key: Option<NeighborKey>) -> Result<NeighborKey, SessionError> {
    key.ok_or(SessionError::Protocol(dlep_proto::Error::MissingMandatoryTlv(
        tlv::MAC_ADDRESS,
    )))
}

/// Convenience accessor used by metric extensions: fetches a neighbor's
/// L2DB row, if the destination has been created.
pub fn neighbor_row(session: &Session, key: &NeighborKey) -> Option<NeighId> {
    session.neighbor(key).and_then(|n| n.row)
}
