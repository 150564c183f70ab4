//! End-to-end scenarios from spec.md §8, run against an in-process pair of
//! `dlep_session::Session`s wired directly byte-for-byte (no real socket,
//! no real clock — `Session` only ever sees a caller-supplied `Duration`).
//! This is the "discovery→init→destination→heartbeat→terminate" coverage
//! SPEC_FULL.md's ambient-stack section calls for.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dlep_proto::ids::extension;
use dlep_session::{DestState, Field, L2Db, L2Value, NeighborKey, Session, SessionConfig, SessionState};

use dlep::MemoryL2Db;

fn new_l2db() -> Rc<RefCell<dyn L2Db>> {
    Rc::new(RefCell::new(MemoryL2Db::new()))
}

fn bare_config() -> SessionConfig {
    SessionConfig {
        extensions: vec![],
        ..SessionConfig::default()
    }
}

fn lid_config() -> SessionConfig {
    SessionConfig {
        extensions: vec![extension::LINK_ID],
        ..SessionConfig::default()
    }
}

/// Feeds `bytes` into `dst` and returns whatever `dst` queued in response.
fn relay(dst: &mut Session, bytes: &[u8], now: Duration) -> Vec<u8> {
    let consumed = dst.feed(bytes, now);
    assert_eq!(consumed, bytes.len(), "session should consume the whole relayed signal");
    dst.take_outbox()
}

/// Drives the Peer Initialization / Initialization Ack handshake (§4.5,
/// scenario S2) between a freshly created router and radio session pair,
/// asserting both land in `Active` with the same negotiated extension set.
fn handshake(router: &mut Session, radio: &mut Session, now: Duration) {
    let init = router.take_outbox();
    assert!(!init.is_empty(), "create_router must queue Peer Initialization immediately");

    let init_ack = relay(radio, &init, now);
    assert_eq!(radio.state(), SessionState::Active);
    assert!(!init_ack.is_empty(), "Peer Initialization Ack must be queued in reply");

    let trailing = relay(router, &init_ack, now);
    assert_eq!(router.state(), SessionState::Active);
    assert!(trailing.is_empty(), "Peer Initialization Ack carries no reply of its own");
}

#[test]
fn s2_initialization_exchange_activates_both_sides() {
    let router_l2db = new_l2db();
    let radio_l2db = new_l2db();

    let mut router = Session::create_router("wlan0", bare_config(), router_l2db, Duration::ZERO);
    let mut radio = Session::create_radio("wlan0", bare_config(), radio_l2db, Duration::ZERO);

    assert_eq!(router.state(), SessionState::WaitingForInitAck);
    assert_eq!(radio.state(), SessionState::WaitingForInit);

    handshake(&mut router, &mut radio, Duration::ZERO);
}

#[test]
fn s3_destination_up_with_link_id_creates_l2db_row_and_replies_with_ack() {
    let router_l2db = new_l2db();
    let radio_l2db = new_l2db();

    let mut router = Session::create_router("wlan0", lid_config(), router_l2db.clone(), Duration::ZERO);
    let mut radio = Session::create_radio("wlan0", lid_config(), radio_l2db, Duration::ZERO);
    handshake(&mut router, &mut radio, Duration::ZERO);

    let key = NeighborKey::with_link_id([0x02, 0, 0, 0, 0, 1, 0, 0], b"ABC".to_vec());
    radio.neighbor_up(key.clone(), Duration::from_secs(1));
    assert_eq!(radio.neighbor(&key).unwrap().state, DestState::UpSent);

    let up = radio.take_outbox();
    assert!(!up.is_empty());

    let up_ack = relay(&mut router, &up, Duration::from_secs(1));
    assert!(!up_ack.is_empty(), "Destination Up Ack must be queued");

    router
        .l2db()
        .borrow()
        .neigh_get(router.net(), &key)
        .expect("router L2DB must have the neighbor row under this session's origin");

    let trailing = relay(&mut radio, &up_ack, Duration::from_secs(1));
    assert!(trailing.is_empty(), "Destination Up Ack carries no reply of its own");
    assert_eq!(radio.neighbor(&key).unwrap().state, DestState::UpAcked);
}

#[test]
fn s5_ip_add_then_remove_round_trips_through_peer_update() {
    let router_l2db = new_l2db();
    let radio_l2db = new_l2db();

    let mut ip_cfg = SessionConfig::default();
    ip_cfg.extensions = vec![extension::IP];
    let mut router = Session::create_router("wlan0", ip_cfg.clone(), router_l2db, Duration::ZERO);
    let mut radio = Session::create_radio("wlan0", ip_cfg, radio_l2db, Duration::ZERO);
    handshake(&mut router, &mut radio, Duration::ZERO);

    let prefix = dlep_session::IpPrefix::host("192.0.2.5".parse().unwrap());
    radio.queue_interface_ip_change(prefix, true);
    radio.generate(dlep_proto::ids::signal::PEER_UPDATE, None);

    let update = radio.take_outbox();
    assert!(!update.is_empty());
    let update_ack = relay(&mut router, &update, Duration::ZERO);
    assert!(!update_ack.is_empty());

    let addrs = router.l2db().borrow().net_addrs(router.net());
    assert_eq!(addrs, vec![prefix]);

    radio.queue_interface_ip_change(prefix, false);
    radio.generate(dlep_proto::ids::signal::PEER_UPDATE, None);
    let update2 = radio.take_outbox();
    relay(&mut router, &update2, Duration::ZERO);

    let addrs_after_remove = router.l2db().borrow().net_addrs(router.net());
    assert!(addrs_after_remove.is_empty());
}

#[test]
fn s4_heartbeat_liveness_timeout_terminates_and_withdraws_origin() {
    let router_l2db = new_l2db();
    let radio_l2db = new_l2db();

    let mut router = Session::create_router("wlan0", bare_config(), router_l2db, Duration::ZERO);
    let mut radio = Session::create_radio("wlan0", bare_config(), radio_l2db.clone(), Duration::ZERO);
    handshake(&mut router, &mut radio, Duration::ZERO);

    let origin = radio.origin();
    radio_l2db.borrow_mut().net_data_set(radio.net(), Field::Mdrr, origin, L2Value::U64(42));
    assert!(radio_l2db.borrow().net_data_get(radio.net(), Field::Mdrr).is_some());

    // No inbound signal for 2x remote_heartbeat_interval (default 1s) ->
    // exactly one Peer Termination queued, session moves to
    // WaitingForTerminationAck (§3 I4, §4.4, Property P9).
    let event = radio.poll_timers(Duration::from_millis(2100));
    assert_eq!(event, dlep_session::Event::LivenessTimeout);
    assert_eq!(radio.state(), SessionState::WaitingForTerminationAck);

    let term = radio.take_outbox();
    assert!(!term.is_empty());

    // Peer never Acks; past the ACK timeout the session force-destroys and
    // withdraws its L2DB origin (Property P7).
    let event = radio.poll_timers(Duration::from_millis(2100) + radio.cfg().ack_timeout + Duration::from_millis(1));
    assert_eq!(event, dlep_session::Event::Destroyed);
    assert!(radio.is_destroyed());
    assert!(radio_l2db.borrow().net_data_get(radio.net(), Field::Mdrr).is_none());
}

#[test]
fn terminate_handshake_destroys_both_sides() {
    let router_l2db = new_l2db();
    let radio_l2db = new_l2db();

    let mut router = Session::create_router("wlan0", bare_config(), router_l2db, Duration::ZERO);
    let mut radio = Session::create_radio("wlan0", bare_config(), radio_l2db, Duration::ZERO);
    handshake(&mut router, &mut radio, Duration::ZERO);

    router.terminate(Duration::ZERO);
    assert_eq!(router.state(), SessionState::WaitingForTerminationAck);

    let term = router.take_outbox();
    let term_ack = relay(&mut radio, &term, Duration::ZERO);
    assert!(radio.is_destroyed());

    let trailing = relay(&mut router, &term_ack, Duration::ZERO);
    assert!(trailing.is_empty());
    assert!(router.is_destroyed());
}
