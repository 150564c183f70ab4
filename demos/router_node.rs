//! Runs a single DLEP router interface that sends Discovery on multicast,
//! connects to the first radio to Offer, and drives a session against it.
//! Pair with `radio_node` to see the full handshake on loopback.

use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use dlep::MemoryL2Db;
use dlep_io::interface::{self, RouterConfig};
use dlep_session::SessionConfig;
use rand::rngs::OsRng;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run())
}

async fn run() -> anyhow::Result<()> {
    let stack = edge_nal_std::Stack::new();
    let l2db = Rc::new(RefCell::new(MemoryL2Db::new()));
    let mut rng = OsRng;

    let bind: SocketAddr = "0.0.0.0:0".parse()?;
    let cfg = RouterConfig {
        iface: "demo0".to_string(),
        udp_bind: bind,
        discovery_interval: Duration::from_secs(5),
        send_v4: true,
        send_v6: false,
        ipv4_multicast_if: Some(Ipv4Addr::UNSPECIFIED),
        ipv6_multicast_if: Some(0),
        session: SessionConfig::default(),
    };

    interface::run_router(&stack, &stack, l2db, &cfg, &mut rng, Instant::now())
        .await
        .map_err(|err| anyhow::anyhow!("router interface loop exited: {err}"))
}
