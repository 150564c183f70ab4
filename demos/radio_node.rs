//! Runs a single DLEP radio interface that answers Discovery with Offer,
//! accepts one router connection at a time and serves it forever.
//!
//! NOTE: binds `0.0.0.0:854`/`:854` by default (IANA-assigned DLEP ports);
//! run two copies on different loopback addresses to see a router and a
//! radio talk to each other without real radio hardware.

use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::Instant;

use dlep::MemoryL2Db;
use dlep_io::interface::{self, RadioConfig};
use dlep_session::SessionConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run())
}

async fn run() -> anyhow::Result<()> {
    let stack = edge_nal_std::Stack::new();
    let l2db = Rc::new(RefCell::new(MemoryL2Db::new()));

    let bind: SocketAddr = "0.0.0.0:854".parse()?;
    let cfg = RadioConfig {
        iface: "demo0".to_string(),
        udp_bind: bind,
        tcp_bind: bind,
        endpoints: vec![bind],
        ipv4_multicast_if: Some(Ipv4Addr::UNSPECIFIED),
        ipv6_multicast_if: Some(0),
        single_session: true,
        session: SessionConfig::default(),
    };

    interface::run_radio(&stack, &stack, l2db, &cfg, Instant::now())
        .await
        .map_err(|err| anyhow::anyhow!("radio interface loop exited: {err}"))
}
