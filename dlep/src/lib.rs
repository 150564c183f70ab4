//! Reference configuration, in-memory L2DB and daemon entry point wiring
//! `dlep-proto`/`dlep-session`/`dlep-io` into a runnable process (§6).
//!
//! This crate is new relative to the teacher (`ivmarkov/edge-net` ships no
//! combining daemon crate of its own); see `DESIGN.md` for what each piece
//! is grounded on.

pub mod config;
pub mod l2db;

use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::Instant;

use dlep_io::{interface, RadioConfig, RouterConfig};
use edge_nal_std::Stack;
use rand::rngs::OsRng;

pub use config::{Config, InterfaceConfig, Role};
pub use l2db::MemoryL2Db;

/// Runs every interface in `cfg` concurrently until one of them returns an
/// error, sharing one `MemoryL2Db` across all of them the way a single
/// routing daemon process shares one layer-2 database across interfaces
/// (§5: "the L2DB, which is also single-threaded").
///
/// Each interface gets its own `tokio::task::LocalSet`-friendly future;
/// the caller is expected to run this inside a `#[tokio::main(flavor =
/// "current_thread")]` or spawn it onto a `LocalSet`, since `Session`
/// holds `Rc<RefCell<_>>` internally (§5: single-threaded cooperative
/// event loop, no cross-session shared mutable state except the L2DB).
pub async fn run_daemon(cfg: Config) -> anyhow::Result<()> {
    let l2db = Rc::new(RefCell::new(MemoryL2Db::new()));
    let epoch = Instant::now();

    let mut tasks = Vec::new();
    for iface in &cfg.interfaces {
        let l2db = l2db.clone();
        let stack = Stack::new();
        match iface.role {
            Role::Radio => {
                let radio_cfg = radio_config(iface)?;
                tasks.push(tokio::task::spawn_local(async move {
                    if let Err(err) = interface::run_radio(&stack, &stack, l2db, &radio_cfg, epoch).await {
                        log::error!("{}: radio interface loop exited: {err}", radio_cfg.iface);
                    }
                }));
            }
            Role::Router => {
                let router_cfg = router_config(iface)?;
                tasks.push(tokio::task::spawn_local(async move {
                    let mut rng = OsRng;
                    if let Err(err) = interface::run_router(&stack, &stack, l2db, &router_cfg, &mut rng, epoch).await
                    {
                        log::error!("{}: router interface loop exited: {err}", router_cfg.iface);
                    }
                }));
            }
        }
    }

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}

fn radio_config(iface: &InterfaceConfig) -> anyhow::Result<RadioConfig> {
    let udp_bind: SocketAddr = iface.udp_bind.parse()?;
    let tcp_bind: SocketAddr = iface.tcp_bind.parse()?;
    Ok(RadioConfig {
        iface: iface.name.clone(),
        udp_bind,
        tcp_bind,
        endpoints: vec![tcp_bind],
        ipv4_multicast_if: Some(Ipv4Addr::UNSPECIFIED),
        ipv6_multicast_if: Some(0),
        single_session: iface.single_session,
        session: iface.session_config(),
    })
}

fn router_config(iface: &InterfaceConfig) -> anyhow::Result<RouterConfig> {
    let udp_bind: SocketAddr = iface.udp_bind.parse()?;
    Ok(RouterConfig {
        iface: iface.name.clone(),
        udp_bind,
        discovery_interval: iface.discovery_interval(),
        send_v4: udp_bind.is_ipv4(),
        send_v6: udp_bind.is_ipv6(),
        ipv4_multicast_if: Some(Ipv4Addr::UNSPECIFIED),
        ipv6_multicast_if: Some(0),
        session: iface.session_config(),
    })
}
