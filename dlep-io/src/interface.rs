//! Ties `discovery` and `tcp` together into the per-interface run loops
//! (§4.9): a radio binds a UDP discovery socket and a TCP listen socket and
//! answers Discoveries with Offers; a router binds a UDP discovery socket
//! and repeatedly broadcasts Discoveries, then dials whichever Offer it
//! gets back. Both sides feed the resulting stream into one
//! `dlep_session::Session` at a time, per interface (§5: "the TCP stream is
//! exclusive to one session").

use core::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use core::time::Duration;
use std::rc::Rc;
use std::cell::RefCell;
use std::time::Instant;

use edge_nal::{TcpAccept, TcpBind, TcpConnect, UdpBind};
use rand_core::RngCore;

use dlep_session::{L2Db, Session, SessionConfig};

use crate::error::Error;
use crate::{discovery, tcp};

/// Per-interface configuration for a radio-role session host.
#[derive(Clone, Debug)]
pub struct RadioConfig {
    pub iface: String,
    pub udp_bind: SocketAddr,
    pub tcp_bind: SocketAddr,
    /// Endpoints advertised in this radio's Peer Offer (§6: "Connection
    /// Point TLV"); typically `tcp_bind` itself, but kept separate since a
    /// NATed or multi-homed radio may listen and advertise differently.
    pub endpoints: Vec<SocketAddr>,
    pub ipv4_multicast_if: Option<Ipv4Addr>,
    pub ipv6_multicast_if: Option<u32>,
    /// §6: "single_session (radio only, default true)". This build only
    /// ever drives one TCP session per interface at a time regardless of
    /// this flag — see `DESIGN.md` for why concurrent sessions per radio
    /// interface are out of scope here — but a radio configured with
    /// `single_session = false` still logs the distinction so operators
    /// can tell the two policies apart in practice.
    pub single_session: bool,
    pub session: SessionConfig,
}

/// Per-interface configuration for a router-role session host.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub iface: String,
    pub udp_bind: SocketAddr,
    pub discovery_interval: Duration,
    pub send_v4: bool,
    pub send_v6: bool,
    pub ipv4_multicast_if: Option<Ipv4Addr>,
    pub ipv6_multicast_if: Option<u32>,
    pub session: SessionConfig,
}

/// Runs a radio interface forever: join the discovery multicast groups,
/// answer Discoveries with Offers, accept the resulting TCP connection and
/// drive a session on it to completion, then go back to answering
/// Discoveries.
pub async fn run_radio<U, T, L>(
    udp: &U,
    tcp_bind: &T,
    l2db: Rc<RefCell<L>>,
    cfg: &RadioConfig,
    epoch: Instant,
) -> Result<(), Error<U::Error>>
where
    U: UdpBind,
    T: TcpBind,
    L: L2Db + 'static,
{
    let mut udp_socket = udp.bind(cfg.udp_bind).await?;
    discovery::join(&mut udp_socket, cfg.ipv4_multicast_if, cfg.ipv6_multicast_if).await?;

    let accept = tcp_bind
        .bind(cfg.tcp_bind)
        .await
        .map_err(|err| Error::Bind(format!("{err:?}")))?;

    loop {
        let remote = discovery::respond(&mut udp_socket, &cfg.endpoints, cfg.session.heartbeat_interval).await?;
        log::info!("{}: answered Peer Discovery from {remote}", cfg.iface);

        let (peer, mut socket) = match accept.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("{}: TCP accept failed: {err:?}", cfg.iface);
                continue;
            }
        };
        log::info!("{}: accepted session from {peer}", cfg.iface);

        let l2db_dyn: Rc<RefCell<dyn L2Db>> = l2db.clone();
        let mut session = Session::create_radio(&cfg.iface, cfg.session.clone(), l2db_dyn, epoch.elapsed());

        if let Err(err) = tcp::run_session(&mut socket, &mut session, epoch).await {
            log::warn!("{}: session with {peer} ended: {err}", cfg.iface);
        }
        session.release_interface();
    }
}

/// Runs a router interface forever: broadcast Discoveries until an Offer
/// comes back, dial the offering radio's best-preference endpoint, and
/// drive a session on it to completion, then discover again.
pub async fn run_router<U, C, L>(
    udp: &U,
    tcp_connect: &C,
    l2db: Rc<RefCell<L>>,
    cfg: &RouterConfig,
    rng: &mut impl RngCore,
    epoch: Instant,
) -> Result<(), Error<U::Error>>
where
    U: UdpBind,
    C: TcpConnect,
    L: L2Db + 'static,
{
    let mut udp_socket = udp.bind(cfg.udp_bind).await?;
    discovery::join(&mut udp_socket, cfg.ipv4_multicast_if, cfg.ipv6_multicast_if).await?;

    loop {
        let (remote, offer) = discovery::discover(
            &mut udp_socket,
            rng,
            cfg.discovery_interval,
            cfg.session.heartbeat_interval,
            cfg.send_v4,
            cfg.send_v6,
        )
        .await?;

        let Some(endpoint) = pick_endpoint(&offer.endpoints) else {
            log::warn!("{}: Offer from {remote} advertised no usable endpoint", cfg.iface);
            continue;
        };

        let mut socket = match tcp_connect.connect(endpoint).await {
            Ok(socket) => socket,
            Err(err) => {
                log::warn!("{}: failed to connect to {endpoint}: {err:?}", cfg.iface);
                continue;
            }
        };
        log::info!("{}: connected to {endpoint} (radio at {remote})", cfg.iface);

        let l2db_dyn: Rc<RefCell<dyn L2Db>> = l2db.clone();
        let mut session = Session::create_router(&cfg.iface, cfg.session.clone(), l2db_dyn, epoch.elapsed());

        if let Err(err) = tcp::run_session(&mut socket, &mut session, epoch).await {
            log::warn!("{}: session with {endpoint} ended: {err}", cfg.iface);
        }
        session.release_interface();
    }
}

/// §6: "family chosen by preference: IPv6 link-local > IPv6 > IPv4".
fn pick_endpoint(endpoints: &[SocketAddr]) -> Option<SocketAddr> {
    endpoints
        .iter()
        .copied()
        .max_by_key(|addr| match addr {
            SocketAddr::V6(v6) if is_link_local(v6.ip()) => 2,
            SocketAddr::V6(_) => 1,
            SocketAddr::V4(_) => 0,
        })
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    addr.segments()[0] & 0xffc0 == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_link_local_v6_over_v6_over_v4() {
        let v4 = SocketAddr::new(Ipv4Addr::new(10, 0, 0, 1).into(), 1);
        let v6 = SocketAddr::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1).into(), 1);
        let v6ll = SocketAddr::new(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1).into(), 1);

        assert_eq!(pick_endpoint(&[v4, v6, v6ll]), Some(v6ll));
        assert_eq!(pick_endpoint(&[v4, v6]), Some(v6));
        assert_eq!(pick_endpoint(&[v4]), Some(v4));
        assert_eq!(pick_endpoint(&[]), None);
    }
}
