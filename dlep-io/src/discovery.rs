//! UDP discovery/offer handshake (§6 "UDP discovery"): the magic-prefixed
//! datagram exchange that precedes any TCP session. Neither signal (Peer
//! Discovery, Peer Offer) is handled by `dlep_session::Session` — they're
//! pre-session and this crate owns them entirely, the way `edge_mdns::io`
//! owns its own broadcast/query exchange rather than handing raw datagrams
//! to some shared "DNS session" type.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::Duration;

use edge_nal::{MulticastV4, MulticastV6, UdpReceive, UdpSend};
use rand_core::RngCore;

use dlep_proto::codec::Writer;
use dlep_proto::ids::{signal, tlv};
use dlep_proto::parser::{parse, TlvRegistry};

/// DLEP's default discovery/offer port (§6).
pub const PORT: u16 = 22222;
/// IPv4 discovery multicast group (§6).
pub const IPV4_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 109);
/// IPv6 discovery multicast group (§6).
pub const IPV6_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x6d);

const MAGIC: &[u8; 4] = b"DLEP";

/// A Peer Discovery datagram's payload, decoded.
#[derive(Clone, Debug)]
pub struct Discovery {
    pub heartbeat_interval: Duration,
}

/// A Peer Offer datagram's payload, decoded.
#[derive(Clone, Debug)]
pub struct Offer {
    pub heartbeat_interval: Duration,
    pub endpoints: Vec<SocketAddr>,
}

fn registry() -> TlvRegistry {
    let mut reg = TlvRegistry::new();
    for id in [
        tlv::HEARTBEAT_INTERVAL,
        tlv::PEER_TYPE,
        tlv::IPV4_CONPOINT,
        tlv::IPV6_CONPOINT,
    ] {
        if let Some(bounds) = dlep_proto::tlv::bounds_for(id) {
            let _ = reg.insert(id, bounds);
        }
    }
    reg
}

/// Joins this socket to whichever discovery multicast groups are
/// requested, mirroring `edge_mdns::io::bind`'s optional-v4/optional-v6
/// join pattern.
pub async fn join<S>(
    socket: &mut S,
    ipv4_if: Option<Ipv4Addr>,
    ipv6_if: Option<u32>,
) -> Result<(), S::Error>
where
    S: MulticastV4<Error = <S as MulticastV6>::Error> + MulticastV6,
{
    if let Some(v4) = ipv4_if {
        socket.join_v4(IPV4_GROUP, v4).await?;
    }
    if let Some(v6) = ipv6_if {
        socket.join_v6(IPV6_GROUP, v6).await?;
    }
    Ok(())
}

fn frame(writer: &mut Writer) -> Vec<u8> {
    let framed = writer.finish_signal();
    let mut out = Vec::with_capacity(MAGIC.len() + framed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(framed);
    out
}

fn encode_discovery(writer: &mut Writer, heartbeat: Duration) -> Vec<u8> {
    writer.start_signal(signal::PEER_DISCOVERY);
    writer.add_u16(tlv::HEARTBEAT_INTERVAL, clamp_secs(heartbeat));
    frame(writer)
}

fn encode_offer(writer: &mut Writer, heartbeat: Duration, endpoints: &[SocketAddr]) -> Vec<u8> {
    writer.start_signal(signal::PEER_OFFER);
    writer.add_u16(tlv::HEARTBEAT_INTERVAL, clamp_secs(heartbeat));
    for ep in endpoints {
        match ep {
            SocketAddr::V4(_) => writer.add_conpoint(tlv::IPV4_CONPOINT, *ep),
            SocketAddr::V6(_) => writer.add_conpoint(tlv::IPV6_CONPOINT, *ep),
        }
    }
    frame(writer)
}

fn clamp_secs(d: Duration) -> u16 {
    d.as_secs().clamp(1, 65535) as u16
}

fn strip_magic(buf: &[u8]) -> Option<&[u8]> {
    buf.strip_prefix(MAGIC.as_slice())
}

fn decode_discovery(buf: &[u8]) -> Option<Discovery> {
    let body = strip_magic(buf)?;
    let reg = registry();
    let (parsed, _) = parse(body, &reg, &[tlv::HEARTBEAT_INTERVAL]).ok()?;
    if parsed.signal_id != signal::PEER_DISCOVERY {
        return None;
    }
    let hb = parsed.first_value_of(tlv::HEARTBEAT_INTERVAL)?;
    let secs = dlep_proto::codec::read_unsigned(hb.value()).ok()?;
    Some(Discovery {
        heartbeat_interval: Duration::from_secs(secs),
    })
}

fn decode_offer(buf: &[u8]) -> Option<Offer> {
    let body = strip_magic(buf)?;
    let reg = registry();
    let (parsed, _) = parse(body, &reg, &[tlv::HEARTBEAT_INTERVAL]).ok()?;
    if parsed.signal_id != signal::PEER_OFFER {
        return None;
    }
    let hb = parsed.first_value_of(tlv::HEARTBEAT_INTERVAL)?;
    let secs = dlep_proto::codec::read_unsigned(hb.value()).ok()?;

    let mut endpoints = Vec::new();
    for occ in parsed.values_of(tlv::IPV4_CONPOINT) {
        if let Ok((addr, port)) = dlep_proto::codec::read_conpoint_v4(occ.value()) {
            endpoints.push(SocketAddr::V4(SocketAddrV4::new(addr, port.unwrap_or(0))));
        }
    }
    for occ in parsed.values_of(tlv::IPV6_CONPOINT) {
        if let Ok((addr, port)) = dlep_proto::codec::read_conpoint_v6(occ.value()) {
            endpoints.push(SocketAddr::V6(SocketAddrV6::new(addr, port.unwrap_or(0), 0, 0)));
        }
    }

    Some(Offer {
        heartbeat_interval: Duration::from_secs(secs),
        endpoints,
    })
}

/// Random 20-120ms delay scaled to `interval`, jittering the first
/// discovery send so many interfaces activating together don't burst in
/// sync. Supplemented feature grounded on `edge_mdns::io::Mdns::delay`.
async fn jitter(rng: &mut impl RngCore, interval: Duration) {
    let span_ms = (interval.as_millis() as u64 / 10).clamp(1, 100);
    let delay_ms = 20 + rng.next_u32() as u64 % span_ms;
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

/// Router-side: broadcasts Peer Discovery to both multicast groups at
/// `interval` until an Offer is received, returning the offering radio's
/// socket address and its advertised endpoints.
pub async fn discover<S>(
    socket: &mut S,
    rng: &mut impl RngCore,
    interval: Duration,
    heartbeat: Duration,
    send_v4: bool,
    send_v6: bool,
) -> Result<(SocketAddr, Offer), S::Error>
where
    S: UdpSend + UdpReceive,
{
    let mut writer = Writer::new();
    let mut buf = [0u8; 512];

    jitter(rng, interval).await;

    loop {
        let datagram = encode_discovery(&mut writer, heartbeat);

        if send_v4 {
            if let Err(err) = socket
                .send(SocketAddr::V4(SocketAddrV4::new(IPV4_GROUP, PORT)), &datagram)
                .await
            {
                log::warn!("failed to send IPv4 Peer Discovery: {err:?}");
            }
        }
        if send_v6 {
            if let Err(err) = socket
                .send(SocketAddr::V6(SocketAddrV6::new(IPV6_GROUP, PORT, 0, 0)), &datagram)
                .await
            {
                log::warn!("failed to send IPv6 Peer Discovery: {err:?}");
            }
        }

        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        tokio::select! {
            res = socket.receive(&mut buf) => {
                let (len, remote) = res?;
                if let Some(offer) = decode_offer(&buf[..len]) {
                    log::debug!("Peer Offer from {remote}: {offer:?}");
                    return Ok((remote, offer));
                }
            }
            _ = &mut sleep => {}
        }
    }
}

/// Radio-side: waits for a Peer Discovery datagram and replies unicast
/// with a Peer Offer advertising `endpoints` (the radio's TCP listen
/// address(es)).
pub async fn respond<S>(
    socket: &mut S,
    endpoints: &[SocketAddr],
    heartbeat: Duration,
) -> Result<SocketAddr, S::Error>
where
    S: UdpSend + UdpReceive,
{
    let mut writer = Writer::new();
    let mut buf = [0u8; 512];

    loop {
        let (len, remote) = socket.receive(&mut buf).await?;

        if let Some(discovery) = decode_discovery(&buf[..len]) {
            log::debug!("Peer Discovery from {remote}: {discovery:?}");
            let datagram = encode_offer(&mut writer, heartbeat, endpoints);
            socket.send(remote, &datagram).await?;
            return Ok(remote);
        }
    }
}
