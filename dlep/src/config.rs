//! Daemon configuration (§6 "Configuration keys"): one `InterfaceConfig` per
//! interface the daemon manages, loaded from a small TOML file with
//! `serde`/`toml`, the way `other_examples/`'s daemon config modules do
//! (e.g. `Masorubka1-iscsi-client-rs`'s `cfg::Config`).

use std::time::Duration;

use dlep_session::SessionConfig;
use serde::{Deserialize, Serialize};

fn default_heartbeat_secs() -> u64 {
    1
}

fn default_discovery_secs() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

/// One radio or router interface this daemon drives (§6's per-interface
/// configuration keys).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Interface name, also used as the L2DB network name unless
    /// `datapath_if` overrides it.
    pub name: String,
    /// `"radio"` or `"router"` — which side of the handshake this
    /// interface plays.
    pub role: Role,
    /// Local address the UDP discovery socket binds to.
    pub udp_bind: String,
    /// Local address the TCP listener binds to (radio) or the address the
    /// TCP client connects from (router, informational only — the actual
    /// connect target comes from the peer's Offer).
    pub tcp_bind: String,
    /// Router only: how often to re-send Peer Discovery while waiting for
    /// an Offer. Default 1s (§6).
    #[serde(default = "default_discovery_secs")]
    pub discovery_interval_secs: u64,
    /// Default 1s, clamped to [1, 65535]s (§6).
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
    /// Optional Peer Type string advertised in Peer Initialization/Ack.
    #[serde(default)]
    pub peer_type: Option<String>,
    /// Radio only, default true (§6): whether this interface serializes
    /// sessions one at a time. See `dlep_io::interface::RadioConfig` for
    /// how this build honors the flag.
    #[serde(default = "default_true")]
    pub single_session: bool,
    /// Overrides the L2DB network name; defaults to `name` (§6).
    #[serde(default)]
    pub datapath_if: Option<String>,
    /// Non-base extension ids this side is willing to negotiate (§4.3).
    /// Empty means "use the engine's default set"
    /// (`SessionConfig::default().extensions`).
    #[serde(default)]
    pub extensions: Vec<i32>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Radio,
    Router,
}

impl InterfaceConfig {
    /// The L2DB network name this interface's sessions write to.
    pub fn datapath_name(&self) -> &str {
        self.datapath_if.as_deref().unwrap_or(&self.name)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.clamp(1, 65535))
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs.max(1))
    }

    /// Builds the `dlep-session` side's configuration from this interface's
    /// settings, falling back to the engine's defaults for anything this
    /// config doesn't override.
    pub fn session_config(&self) -> SessionConfig {
        let mut cfg = SessionConfig {
            peer_type: self.peer_type.clone(),
            heartbeat_interval: self.heartbeat_interval(),
            ..SessionConfig::default()
        };
        if !self.extensions.is_empty() {
            cfg.extensions = self.extensions.clone();
        }
        cfg.clamp_heartbeat();
        cfg
    }
}

/// Top-level daemon configuration: one or more interfaces, loaded from a
/// TOML file (`[[interface]]` tables) or built programmatically.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "interface", default)]
    pub interfaces: Vec<InterfaceConfig>,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config {
            interfaces: vec![InterfaceConfig {
                name: "wlan0".into(),
                role: Role::Radio,
                udp_bind: "0.0.0.0:22222".into(),
                tcp_bind: "0.0.0.0:22223".into(),
                discovery_interval_secs: 1,
                heartbeat_interval_secs: 2,
                peer_type: Some("radio-1".into()),
                single_session: true,
                datapath_if: None,
                extensions: vec![],
            }],
        };

        let toml = cfg.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&toml).unwrap();
        assert_eq!(parsed.interfaces.len(), 1);
        assert_eq!(parsed.interfaces[0].name, "wlan0");
        assert_eq!(parsed.interfaces[0].heartbeat_interval_secs, 2);
    }

    #[test]
    fn heartbeat_clamps_into_range() {
        let mut iface = InterfaceConfig {
            name: "wlan0".into(),
            role: Role::Router,
            udp_bind: "0.0.0.0:0".into(),
            tcp_bind: "0.0.0.0:0".into(),
            discovery_interval_secs: 1,
            heartbeat_interval_secs: 0,
            peer_type: None,
            single_session: true,
            datapath_if: None,
            extensions: vec![],
        };
        assert_eq!(iface.heartbeat_interval(), Duration::from_secs(1));
        iface.heartbeat_interval_secs = 100_000;
        assert_eq!(iface.heartbeat_interval(), Duration::from_secs(65535));
    }
}
