use std::net::Ipv4Addr;

/// Per-instance configuration. Bootstrap routers are hard-coded: they are
/// protocol constants, not deployment-specific knobs.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_ip: Ipv4Addr,
    pub bind_port: u16,
    pub max_node_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_ip: Ipv4Addr::UNSPECIFIED,
            bind_port: 6881,
            max_node_size: 500,
        }
    }
}

impl Config {
    /// Reads overrides from the environment, falling back to the built-in
    /// defaults (`0.0.0.0:6881`, 500-node pool) for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(ip) = std::env::var("MDHT_BIND_IP") {
            if let Ok(parsed) = ip.parse() {
                config.bind_ip = parsed;
            }
        }
        if let Ok(port) = std::env::var("MDHT_BIND_PORT") {
            if let Ok(parsed) = port.parse() {
                config.bind_port = parsed;
            }
        }
        if let Ok(size) = std::env::var("MDHT_MAX_NODE_SIZE") {
            if let Ok(parsed) = size.parse() {
                config.max_node_size = parsed;
            }
        }

        config
    }
}

pub const BOOTSTRAP_ROUTERS: &[(&str, u16)] = &[
    ("router.utorrent.com", 6881),
    ("router.bittorrent.com", 6881),
    ("dht.transmissionbt.com", 6881),
];
