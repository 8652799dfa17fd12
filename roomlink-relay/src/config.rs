use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_RELAY_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_RELAY_PORT)),
        }
    }
}
