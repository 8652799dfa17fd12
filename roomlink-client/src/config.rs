use roomlink_core::IceServerConfig;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// ICE settings for the webrtc-rs engine.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}

/// Channel sizing for the orchestrator actor.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub command_capacity: usize,
    pub session_event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command_capacity: 256,
            session_event_capacity: 256,
        }
    }
}
