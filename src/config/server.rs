use serde::{Deserialize, Serialize};

pub const DEFAULT_SOCKET_PORT: u16 = 1337;
pub const DEFAULT_HTTP_PORT: u16 = 4242;
const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Socket,
    Http,
}

impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Socket
    }
}

/// The `{type, host, port}` server block from configuration. See
/// SPEC_FULL.md §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "type", default)]
    pub kind: TransportKind,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: Option<u16>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            host: default_host(),
            port: None,
        }
    }
}

impl ServerConfig {
    /// The effective port: whatever was configured, or the transport's
    /// documented default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.kind {
            TransportKind::Socket => DEFAULT_SOCKET_PORT,
            TransportKind::Http => DEFAULT_HTTP_PORT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_per_transport() {
        let socket = ServerConfig {
            kind: TransportKind::Socket,
            host: default_host(),
            port: None,
        };
        assert_eq!(DEFAULT_SOCKET_PORT, socket.effective_port());

        let http = ServerConfig {
            kind: TransportKind::Http,
            host: default_host(),
            port: None,
        };
        assert_eq!(DEFAULT_HTTP_PORT, http.effective_port());
    }

    #[test]
    fn explicit_port_wins() {
        let cfg = ServerConfig {
            kind: TransportKind::Socket,
            host: default_host(),
            port: Some(9999),
        };
        assert_eq!(9999, cfg.effective_port());
    }
}
