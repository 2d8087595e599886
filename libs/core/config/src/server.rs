use crate::{ConfigError, FromEnv, env_or_default, env_parse};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Listen address of the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// `host:port`, as handed to `TcpListener::bind`
    pub fn address(&self) -> String {
        self.socket_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }

    /// Parsed address, or `None` when `host` is a name rather than an IP literal
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl FromEnv for ServerConfig {
    /// `HOST` (default `0.0.0.0`) must be an IP literal; `PORT` defaults to 8080.
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        host.parse::<IpAddr>()
            .map_err(|e| ConfigError::ParseError {
                key: "HOST".to_string(),
                details: e.to_string(),
            })?;
        let port = env_parse("PORT", "8080")?;

        Ok(Self { host, port })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
        }
    }
}
