use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Participant list read once at startup
    pub participants_path: PathBuf,
    /// How often connected clients receive the server clock
    pub clock_interval: Duration,
    /// Events buffered per client before a slow one starts missing them
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5000,
            participants_path: PathBuf::from("participants.txt"),
            clock_interval: Duration::from_millis(1000),
            broadcast_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                Ok(_) => tracing::warn!("PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Some(path) = lookup("PARTICIPANTS_PATH") {
            config.participants_path = PathBuf::from(path);
        }

        if let Some(ms) = lookup("CLOCK_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.clock_interval = Duration::from_millis(parsed),
                _ => tracing::warn!("Invalid CLOCK_INTERVAL_MS '{}', using default", ms),
            }
        }

        if let Some(capacity) = lookup("BROADCAST_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) if parsed > 0 => config.broadcast_capacity = parsed,
                _ => tracing::warn!("Invalid BROADCAST_CAPACITY '{}', using default", capacity),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.clock_interval.is_zero() {
            return Err("clock_interval must be positive".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be at least 1".to_string());
        }
        if self.participants_path.as_os_str().is_empty() {
            return Err("participants_path cannot be empty".to_string());
        }
        Ok(())
    }
}
