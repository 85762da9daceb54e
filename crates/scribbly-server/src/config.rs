//! Environment-based configuration.

use std::env;

/// Relay server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-room broadcast buffer. Slow peers that fall further behind than
    /// this lose messages.
    pub room_channel_capacity: usize,
    pub log_filter: String,
}

impl ServerConfig {
    /// Load settings from the environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3030),
            room_channel_capacity: env::var("ROOM_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(256),
            log_filter: env::var("RUST_LOG")
                .unwrap_or_else(|_| "scribbly_server=info,tower_http=info".to_string()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
