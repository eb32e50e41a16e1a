//! Configuration module - environment variable parsing

mod controls;

pub use controls::{ControlMapping, Controls};

use std::env;
use std::net::SocketAddr;

use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Base URL of the fighter API (serves `fighters.json` and `details/fighter/{id}.json`)
    pub fighter_api_url: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Max key messages per second per connection
    pub input_rate_limit: u32,

    /// Keyboard layout for both players
    pub controls: Controls,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let input_rate_limit = match env::var("INPUT_RATE_LIMIT") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("INPUT_RATE_LIMIT"))?,
            Err(_) => DEFAULT_INPUT_RATE_LIMIT,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            fighter_api_url: env::var("FIGHTER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FIGHTER_API_URL"))?,

            client_origin: env::var("CLIENT_ORIGIN")
                .map_err(|_| ConfigError::Missing("CLIENT_ORIGIN"))?,

            input_rate_limit,

            controls: Controls::from_env()?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid controls for {player}: {reason}")]
    InvalidControls {
        player: &'static str,
        reason: &'static str,
    },
}
