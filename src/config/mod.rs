//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS (comma-separated list)
    pub client_origin: String,
    /// Simulation tuning (varies per deployment, not per protocol)
    pub game: GameConfig,
}

/// Simulation tuning constants.
///
/// Two deployment variants run the same wire schema with different
/// pacing; everything here is overridable via environment variables.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Broadcast every Nth simulation tick
    pub broadcast_divisor: u32,
    /// Speed at round start, units per tick
    pub base_speed: f64,
    /// Speed added per interval elapsed
    pub speed_increment: f64,
    /// Seconds between speed increments
    pub speed_interval_secs: f64,
    /// Speed ceiling, units per tick
    pub max_speed: f64,
    /// Heading change per tick at full turn intent, radians
    pub turn_rate: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            broadcast_divisor: 2,
            base_speed: 2.5,
            speed_increment: 0.5,
            speed_interval_secs: 10.0,
            max_speed: 6.0,
            turn_rate: 0.08,
        }
    }
}

impl GameConfig {
    /// Duration of one simulation tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate as u64)
    }
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

        let defaults = GameConfig::default();
        let game = GameConfig {
            tick_rate: parse_var("TICK_RATE", defaults.tick_rate)?,
            broadcast_divisor: parse_var("BROADCAST_DIVISOR", defaults.broadcast_divisor)?,
            base_speed: parse_var("BASE_SPEED", defaults.base_speed)?,
            speed_increment: parse_var("SPEED_INCREMENT", defaults.speed_increment)?,
            speed_interval_secs: parse_var("SPEED_INTERVAL_SECS", defaults.speed_interval_secs)?,
            max_speed: parse_var("MAX_SPEED", defaults.max_speed)?,
            turn_rate: parse_var("TURN_RATE", defaults.turn_rate)?,
        };

        if game.tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if game.broadcast_divisor == 0 {
            return Err(ConfigError::Invalid("BROADCAST_DIVISOR"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            game,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
