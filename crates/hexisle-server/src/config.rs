//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("player range {min}..={max} is invalid (need 2 <= min <= max <= 4)")]
    PlayerRange { min: usize, max: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub min_players: usize,
    pub max_players: usize,
    /// Seconds counted down between "everyone ready" and game start
    pub countdown_seconds: u32,
    pub heartbeat_interval: Duration,
    /// How long a disconnected player's seat is held
    pub reconnect_grace: Duration,
    /// How long a room with nobody connected survives
    pub empty_room_grace: Duration,
    pub board_generation_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            min_players: 2,
            max_players: 4,
            countdown_seconds: 3,
            heartbeat_interval: Duration::from_secs(30),
            reconnect_grace: Duration::from_secs(60),
            empty_room_grace: Duration::from_secs(30),
            board_generation_attempts: hexisle_core::board::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `MIN_PLAYERS`, `MAX_PLAYERS`, `COUNTDOWN_SECONDS`,
    /// `HEARTBEAT_INTERVAL_SECS`, `RECONNECT_GRACE_SECS`,
    /// `EMPTY_ROOM_GRACE_SECS` and `BOARD_GENERATION_ATTEMPTS`, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            addr: parse(&lookup, "SERVER_ADDR", defaults.addr)?,
            min_players: parse(&lookup, "MIN_PLAYERS", defaults.min_players)?,
            max_players: parse(&lookup, "MAX_PLAYERS", defaults.max_players)?,
            countdown_seconds: parse(&lookup, "COUNTDOWN_SECONDS", defaults.countdown_seconds)?,
            heartbeat_interval: Duration::from_secs(parse(
                &lookup,
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval.as_secs(),
            )?),
            reconnect_grace: Duration::from_secs(parse(
                &lookup,
                "RECONNECT_GRACE_SECS",
                defaults.reconnect_grace.as_secs(),
            )?),
            empty_room_grace: Duration::from_secs(parse(
                &lookup,
                "EMPTY_ROOM_GRACE_SECS",
                defaults.empty_room_grace.as_secs(),
            )?),
            board_generation_attempts: parse(
                &lookup,
                "BOARD_GENERATION_ATTEMPTS",
                defaults.board_generation_attempts,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players < 2 || self.max_players > 4 || self.min_players > self.max_players {
            return Err(ConfigError::PlayerRange {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.countdown_seconds == 0 {
            return Err(ConfigError::Zero("COUNTDOWN_SECONDS"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::Zero("HEARTBEAT_INTERVAL_SECS"));
        }
        if self.board_generation_attempts == 0 {
            return Err(ConfigError::Zero("BOARD_GENERATION_ATTEMPTS"));
        }
        Ok(())
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 4);
        assert_eq!(config.countdown_seconds, 3);
        assert_eq!(config.reconnect_grace, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("SERVER_ADDR", "127.0.0.1:9000"),
            ("MIN_PLAYERS", "3"),
            ("EMPTY_ROOM_GRACE_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.min_players, 3);
        assert_eq!(config.empty_room_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_garbage_and_bad_ranges() {
        assert_eq!(
            from_pairs(&[("MAX_PLAYERS", "four")]).unwrap_err(),
            ConfigError::Invalid {
                name: "MAX_PLAYERS",
                value: "four".into()
            }
        );
        assert!(matches!(
            from_pairs(&[("MIN_PLAYERS", "4"), ("MAX_PLAYERS", "3")]),
            Err(ConfigError::PlayerRange { .. })
        ));
        assert!(matches!(
            from_pairs(&[("HEARTBEAT_INTERVAL_SECS", "0")]),
            Err(ConfigError::Zero(_))
        ));
    }
}
