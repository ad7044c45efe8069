//! Game and scoreboard settings
//!
//! Loaded from an optional JSON file named by `GRAB_GAME_CONFIG`, then
//! overridden field by field from the environment. Missing fields take
//! their defaults.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    COUNTDOWN_SECS, GAME_OVER_RESET_DELAY_MS, ITEM_SPAWN_INTERVAL_MS, RELAY_PORT, ROUND_SECS,
    TICK_RATE_HZ,
};
use crate::controller::DEFAULT_BAUD_RATE;
use crate::relay::{ClientOptions, ServerOptions};
use crate::sim::RoundTimings;

/// Path of the JSON settings file
pub const CONFIG_ENV: &str = "GRAB_GAME_CONFIG";
/// Relay port override (keeps the configured host)
pub const PORT_ENV: &str = "GRAB_GAME_PORT";
/// Controller device override; empty disables the controller
pub const CONTROLLER_ENV: &str = "GRAB_GAME_CONTROLLER";
/// RNG seed override
pub const SEED_ENV: &str = "GRAB_GAME_SEED";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid relay bind address: {0}")]
    InvalidAddress(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Relay ===
    /// Listener address of the score relay
    pub bind_addr: String,
    /// Accept poll interval of the relay worker
    pub accept_poll_ms: u64,
    /// Write timeout on the subscriber socket
    pub write_timeout_ms: u64,

    // === Controller ===
    /// Serial device path, `None` for keyboard only
    pub controller_path: Option<String>,
    pub controller_baud: u32,
    /// How long the newest sample keeps driving ticks when the controller
    /// sends slower than the tick rate. 0 uses each sample on one tick only.
    pub controller_max_age_ms: u64,

    // === Round ===
    pub tick_rate_hz: u32,
    pub item_spawn_interval_ms: u64,
    pub countdown_secs: f32,
    pub round_secs: f32,
    pub game_over_delay_ms: u64,
    /// Fixed seed for item spawns; random per run when unset
    pub seed: Option<u64>,

    // === Scoreboard client ===
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Delay after a failed connect
    pub retry_delay_ms: u64,
    /// Delay after a socket error
    pub error_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", RELAY_PORT),
            accept_poll_ms: 100,
            write_timeout_ms: 250,

            controller_path: None,
            controller_baud: DEFAULT_BAUD_RATE,
            controller_max_age_ms: 50,

            tick_rate_hz: TICK_RATE_HZ,
            item_spawn_interval_ms: ITEM_SPAWN_INTERVAL_MS,
            countdown_secs: COUNTDOWN_SECS,
            round_secs: ROUND_SECS,
            game_over_delay_ms: GAME_OVER_RESET_DELAY_MS,
            seed: None,

            connect_timeout_ms: 2000,
            read_timeout_ms: 1000,
            retry_delay_ms: 2000,
            error_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// File named by `GRAB_GAME_CONFIG` (if any) plus environment overrides
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                log::info!("{} not set, using default settings", CONFIG_ENV);
                Self::default()
            }
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read a JSON settings file. A missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Settings file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(port) = lookup(PORT_ENV) {
            let port: u16 = port.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: PORT_ENV,
                value: port.clone(),
            })?;
            let mut addr = self.bind_socket_addr()?;
            addr.set_port(port);
            self.bind_addr = addr.to_string();
        }

        if let Some(path) = lookup(CONTROLLER_ENV) {
            let path = path.trim();
            self.controller_path = (!path.is_empty()).then(|| path.to_string());
        }

        if let Some(seed) = lookup(SEED_ENV) {
            self.seed = Some(seed.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: SEED_ENV,
                value: seed.clone(),
            })?);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.bind_socket_addr()?;
        if self.tick_rate_hz == 0 {
            return Err(SettingsError::InvalidValue {
                key: "tick_rate_hz",
                value: self.tick_rate_hz.to_string(),
            });
        }
        if self.controller_baud == 0 {
            return Err(SettingsError::InvalidValue {
                key: "controller_baud",
                value: self.controller_baud.to_string(),
            });
        }
        if self.item_spawn_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                key: "item_spawn_interval_ms",
                value: self.item_spawn_interval_ms.to_string(),
            });
        }
        if self.round_secs.is_nan() || self.round_secs <= 0.0 {
            return Err(SettingsError::InvalidValue {
                key: "round_secs",
                value: self.round_secs.to_string(),
            });
        }
        if self.countdown_secs.is_nan() || self.countdown_secs < 0.0 {
            return Err(SettingsError::InvalidValue {
                key: "countdown_secs",
                value: self.countdown_secs.to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .parse()
            .map_err(|_| SettingsError::InvalidAddress(self.bind_addr.clone()))
    }

    /// Relay port, also the scoreboard's default when the operator gives a bare host
    pub fn relay_port(&self) -> Result<u16, SettingsError> {
        Ok(self.bind_socket_addr()?.port())
    }

    /// Configured seed, or a fresh random one
    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }

    pub fn controller_max_age(&self) -> Duration {
        Duration::from_millis(self.controller_max_age_ms)
    }

    pub fn round_timings(&self) -> RoundTimings {
        RoundTimings {
            countdown_secs: self.countdown_secs,
            round_secs: self.round_secs,
            item_spawn_interval_ms: self.item_spawn_interval_ms,
            game_over_delay_ms: self.game_over_delay_ms,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            poll_interval: Duration::from_millis(self.accept_poll_ms.clamp(1, 1000)),
            write_timeout: Duration::from_millis(self.write_timeout_ms.max(1)),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms.max(1)),
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            error_delay: Duration::from_millis(self.error_delay_ms),
        }
    }
}
