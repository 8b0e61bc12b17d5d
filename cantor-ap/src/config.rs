//! cantor-ap configuration
//!
//! Loaded from TOML via `cantor_common::config`; every key is optional and
//! falls back to the compiled defaults below. CLI flags override the file.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use cantor_common::fade_curves::{DEFAULT_FADE_INTERVALS, DEFAULT_FADE_STEP_MS};
use cantor_common::{FadeSchedule, TrackId};

use crate::error::{Error, Result};

/// Audio Player configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub player: PlayerConfig,
    pub tracks: Vec<TrackConfig>,
    pub device: DeviceConfig,
    pub console: ConsoleConfig,
    pub auth: AuthConfig,
    pub lock: LockConfig,
}

impl Config {
    /// Configured tracks, or the built-in `slow`/`fast` pair when none are given
    pub fn track_list(&self) -> Vec<TrackConfig> {
        if self.tracks.is_empty() {
            TrackConfig::defaults()
        } else {
            self.tracks.clone()
        }
    }

    /// Reject configurations the player cannot start with
    pub fn validate(&self) -> Result<()> {
        let tracks = self.track_list();
        if !tracks.iter().any(|t| t.id == self.player.initial_track) {
            return Err(Error::Config(format!(
                "initial track '{}' is not in the track list",
                self.player.initial_track
            )));
        }
        for track in &tracks {
            if track.default_volume > 100 {
                return Err(Error::Config(format!(
                    "track '{}' default_volume {} exceeds 100",
                    track.id, track.default_volume
                )));
            }
        }
        if self.player.initial_volume > 100 {
            return Err(Error::Config(format!(
                "initial_volume {} exceeds 100",
                self.player.initial_volume
            )));
        }
        if self.device.max_restore_attempts == 0 {
            return Err(Error::Config("max_restore_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub ping_interval_secs: u64,
    /// Capacity of the broadcast channel feeding every client
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            ping_interval_secs: 30,
            event_capacity: 100,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub initial_volume: u8,
    pub initial_muted: bool,
    pub initial_track: TrackId,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: 50,
            initial_muted: false,
            initial_track: TrackId::from("slow"),
        }
    }
}

/// One entry of the track catalog
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackConfig {
    pub id: TrackId,
    pub file: PathBuf,
    pub default_volume: u8,
    #[serde(default)]
    pub initial_offset: f64,
}

impl TrackConfig {
    pub fn defaults() -> Vec<TrackConfig> {
        vec![
            TrackConfig {
                id: TrackId::from("slow"),
                file: PathBuf::from("./assets/audio/music_slow.mp3"),
                default_volume: 50,
                initial_offset: 0.0,
            },
            TrackConfig {
                id: TrackId::from("fast"),
                file: PathBuf::from("./assets/audio/music_fast.mp3"),
                default_volume: 35,
                initial_offset: 0.0,
            },
        ]
    }
}

/// Which hardware driver backs the playback device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// In-memory device (development and tests)
    #[default]
    Simulated,
    /// mpv over its JSON IPC socket
    Mpv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub driver: DriverKind,
    pub mpv_socket: PathBuf,
    pub fade_intervals: u32,
    pub fade_step_ms: u64,
    pub restore_retry_delay_ms: u64,
    pub max_restore_attempts: u32,
    /// Accepted distance between requested and reported playback time (seconds)
    pub position_tolerance_secs: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Simulated,
            mpv_socket: PathBuf::from("/tmp/cantor-mpv.sock"),
            fade_intervals: DEFAULT_FADE_INTERVALS,
            fade_step_ms: DEFAULT_FADE_STEP_MS,
            restore_retry_delay_ms: 100,
            max_restore_attempts: 10,
            position_tolerance_secs: 0.05,
        }
    }
}

impl DeviceConfig {
    pub fn fade_schedule(&self) -> FadeSchedule {
        FadeSchedule::new(self.fade_intervals, self.fade_step_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    /// Log-only console
    #[default]
    Mock,
    /// Behringer X32 over OSC/UDP
    X32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub mode: ConsoleMode,
    pub x32_address: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            mode: ConsoleMode::Mock,
            x32_address: "192.168.0.64:10023".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Privileged operator password; privileged login is disabled when unset
    pub admin_password: Option<String>,
}

/// How a privileged operation uses the exclusive gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegedMode {
    /// Gate held only while the override flag flips; the work itself runs
    /// unprotected while readers see the frozen snapshot
    #[default]
    Snapshot,
    /// Gate held for the whole privileged operation
    Exclusive,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LockConfig {
    pub privileged_mode: PrivilegedMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_common::config::parse_config;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.player.initial_volume, 50);
        assert_eq!(config.player.initial_track, TrackId::from("slow"));
        assert_eq!(config.lock.privileged_mode, PrivilegedMode::Snapshot);

        let tracks = config.track_list();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].id, TrackId::from("fast"));
        assert_eq!(tracks[1].default_volume, 35);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = parse_config(
            r#"
            [server]
            port = 4000

            [player]
            initial_volume = 60
            initial_track = "hymn"

            [[tracks]]
            id = "hymn"
            file = "/srv/audio/hymn.mp3"
            default_volume = 40
            initial_offset = 12.5

            [device]
            driver = "mpv"
            position_tolerance_secs = 0.1

            [console]
            mode = "x32"

            [auth]
            admin_password = "secret"

            [lock]
            privileged_mode = "exclusive"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.ping_interval_secs, 30);
        assert_eq!(config.device.driver, DriverKind::Mpv);
        assert_eq!(config.device.max_restore_attempts, 10);
        assert_eq!(config.console.mode, ConsoleMode::X32);
        assert_eq!(config.auth.admin_password.as_deref(), Some("secret"));
        assert_eq!(config.lock.privileged_mode, PrivilegedMode::Exclusive);
        assert_eq!(config.track_list()[0].initial_offset, 12.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_initial_track() {
        let mut config = Config::default();
        config.player.initial_track = TrackId::from("missing");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_loud_defaults() {
        let mut config = Config::default();
        config.player.initial_volume = 101;
        assert!(config.validate().is_err());
    }
}
