//! Playback device: time-based transitions against the hardware driver
//!
//! Owns the track position table and performs:
//! - equal-power fade-out before pausing and fade-in after resuming
//! - track switching with offset bookkeeping
//! - the bounded position-restore retry loop run after a switch
//!
//! Every method that mutates the device is only reached while the caller
//! holds the exclusive gate.

pub mod driver;
#[cfg(unix)]
pub mod mpv;
pub mod simulated;
pub mod tracks;

use std::sync::Arc;
use std::time::Duration;

use cantor_common::{FadeDirection, FadeSchedule, TrackId};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use driver::{AudioDriver, CMD_LOADFILE, PROP_LOOP, PROP_PAUSE, PROP_PLAYBACK_TIME, PROP_VOLUME};
use tracks::{TrackCatalog, TrackPositionTable};

pub use simulated::SimulatedDriver;

/// Bounded retry parameters for re-applying a remembered offset
#[derive(Debug, Clone, Copy)]
pub struct RestorePolicy {
    pub retry_delay: Duration,
    pub max_attempts: u32,
    pub tolerance_secs: f64,
}

impl RestorePolicy {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            retry_delay: Duration::from_millis(config.restore_retry_delay_ms),
            max_attempts: config.max_restore_attempts.max(1),
            tolerance_secs: config.position_tolerance_secs.max(0.0),
        }
    }

    fn matches(&self, reported: f64, target: f64) -> bool {
        (reported - target).abs() <= self.tolerance_secs
    }
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self::from_config(&DeviceConfig::default())
    }
}

pub struct PlaybackDevice {
    driver: Arc<dyn AudioDriver>,
    catalog: TrackCatalog,
    positions: TrackPositionTable,
    fade: FadeSchedule,
    restore: RestorePolicy,
}

impl PlaybackDevice {
    pub fn new(
        driver: Arc<dyn AudioDriver>,
        catalog: TrackCatalog,
        fade: FadeSchedule,
        restore: RestorePolicy,
    ) -> Self {
        let positions = TrackPositionTable::from_catalog(&catalog);
        Self {
            driver,
            catalog,
            positions,
            fade,
            restore,
        }
    }

    pub fn from_config(
        driver: Arc<dyn AudioDriver>,
        catalog: TrackCatalog,
        config: &DeviceConfig,
    ) -> Self {
        Self::new(
            driver,
            catalog,
            config.fade_schedule(),
            RestorePolicy::from_config(config),
        )
    }

    /// Startup sequence: loop forever, load the first track, start paused,
    /// apply the initial volume. Failures are logged and startup continues.
    pub async fn initialize(&mut self, first_track: &TrackId, volume: u8) {
        if let Err(e) = self.driver.set_property(PROP_LOOP, "inf").await {
            warn!("Failed to set loop property: {}", e);
        }

        match self.catalog.get(first_track) {
            Ok(track) => {
                let file = track.file.to_string_lossy().to_string();
                if let Err(e) = self.driver.execute_command(&[CMD_LOADFILE, &file]).await {
                    warn!(file = %file, "Failed to load initial file: {}", e);
                }
            }
            Err(e) => warn!("Initial track unavailable: {}", e),
        }

        if let Err(e) = self.driver.set_property(PROP_PAUSE, "yes").await {
            warn!("Failed to set pause property: {}", e);
        }

        if let Err(e) = self.set_volume(volume).await {
            warn!("Failed to apply initial volume: {}", e);
        }

        info!(track = %first_track, volume, "Playback device initialized");
    }

    /// Apply an output level directly (no fade)
    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        self.driver
            .set_option(PROP_VOLUME, &volume.to_string())
            .await
    }

    /// Volume currently applied by the device
    pub async fn current_volume(&self) -> Result<f64> {
        let raw = self.driver.get_property(PROP_VOLUME).await?;
        raw.trim()
            .parse()
            .map_err(|_| Error::Device(format!("unparsable volume '{}'", raw)))
    }

    async fn write_volume(&self, level: f64) -> Result<()> {
        self.driver
            .set_property(PROP_VOLUME, &level.to_string())
            .await
    }

    async fn ramp(&self, direction: FadeDirection, base: f64) -> Result<()> {
        let delay = self.fade.step_delay();
        for level in self.fade.levels(direction, base) {
            self.write_volume(level).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Fade V0 → 0, pause, then put V0 back so a later resume starts from it
    pub async fn fade_out_and_pause(&self) -> Result<()> {
        let base = self.current_volume().await?;
        debug!(base, steps = self.fade.step_count(), "Fading out");
        self.ramp(FadeDirection::Out, base).await?;
        self.driver.set_property(PROP_PAUSE, "yes").await?;
        self.write_volume(base).await?;
        Ok(())
    }

    /// Silence, unpause, then fade 0 → V0
    pub async fn unpause_with_fade_in(&self) -> Result<()> {
        let base = self.current_volume().await?;
        debug!(base, steps = self.fade.step_count(), "Fading in");
        self.write_volume(0.0).await?;
        self.driver.set_property(PROP_PAUSE, "no").await?;
        self.ramp(FadeDirection::In, base).await
    }

    /// Current playhead in seconds; 0.0 when the device cannot report it
    pub async fn playback_time(&self) -> f64 {
        match self.read_playback_time().await {
            Ok(seconds) => seconds,
            Err(e) => {
                warn!("Failed to get playback time: {}", e);
                0.0
            }
        }
    }

    async fn read_playback_time(&self) -> Result<f64> {
        let raw = self.driver.get_property(PROP_PLAYBACK_TIME).await?;
        raw.trim()
            .parse()
            .map_err(|_| Error::Device(format!("unparsable playback time '{}'", raw)))
    }

    /// Remember where `outgoing` was and load `incoming`
    pub async fn switch_track(&mut self, outgoing: &TrackId, incoming: &TrackId) -> Result<()> {
        let file = self
            .catalog
            .get(incoming)?
            .file
            .to_string_lossy()
            .to_string();

        let offset = self.playback_time().await;
        self.positions.record(outgoing, offset);
        debug!(track = %outgoing, offset, "Recorded outgoing track offset");

        self.driver
            .execute_command(&[CMD_LOADFILE, &file])
            .await
            .map_err(|e| {
                warn!(from = %outgoing, to = %incoming, file = %file, "Failed to change track: {}", e);
                e
            })
    }

    /// Re-apply the remembered offset of `track` until the device reports it
    ///
    /// The device may still be loading the file when the first write lands,
    /// so the write is repeated until the read-back is within tolerance or
    /// the attempt cap is reached.
    pub async fn restore_position(&self, track: &TrackId) -> Result<()> {
        let target = self.positions.offset(track);
        let value = target.to_string();

        let mut last_outcome = String::from("no read-back");
        for attempt in 1..=self.restore.max_attempts {
            self.driver.set_property(PROP_PLAYBACK_TIME, &value).await?;
            tokio::time::sleep(self.restore.retry_delay).await;

            match self.read_playback_time().await {
                Ok(reported) if self.restore.matches(reported, target) => {
                    debug!(track = %track, target, attempt, "Playback position restored");
                    return Ok(());
                }
                Ok(reported) => {
                    debug!(track = %track, target, reported, attempt, "Position not applied yet");
                    last_outcome = format!("device reported {:.3}s", reported);
                }
                Err(e) => {
                    debug!(track = %track, attempt, "Position read-back failed: {}", e);
                    last_outcome = e.to_string();
                }
            }
        }

        warn!(
            track = %track,
            target,
            attempts = self.restore.max_attempts,
            last = %last_outcome,
            "Failed to load last track time"
        );
        Err(Error::PositionRestore {
            target,
            attempts: self.restore.max_attempts,
            last: last_outcome,
        })
    }

    pub fn positions(&self) -> &TrackPositionTable {
        &self.positions
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }
}
