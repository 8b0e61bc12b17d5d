//! Logical player state machine
//!
//! Two states, `Paused` (initial) and `Playing`, plus volume, mute flag and
//! current track. Every transition drives the playback device first and only
//! commits the logical state once the device has succeeded, so a failed
//! fade leaves the previous state in place.
//!
//! Callers serialize mutations through the lock coordinator; the internal
//! locks only protect memory, not transition ordering.

use cantor_common::{PlayState, TrackId};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::device::tracks::TrackCatalog;
use crate::device::PlaybackDevice;
use crate::error::{Error, Result};

/// Copy of the logical player state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub volume: u8,
    pub muted: bool,
    pub play_state: PlayState,
    pub current_track: TrackId,
}

pub struct Player {
    state: RwLock<PlayerSnapshot>,
    device: Mutex<PlaybackDevice>,
    catalog: TrackCatalog,
}

impl Player {
    pub fn new(device: PlaybackDevice, config: &PlayerConfig) -> Self {
        let catalog = device.catalog().clone();
        Self {
            state: RwLock::new(PlayerSnapshot {
                volume: config.initial_volume.min(100),
                muted: config.initial_muted,
                play_state: PlayState::Paused,
                current_track: config.initial_track.clone(),
            }),
            device: Mutex::new(device),
            catalog,
        }
    }

    /// Bring the device in line with the initial logical state
    pub async fn initialize(&self) {
        let state = self.snapshot().await;
        let level = if state.muted { 0 } else { state.volume };
        self.device
            .lock()
            .await
            .initialize(&state.current_track, level)
            .await;
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.state.read().await.clone()
    }

    pub async fn volume(&self) -> u8 {
        self.state.read().await.volume
    }

    pub async fn play_state(&self) -> PlayState {
        self.state.read().await.play_state
    }

    pub async fn muted(&self) -> bool {
        self.state.read().await.muted
    }

    pub async fn current_track(&self) -> TrackId {
        self.state.read().await.current_track.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.play_state().await == PlayState::Playing
    }

    pub async fn is_paused(&self) -> bool {
        self.play_state().await == PlayState::Paused
    }

    pub async fn is_muted(&self) -> bool {
        self.muted().await
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    /// Store and apply a new volume
    ///
    /// The device receives the level even while muted.
    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        if volume > 100 {
            return Err(Error::InvalidRequest(format!(
                "volume {} out of range 0-100",
                volume
            )));
        }

        self.device.lock().await.set_volume(volume).await?;
        self.state.write().await.volume = volume;
        debug!(volume, "Volume changed");
        Ok(())
    }

    /// Mute drives the device to 0 and keeps the logical volume;
    /// unmute re-applies the logical volume.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        let level = if muted { 0 } else { self.volume().await };

        self.device.lock().await.set_volume(level).await?;
        self.state.write().await.muted = muted;
        debug!(muted, "Mute changed");
        Ok(())
    }

    pub async fn play(&self) -> Result<()> {
        if self.is_playing().await {
            debug!("Already playing");
            return Ok(());
        }

        self.device.lock().await.unpause_with_fade_in().await?;
        self.state.write().await.play_state = PlayState::Playing;
        info!("Playback started");
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        if self.is_paused().await {
            debug!("Already paused");
            return Ok(());
        }

        self.device.lock().await.fade_out_and_pause().await?;
        self.state.write().await.play_state = PlayState::Paused;
        info!("Playback paused");
        Ok(())
    }

    pub async fn set_play_state(&self, state: PlayState) -> Result<()> {
        match state {
            PlayState::Playing => self.play().await,
            PlayState::Paused => self.pause().await,
        }
    }

    /// Switch from `from` to `to`, leaving the player paused at `to`'s
    /// default volume and remembered offset
    pub async fn change_track(&self, from: &TrackId, to: &TrackId) -> Result<()> {
        self.catalog.get(from)?;
        let default_volume = self.catalog.default_volume(to)?;

        self.pause().await?;

        let mut device = self.device.lock().await;

        let outgoing = self.current_track().await;
        if &outgoing != from {
            warn!(requested = %from, actual = %outgoing, "Track change source does not match current track");
        }

        device.switch_track(&outgoing, to).await?;
        device.set_volume(default_volume).await?;

        {
            let mut state = self.state.write().await;
            state.current_track = to.clone();
            state.play_state = PlayState::Paused;
            state.volume = default_volume;
        }
        info!(from = %outgoing, to = %to, volume = default_volume, "Track changed");

        device.restore_position(to).await
    }
}
