//! Hardware audio driver seam
//!
//! The playback device only needs four primitives against a single device
//! handle. Values are passed as strings, the way mpv's string property API
//! takes them.

use async_trait::async_trait;

use crate::error::Result;

/// Loop mode property (`"inf"` loops the loaded file forever)
pub const PROP_LOOP: &str = "loop";
/// Pause flag property (`"yes"` / `"no"`)
pub const PROP_PAUSE: &str = "pause";
/// Output volume property (0-100, fractional values allowed)
pub const PROP_VOLUME: &str = "volume";
/// Playback position in seconds
pub const PROP_PLAYBACK_TIME: &str = "playback-time";
/// Command loading a media file, replacing the current one
pub const CMD_LOADFILE: &str = "loadfile";

#[async_trait]
pub trait AudioDriver: Send + Sync {
    async fn set_property(&self, name: &str, value: &str) -> Result<()>;

    async fn get_property(&self, name: &str) -> Result<String>;

    async fn execute_command(&self, args: &[&str]) -> Result<()>;

    async fn set_option(&self, name: &str, value: &str) -> Result<()>;
}
