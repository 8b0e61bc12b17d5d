//! Mixing console control
//!
//! Console actions are fire-and-forget channel moves. They run under the
//! same exclusive gate as player mutations and produce no broadcast.

pub mod mock;
pub mod x32;

use async_trait::async_trait;

use crate::error::Result;

pub use mock::MockConsole;
pub use x32::X32Console;

#[async_trait]
pub trait MixingConsole: Send + Sync {
    /// Bring up the pulpit microphone channels
    async fn enable_primary_mic(&self) -> Result<()>;

    /// Bring up the auxiliary line input
    async fn enable_aux_input(&self) -> Result<()>;
}
