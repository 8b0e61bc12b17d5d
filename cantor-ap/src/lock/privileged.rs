//! Privileged override
//!
//! While active, readers see a snapshot of the player taken when the
//! override began instead of the live state. Flipping the flag goes through
//! the exclusive gate, except when cleanup of an aborted operation finds the
//! gate held by someone else.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::gate::ExclusiveGate;
use crate::error::Result;
use crate::player::{Player, PlayerSnapshot};

/// Back-off between attempts when ending an override
const END_RETRY: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct OverrideState {
    /// `Some` exactly while the override is active
    snapshot: Option<PlayerSnapshot>,
}

/// Ends the override when dropped while still armed, so a privileged
/// operation that panics or is cancelled cannot leave the view frozen.
pub(crate) struct OverrideGuard<'a> {
    over: &'a PrivilegedOverride,
    armed: bool,
}

impl OverrideGuard<'_> {
    /// The override was ended normally
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Privileged operation aborted, ending override");
        if self.over.gate.try_with(|| self.over.thaw()).is_none() {
            // Gate busy; its holder publishes the lock change on release
            self.over.thaw();
        }
    }
}

pub struct PrivilegedOverride {
    gate: Arc<ExclusiveGate>,
    state: RwLock<OverrideState>,
}

impl PrivilegedOverride {
    pub fn new(gate: Arc<ExclusiveGate>) -> Self {
        Self {
            gate,
            state: RwLock::new(OverrideState::default()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .is_some()
    }

    /// Frozen view, `None` when inactive
    pub fn snapshot(&self) -> Option<PlayerSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Capture the player and mark the override active.
    ///
    /// Returns `false` without changing anything when the gate is held or an
    /// override is already active.
    pub async fn begin_or_reject(&self, player: &Player) -> Result<bool> {
        let began = self
            .gate
            .try_run(|| async {
                if self.is_active() {
                    debug!("Privileged override already active");
                    return Ok(false);
                }
                self.freeze(player.snapshot().await);
                Ok(true)
            })
            .await?;

        match began {
            Some(true) => {
                info!("Privileged override started");
                Ok(true)
            }
            Some(false) => Ok(false),
            None => {
                debug!("Gate busy, privileged override rejected");
                Ok(false)
            }
        }
    }

    /// Deactivate the override, waiting for the gate if a user operation
    /// currently holds it
    pub async fn end(&self) -> Result<()> {
        self.gate
            .run_when_free(END_RETRY, || async {
                self.thaw();
                Ok(())
            })
            .await?;
        info!("Privileged override ended");
        Ok(())
    }

    /// Guard that ends the override if the operation never reaches cleanup
    pub(crate) fn guard(&self) -> OverrideGuard<'_> {
        OverrideGuard {
            over: self,
            armed: true,
        }
    }

    /// Set the frozen view; caller must hold the gate
    pub(crate) fn freeze(&self, snapshot: PlayerSnapshot) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = Some(snapshot);
    }

    /// Clear the frozen view; caller must hold the gate
    pub(crate) fn thaw(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = None;
    }
}
