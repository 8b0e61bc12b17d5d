//! Lock coordinator
//!
//! Single owner of the exclusive gate and the privileged override. Request
//! handlers never touch either directly: user mutations go through
//! [`LockCoordinator::run_user_operation`], privileged ones through
//! [`LockCoordinator::run_privileged_operation`], and every getter reads
//! [`LockCoordinator::current_read_view`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use cantor_common::{EventBus, ServerEvent};
use tracing::{debug, info};

use super::gate::ExclusiveGate;
use super::privileged::PrivilegedOverride;
use crate::config::PrivilegedMode;
use crate::error::Result;
use crate::player::{Player, PlayerSnapshot};

pub struct LockCoordinator {
    gate: Arc<ExclusiveGate>,
    privileged: PrivilegedOverride,
    mode: PrivilegedMode,
    events: EventBus,
    /// Last `locked()` value sent to clients
    published: AtomicBool,
}

impl LockCoordinator {
    pub fn new(mode: PrivilegedMode, events: EventBus) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<LockCoordinator>| {
            let observer = weak.clone();
            let gate = Arc::new(ExclusiveGate::with_observer(move |_held| {
                if let Some(coordinator) = observer.upgrade() {
                    coordinator.publish_lock_state();
                }
            }));

            Self {
                privileged: PrivilegedOverride::new(Arc::clone(&gate)),
                gate,
                mode,
                events,
                published: AtomicBool::new(false),
            }
        })
    }

    /// Gate held or override active
    pub fn locked(&self) -> bool {
        self.gate.is_held() || self.privileged.is_active()
    }

    pub fn gate_held(&self) -> bool {
        self.gate.is_held()
    }

    pub fn override_active(&self) -> bool {
        self.privileged.is_active()
    }

    pub fn mode(&self) -> PrivilegedMode {
        self.mode
    }

    /// Broadcast `lockChanged` if `locked()` differs from what clients last saw
    fn publish_lock_state(&self) {
        let locked = self.locked();
        if self.published.swap(locked, Ordering::AcqRel) != locked {
            debug!(locked, "Lock state changed");
            self.events.emit_lossy(ServerEvent::LockChanged(locked));
        }
    }

    /// Attempt-once user mutation; `Ok(None)` when rejected
    pub async fn run_user_operation<F, Fut, T>(&self, op: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.gate.try_run(op).await
    }

    /// Privileged mutation; readers keep seeing the state from before it
    /// started until it finishes. `Ok(None)` when rejected.
    pub async fn run_privileged_operation<F, Fut, T>(
        &self,
        player: &Player,
        op: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.mode {
            PrivilegedMode::Snapshot => {
                if !self.privileged.begin_or_reject(player).await? {
                    return Ok(None);
                }
                let guard = self.privileged.guard();
                let result = op().await;
                self.privileged.end().await?;
                guard.disarm();
                result.map(Some)
            }
            PrivilegedMode::Exclusive => {
                let outcome = self
                    .gate
                    .try_run(|| async {
                        if self.privileged.is_active() {
                            return Ok(None);
                        }
                        self.privileged.freeze(player.snapshot().await);
                        let guard = self.privileged.guard();
                        info!("Exclusive privileged operation started");
                        let result = op().await;
                        guard.disarm();
                        self.privileged.thaw();
                        info!("Exclusive privileged operation finished");
                        result.map(Some)
                    })
                    .await?;
                Ok(outcome.flatten())
            }
        }
    }

    /// Frozen snapshot while an override is active, otherwise the live state
    pub async fn current_read_view(&self, player: &Player) -> PlayerSnapshot {
        match self.privileged.snapshot() {
            Some(frozen) => frozen,
            None => player.snapshot().await,
        }
    }
}
