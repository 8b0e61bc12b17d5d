//! Exclusive gate: process-wide, attempt-once mutual exclusion
//!
//! A caller either gets the single slot immediately or is turned away; there
//! is no queue and no waiting. The slot stays held for the whole operation,
//! including every `.await` inside it, so two mutations can never interleave.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::Result;

/// Callback invoked on every held/unheld transition with the new held value
pub type LockObserver = Box<dyn Fn(bool) + Send + Sync>;

/// Single exclusive slot guarding player and console mutation
pub struct ExclusiveGate {
    held: AtomicBool,
    observer: Option<LockObserver>,
}

/// Releases the slot when dropped (normal return, `?` early exit, panic
/// unwind, or cancellation of the owning future).
struct GateGuard<'a> {
    gate: &'a ExclusiveGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.held.store(false, Ordering::Release);
        trace!("Exclusive gate released");
        self.gate.notify(false);
    }
}

impl ExclusiveGate {
    pub fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            observer: None,
        }
    }

    /// Create a gate that reports transitions to `observer`
    ///
    /// The observer is called after the transition is visible through
    /// [`ExclusiveGate::is_held`]. It is never called for a rejected attempt.
    pub fn with_observer(observer: impl Fn(bool) + Send + Sync + 'static) -> Self {
        Self {
            held: AtomicBool::new(false),
            observer: Some(Box::new(observer)),
        }
    }

    /// Current occupancy; never mutates
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        trace!("Exclusive gate acquired");
        self.notify(true);
        Some(GateGuard { gate: self })
    }

    fn notify(&self, held: bool) {
        if let Some(observer) = &self.observer {
            observer(held);
        }
    }

    /// Run `op` if the slot is free.
    ///
    /// Returns `Ok(None)` without running `op` when the slot is already held,
    /// `Ok(Some(value))` when `op` ran and succeeded. Errors from `op` are
    /// returned unchanged after the slot has been released.
    pub async fn try_run<F, Fut, T>(&self, op: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(_guard) = self.try_acquire() else {
            debug!("Exclusive gate busy, rejecting operation");
            return Ok(None);
        };

        let value = op().await?;
        Ok(Some(value))
    }

    /// Synchronous variant of [`Self::try_run`]; `None` when the slot is held
    pub(crate) fn try_with<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _guard = self.try_acquire()?;
        Some(f())
    }

    /// Run `op` as soon as the slot is free, polling every `retry`.
    ///
    /// Only for short bookkeeping that must not be lost to contention
    /// (privileged-override cleanup). Request handlers use [`Self::try_run`].
    pub async fn run_when_free<F, Fut, T>(&self, retry: Duration, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            if let Some(_guard) = self.try_acquire() {
                return op().await;
            }
            tokio::time::sleep(retry).await;
        }
    }
}

impl Default for ExclusiveGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_runs_operation_and_releases() {
        let gate = ExclusiveGate::new();

        let result = gate
            .try_run(|| async {
                assert!(gate.is_held());
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(result, Some(7));
        assert!(!gate.is_held());
    }

    #[tokio::test]
    async fn test_rejects_while_held_without_running() {
        let gate = ExclusiveGate::new();
        let ran = AtomicUsize::new(0);

        let outer = gate
            .try_run(|| async {
                let inner = gate
                    .try_run(|| async {
                        ran.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await?;
                assert!(inner.is_none());
                Ok(())
            })
            .await
            .unwrap();

        assert!(outer.is_some());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_propagates_and_slot_is_released() {
        let gate = ExclusiveGate::new();

        let result: Result<Option<()>> = gate
            .try_run(|| async { Err(Error::Device("boom".to_string())) })
            .await;

        assert!(matches!(result, Err(Error::Device(_))));
        assert!(!gate.is_held());

        // Slot is usable again
        assert_eq!(gate.try_run(|| async { Ok(1) }).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_observer_sees_transitions_not_rejections() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let gate = ExclusiveGate::with_observer(move |held| sink.lock().unwrap().push(held));

        gate.try_run(|| async {
            // Rejected attempt: no notification
            gate.try_run(|| async { Ok(()) }).await?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_try_with_respects_held_slot() {
        let gate = ExclusiveGate::new();
        assert_eq!(gate.try_with(|| gate.is_held()), Some(true));
        assert!(!gate.is_held());

        gate.try_run(|| async {
            assert!(gate.try_with(|| ()).is_none());
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_operations_never_overlap() {
        let gate = Arc::new(ExclusiveGate::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..20u64 {
            let gate = Arc::clone(&gate);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            let completed = Arc::clone(&completed);
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(i * 7)).await;
                gate.try_run(|| async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(25)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap()
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                accepted += 1;
            }
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), accepted);
        assert!(accepted >= 1 && accepted < 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_when_free_waits_for_release() {
        let gate = Arc::new(ExclusiveGate::new());
        let holder = Arc::clone(&gate);

        let long_op = tokio::spawn(async move {
            holder
                .try_run(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                })
                .await
                .unwrap()
        });

        while !gate.is_held() {
            tokio::task::yield_now().await;
        }

        let value = gate
            .run_when_free(Duration::from_millis(10), || async { Ok("cleanup") })
            .await
            .unwrap();

        assert_eq!(value, "cleanup");
        assert!(long_op.await.unwrap().is_some());
        assert!(!gate.is_held());
    }
}
