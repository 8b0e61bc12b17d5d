use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::MixingConsole;
use crate::error::Result;

/// Simulated settle time of a console action
const ACTION_DELAY: Duration = Duration::from_millis(50);

/// Console that only logs what it would do
#[derive(Debug, Default)]
pub struct MockConsole {
    actions: AtomicUsize,
}

impl MockConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions performed so far
    pub fn action_count(&self) -> usize {
        self.actions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MixingConsole for MockConsole {
    async fn enable_primary_mic(&self) -> Result<()> {
        info!("Mock console: channel 01 on, fader 0.687; channel 02 on, fader 0.837");
        tokio::time::sleep(ACTION_DELAY).await;
        self.actions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_aux_input(&self) -> Result<()> {
        info!("Mock console: aux in 05 on, fader 0.75");
        tokio::time::sleep(ACTION_DELAY).await;
        self.actions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
