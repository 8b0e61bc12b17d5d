//! Shared harness for cantor-ap integration tests
//!
//! Builds a full `AppContext` over the simulated driver and mock console,
//! and gives tests direct access to both for inspection and fault injection.

#![allow(dead_code)]

use std::sync::Arc;

use cantor_ap::api::{AppContext, ClientHandle};
use cantor_ap::config::Config;
use cantor_ap::console::MockConsole;
use cantor_ap::device::SimulatedDriver;
use cantor_common::ServerEvent;
use tokio::sync::{broadcast, mpsc};

pub struct Harness {
    pub ctx: AppContext,
    pub driver: Arc<SimulatedDriver>,
    pub console: Arc<MockConsole>,
}

pub async fn harness_with(config: Config) -> Harness {
    let driver = Arc::new(SimulatedDriver::new());
    let console = Arc::new(MockConsole::new());
    let ctx = AppContext::build(&config, driver.clone(), console.clone()).await;
    Harness {
        ctx,
        driver,
        console,
    }
}

pub async fn harness() -> Harness {
    harness_with(Config::default()).await
}

/// Config with privileged login enabled
pub fn privileged_config(password: &str) -> Config {
    let mut config = Config::default();
    config.auth.admin_password = Some(password.to_string());
    config
}

pub struct TestClient {
    pub handle: ClientHandle,
    pub direct: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    pub fn connect() -> Self {
        let (handle, direct) = ClientHandle::channel();
        Self { handle, direct }
    }

    /// Everything sent to this client alone so far
    pub fn replies(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.direct.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Everything broadcast so far
pub fn drain(rx: &mut broadcast::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Broadcast events without the lock indicator traffic
pub fn without_lock(events: Vec<ServerEvent>) -> Vec<ServerEvent> {
    events
        .into_iter()
        .filter(|e| !matches!(e, ServerEvent::LockChanged(_)))
        .collect()
}
