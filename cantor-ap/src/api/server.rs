//! HTTP server setup and routing
//!
//! Routes:
//! - `GET /ws`: control channel (WebSocket, JSON `{"event", "data"}` frames)
//! - `GET /events`: SSE stream of broadcast events
//! - `GET /health`, `GET /status`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use cantor_common::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::SessionRegistry;
use crate::config::Config;
use crate::console::MixingConsole;
use crate::device::driver::AudioDriver;
use crate::device::tracks::TrackCatalog;
use crate::device::PlaybackDevice;
use crate::error::{Error, Result};
use crate::lock::LockCoordinator;
use crate::player::Player;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub coordinator: Arc<LockCoordinator>,
    pub player: Arc<Player>,
    pub console: Arc<dyn MixingConsole>,
    pub sessions: Arc<SessionRegistry>,
    pub events: EventBus,
    /// WebSocket heartbeat period
    pub ping_interval: Duration,
}

impl AppContext {
    /// Wire the components together and bring the device to its initial state
    pub async fn build(
        config: &Config,
        driver: Arc<dyn AudioDriver>,
        console: Arc<dyn MixingConsole>,
    ) -> Self {
        let events = EventBus::new(config.server.event_capacity);
        let catalog = TrackCatalog::new(config.track_list());
        let device = PlaybackDevice::from_config(driver, catalog, &config.device);

        let player = Arc::new(Player::new(device, &config.player));
        player.initialize().await;

        Self {
            coordinator: LockCoordinator::new(config.lock.privileged_mode, events.clone()),
            player,
            console,
            sessions: Arc::new(SessionRegistry::new(config.auth.admin_password.as_deref())),
            events,
            ping_interval: Duration::from_secs(config.server.ping_interval_secs.max(1)),
        }
    }
}

pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/status", get(super::handlers::status))
        .route("/ws", get(super::ws::ws_handler))
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn run(
    ctx: AppContext,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
