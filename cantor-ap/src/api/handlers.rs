//! Request dispatch
//!
//! Transport-independent handling of one client request. Getters answer the
//! requester from the coordinator's read view. Mutations go through the
//! lock coordinator and are announced according to who asked:
//! - ordinary clients: success is broadcast to everyone
//! - privileged clients: results go to the requester only; after a
//!   successful operation the live state is re-broadcast once the override
//!   has ended
//!
//! Contention is answered with `requestRejected`, failures with
//! `requestFailed`, both to the requester only and never broadcast.

use std::future::Future;

use axum::extract::State;
use axum::Json;
use cantor_common::{ClientRequest, EventBus, PlayState, ServerEvent};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::server::AppContext;
use crate::config::PrivilegedMode;
use crate::error::Result;
use crate::player::PlayerSnapshot;

/// Outbound side of one connected client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ClientHandle {
    /// New client with a fresh id and the receiver its writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Queue an event for this client only
    pub fn send(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!(client = %self.id, "Client gone, dropping direct event");
        }
    }
}

/// Who hears about a completed mutation
enum Audience<'a> {
    Everyone(&'a EventBus),
    Requester(&'a ClientHandle),
}

impl Audience<'_> {
    fn send(&self, event: ServerEvent) {
        match self {
            Audience::Everyone(bus) => bus.emit_lossy(event),
            Audience::Requester(client) => client.send(event),
        }
    }
}

fn fail(client: &ClientHandle, request: &ClientRequest, reason: impl Into<String>) {
    let reason = reason.into();
    warn!(client = %client.id, request = request.name(), %reason, "Request failed");
    client.send(ServerEvent::RequestFailed {
        request: request.name().to_string(),
        reason,
    });
}

/// Handle one parsed client request
pub async fn dispatch(ctx: &AppContext, client: &ClientHandle, request: ClientRequest) {
    debug!(client = %client.id, ?request, "Request received");

    match &request {
        ClientRequest::GetVolume => {
            let view = ctx.coordinator.current_read_view(&ctx.player).await;
            client.send(ServerEvent::VolumeChanged(view.volume));
        }
        ClientRequest::GetState => {
            let view = ctx.coordinator.current_read_view(&ctx.player).await;
            client.send(ServerEvent::StateChanged(view.play_state));
        }
        ClientRequest::GetMute => {
            let view = ctx.coordinator.current_read_view(&ctx.player).await;
            client.send(ServerEvent::MuteChanged(view.muted));
        }
        ClientRequest::GetTrack => {
            let view = ctx.coordinator.current_read_view(&ctx.player).await;
            client.send(ServerEvent::TrackChanged(view.current_track));
        }
        ClientRequest::GetLock => {
            client.send(ServerEvent::LockChanged(ctx.coordinator.locked()));
        }
        ClientRequest::AuthenticatePrivileged(credential) => {
            let success = ctx.sessions.authenticate(client.id, credential);
            client.send(ServerEvent::PrivilegedAuthenticated { success });
        }

        ClientRequest::ChangeVolume(volume) => {
            let volume = *volume;
            if volume > 100 {
                fail(client, &request, format!("volume {} out of range 0-100", volume));
                return;
            }
            let player = &ctx.player;
            apply_mutation(
                ctx,
                client,
                &request,
                || player.set_volume(volume),
                vec![ServerEvent::VolumeChanged(volume)],
            )
            .await;
        }
        ClientRequest::ChangeState(state) => {
            let state = *state;
            if ctx.player.play_state().await == state {
                debug!(%state, "Already in requested state, ignoring");
                return;
            }
            let player = &ctx.player;
            apply_mutation(
                ctx,
                client,
                &request,
                || player.set_play_state(state),
                vec![ServerEvent::StateChanged(state)],
            )
            .await;
        }
        ClientRequest::ChangeMute(muted) => {
            let muted = *muted;
            let player = &ctx.player;
            apply_mutation(
                ctx,
                client,
                &request,
                || player.set_mute(muted),
                vec![ServerEvent::MuteChanged(muted)],
            )
            .await;
        }
        ClientRequest::ChangeTrack { from, to } => {
            let catalog = ctx.player.catalog();
            if let Err(e) = catalog.get(from) {
                fail(client, &request, e.to_string());
                return;
            }
            let default_volume = match catalog.default_volume(to) {
                Ok(volume) => volume,
                Err(e) => {
                    fail(client, &request, e.to_string());
                    return;
                }
            };
            let player = &ctx.player;
            apply_mutation(
                ctx,
                client,
                &request,
                || player.change_track(from, to),
                vec![
                    ServerEvent::StateChanged(PlayState::Paused),
                    ServerEvent::TrackChanged(to.clone()),
                    ServerEvent::VolumeChanged(default_volume),
                ],
            )
            .await;
        }

        ClientRequest::MicOn => {
            let console = &ctx.console;
            run_console_action(ctx, client, &request, || console.enable_primary_mic()).await;
        }
        ClientRequest::AuxOn => {
            let console = &ctx.console;
            run_console_action(ctx, client, &request, || console.enable_aux_input()).await;
        }
    }
}

/// Run a player mutation under the lock coordinator and announce the outcome
async fn apply_mutation<F, Fut>(
    ctx: &AppContext,
    client: &ClientHandle,
    request: &ClientRequest,
    op: F,
    on_success: Vec<ServerEvent>,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let privileged = ctx.sessions.is_privileged(client.id);

    let outcome = if privileged {
        ctx.coordinator
            .run_privileged_operation(&ctx.player, op)
            .await
    } else {
        ctx.coordinator.run_user_operation(op).await
    };

    match outcome {
        Ok(Some(())) => {
            let audience = if privileged {
                Audience::Requester(client)
            } else {
                Audience::Everyone(&ctx.events)
            };
            for event in on_success {
                audience.send(event);
            }
            if privileged {
                broadcast_live_state(ctx).await;
            }
        }
        Ok(None) => {
            warn!(client = %client.id, request = request.name(), "Request rejected, player locked");
            client.send(ServerEvent::RequestRejected {
                request: request.name().to_string(),
            });
        }
        Err(e) => {
            error!(client = %client.id, request = request.name(), "Operation failed: {}", e);
            client.send(ServerEvent::RequestFailed {
                request: request.name().to_string(),
                reason: e.to_string(),
            });
        }
    }
}

async fn run_console_action<F, Fut>(
    ctx: &AppContext,
    client: &ClientHandle,
    request: &ClientRequest,
    op: F,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match ctx.coordinator.run_user_operation(op).await {
        Ok(Some(())) => debug!(request = request.name(), "Console action done"),
        Ok(None) => {
            warn!(client = %client.id, request = request.name(), "Console action rejected, player locked");
            client.send(ServerEvent::RequestRejected {
                request: request.name().to_string(),
            });
        }
        Err(e) => {
            error!(client = %client.id, request = request.name(), "Console action failed: {}", e);
            client.send(ServerEvent::RequestFailed {
                request: request.name().to_string(),
                reason: e.to_string(),
            });
        }
    }
}

/// Announce the live player state to everyone
async fn broadcast_live_state(ctx: &AppContext) {
    if ctx.coordinator.override_active() {
        return;
    }
    let live = ctx.player.snapshot().await;
    debug!(?live, "Re-broadcasting live state");
    ctx.events.emit_lossy(ServerEvent::VolumeChanged(live.volume));
    ctx.events.emit_lossy(ServerEvent::StateChanged(live.play_state));
    ctx.events.emit_lossy(ServerEvent::MuteChanged(live.muted));
    ctx.events.emit_lossy(ServerEvent::TrackChanged(live.current_track));
}

// ============================================================================
// HTTP endpoints
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    player: PlayerSnapshot,
    locked: bool,
    gate_held: bool,
    override_active: bool,
    privileged_mode: PrivilegedMode,
    privileged_login: bool,
    clients: usize,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "cantor-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status - read view plus lock flags
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        player: ctx.coordinator.current_read_view(&ctx.player).await,
        locked: ctx.coordinator.locked(),
        gate_held: ctx.coordinator.gate_held(),
        override_active: ctx.coordinator.override_active(),
        privileged_mode: ctx.coordinator.mode(),
        privileged_login: ctx.sessions.is_enabled(),
        clients: ctx.events.subscriber_count(),
    })
}
