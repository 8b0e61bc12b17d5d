//! WebSocket control channel
//!
//! One task writes to the socket (direct replies, broadcasts, heartbeat
//! pings); the connection task reads frames and spawns a dispatch per
//! request so a long fade never blocks getters from the same client.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use cantor_common::{ClientRequest, ServerEvent};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use super::handlers::{dispatch, ClientHandle};
use super::server::AppContext;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (client, mut direct_rx) = ClientHandle::channel();
    let client_id = client.id;
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = ctx.events.subscribe();
    let ping_every = ctx.ping_interval;

    info!(client = %client_id, "Client connected");

    let mut writer = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);
        loop {
            let event = tokio::select! {
                Some(event) = direct_rx.recv() => event,
                received = broadcast_rx.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(client = %client_id, skipped, "Client lagging, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize {}: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let reader_ctx = ctx.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match ClientRequest::from_json(&text) {
                    Ok(request) => {
                        let ctx = reader_ctx.clone();
                        let client = client.clone();
                        tokio::spawn(async move {
                            dispatch(&ctx, &client, request).await;
                        });
                    }
                    Err(e) => {
                        debug!(client = %client.id, "Unparsable frame: {}", e);
                        client.send(ServerEvent::RequestFailed {
                            request: "unknown".to_string(),
                            reason: e.to_string(),
                        });
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    ctx.sessions.remove(client_id);
    info!(client = %client_id, "Client disconnected");
}
