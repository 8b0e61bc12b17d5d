//! Wire types exchanged between the controller and its remote clients
//!
//! Every frame on the client transport is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. Requests flow client → server,
//! events flow server → client (to the requester only, or to everyone).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::{Error, Result};

/// Playback state of the shared player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    /// Audio output paused (initial state)
    #[default]
    Paused,
    /// Audio output running
    Playing,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Paused => write!(f, "paused"),
            PlayState::Playing => write!(f, "playing"),
        }
    }
}

/// Identity of a configured track (e.g. `slow`, `fast`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requests a remote client may send
///
/// Credentials carried by [`ClientRequest::AuthenticatePrivileged`] must never
/// be logged; use [`ClientRequest::name`] for log output.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientRequest {
    GetVolume,
    ChangeVolume(u8),
    GetState,
    ChangeState(PlayState),
    GetMute,
    ChangeMute(bool),
    GetTrack,
    ChangeTrack { from: TrackId, to: TrackId },
    GetLock,
    AuthenticatePrivileged(String),
    MicOn,
    AuxOn,
}

impl ClientRequest {
    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    /// Wire name of the request
    pub fn name(&self) -> &'static str {
        match self {
            ClientRequest::GetVolume => "getVolume",
            ClientRequest::ChangeVolume(_) => "changeVolume",
            ClientRequest::GetState => "getState",
            ClientRequest::ChangeState(_) => "changeState",
            ClientRequest::GetMute => "getMute",
            ClientRequest::ChangeMute(_) => "changeMute",
            ClientRequest::GetTrack => "getTrack",
            ClientRequest::ChangeTrack { .. } => "changeTrack",
            ClientRequest::GetLock => "getLock",
            ClientRequest::AuthenticatePrivileged(_) => "authenticatePrivileged",
            ClientRequest::MicOn => "micOn",
            ClientRequest::AuxOn => "auxOn",
        }
    }
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientRequest::AuthenticatePrivileged(_) => {
                f.write_str("AuthenticatePrivileged(<redacted>)")
            }
            ClientRequest::ChangeVolume(v) => write!(f, "ChangeVolume({})", v),
            ClientRequest::ChangeState(s) => write!(f, "ChangeState({})", s),
            ClientRequest::ChangeMute(m) => write!(f, "ChangeMute({})", m),
            ClientRequest::ChangeTrack { from, to } => {
                write!(f, "ChangeTrack {{ from: {}, to: {} }}", from, to)
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Events the controller sends to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    VolumeChanged(u8),
    StateChanged(PlayState),
    MuteChanged(bool),
    TrackChanged(TrackId),
    LockChanged(bool),
    PrivilegedAuthenticated { success: bool },
    /// The shared resource was busy; the request was not applied
    RequestRejected { request: String },
    /// The request was attempted and failed
    RequestFailed { request: String, reason: String },
}

impl ServerEvent {
    /// Wire name of the event (also used as the SSE event field)
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::VolumeChanged(_) => "volumeChanged",
            ServerEvent::StateChanged(_) => "stateChanged",
            ServerEvent::MuteChanged(_) => "muteChanged",
            ServerEvent::TrackChanged(_) => "trackChanged",
            ServerEvent::LockChanged(_) => "lockChanged",
            ServerEvent::PrivilegedAuthenticated { .. } => "privilegedAuthenticated",
            ServerEvent::RequestRejected { .. } => "requestRejected",
            ServerEvent::RequestFailed { .. } => "requestFailed",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Broadcast channel reaching every connected client
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers (one per WebSocket / SSE connection)
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ServerEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<ServerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where nobody is connected
    pub fn emit_lossy(&self, event: ServerEvent) {
        let _ = self.emit(event);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_unit_request() {
        let req = ClientRequest::from_json(r#"{"event":"getVolume"}"#).unwrap();
        assert_eq!(req, ClientRequest::GetVolume);
    }

    #[test]
    fn test_parse_change_track() {
        let req = ClientRequest::from_json(
            r#"{"event":"changeTrack","data":{"from":"slow","to":"fast"}}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            ClientRequest::ChangeTrack {
                from: TrackId::from("slow"),
                to: TrackId::from("fast"),
            }
        );
    }

    #[test]
    fn test_parse_change_state() {
        let req = ClientRequest::from_json(r#"{"event":"changeState","data":"playing"}"#).unwrap();
        assert_eq!(req, ClientRequest::ChangeState(PlayState::Playing));
    }

    #[test]
    fn test_parse_rejects_out_of_range_volume() {
        assert!(ClientRequest::from_json(r#"{"event":"changeVolume","data":300}"#).is_err());
        assert!(ClientRequest::from_json(r#"{"event":"shutdown"}"#).is_err());
        assert!(ClientRequest::from_json("not json").is_err());
    }

    #[test]
    fn test_credential_is_redacted() {
        let req = ClientRequest::AuthenticatePrivileged("hunter2".to_string());
        let debug = format!("{:?}", req);
        assert!(!debug.contains("hunter2"));
        assert_eq!(req.name(), "authenticatePrivileged");
    }

    #[test]
    fn test_event_wire_format() {
        let value = serde_json::to_value(ServerEvent::VolumeChanged(35)).unwrap();
        assert_eq!(value, json!({"event": "volumeChanged", "data": 35}));

        let value = serde_json::to_value(ServerEvent::StateChanged(PlayState::Paused)).unwrap();
        assert_eq!(value, json!({"event": "stateChanged", "data": "paused"}));

        let value = serde_json::to_value(ServerEvent::TrackChanged("fast".into())).unwrap();
        assert_eq!(value, json!({"event": "trackChanged", "data": "fast"}));

        let value =
            serde_json::to_value(ServerEvent::PrivilegedAuthenticated { success: true }).unwrap();
        assert_eq!(
            value,
            json!({"event": "privilegedAuthenticated", "data": {"success": true}})
        );
    }

    #[tokio::test]
    async fn test_event_bus_fan_out() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(ServerEvent::LockChanged(true)).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap(), ServerEvent::LockChanged(true));
        assert_eq!(b.recv().await.unwrap(), ServerEvent::LockChanged(true));
    }

    #[test]
    fn test_event_bus_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(ServerEvent::MuteChanged(true)).is_err());
        bus.emit_lossy(ServerEvent::MuteChanged(true));
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        let events = [
            ServerEvent::VolumeChanged(1),
            ServerEvent::MuteChanged(true),
            ServerEvent::LockChanged(false),
            ServerEvent::RequestRejected { request: "changeVolume".into() },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}
