//! # Cantor Audio Player Library (cantor-ap)
//!
//! Remote-controlled playback of a small catalog of looping background
//! tracks plus a mixing console, shared by many simultaneous clients.
//!
//! **Architecture:**
//! - `lock`: attempt-once exclusive gate, privileged override, coordinator
//! - `player`: logical state machine (Paused/Playing, volume, mute, track)
//! - `device`: fades, track switching and position restore over an
//!   [`device::driver::AudioDriver`]
//! - `console`: mixing desk actions
//! - `api`: WebSocket/SSE/HTTP transport and request dispatch

pub mod api;
pub mod auth;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod lock;
pub mod player;

pub use error::{Error, Result};
