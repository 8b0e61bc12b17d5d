//! # Cantor Common Library
//!
//! Shared code for the Cantor controller:
//! - Wire types exchanged with remote clients (requests and events)
//! - Common error type
//! - Configuration file resolution and loading
//! - Fade curve schedules used for audible play/pause transitions

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;

pub use error::{Error, Result};
pub use events::{ClientRequest, EventBus, PlayState, ServerEvent, TrackId};
pub use fade_curves::{FadeDirection, FadeSchedule};
