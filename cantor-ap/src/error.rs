//! Error types for cantor-ap
//!
//! Contention on the exclusive gate is not an error: it is reported as a
//! rejected (`None` / `false`) outcome by the lock layer. Everything here is a
//! genuine failure that propagates to the request handler.

use thiserror::Error;

use cantor_common::TrackId;

/// Main error type for cantor-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Audio driver call failed
    #[error("Device error: {0}")]
    Device(String),

    /// Playback position could not be restored after a track switch
    #[error("Failed to set playback time to {target:.3}s after {attempts} attempts ({last})")]
    PositionRestore {
        target: f64,
        attempts: u32,
        /// Outcome of the final read-back (mismatch or device error)
        last: String,
    },

    /// Mixing console errors
    #[error("Console error: {0}")]
    Console(String),

    /// Track not present in the configured catalog
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// File / socket I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from cantor-common
    #[error(transparent)]
    Common(#[from] cantor_common::Error),
}

/// Convenience Result type using cantor-ap Error
pub type Result<T> = std::result::Result<T, Error>;
