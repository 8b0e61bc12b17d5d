//! Client-facing transport: WebSocket control channel, SSE monitor stream
//! and HTTP health/status endpoints

pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

pub use handlers::{dispatch, ClientHandle};
pub use server::{build_router, run, AppContext};
