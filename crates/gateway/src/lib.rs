//! Gateway: the WebSocket/HTTP server that hosts the main stream.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Build the main stream (and its admin stream) from config
//! 3. Start HTTP server (health, client config, login routes)
//! 4. Attach WebSocket upgrade handler; every socket frame goes through
//!    `methods::dispatch` under the stream lock
//!
//! Box content, request approval and fan-out live in `stream`, `requests`
//! and `dispatcher`; this crate owns all of them so one lock covers both
//! streams.

pub mod auth;
pub mod boxes;
pub mod dispatcher;
pub mod error;
pub mod methods;
pub mod requests;
pub mod server;
pub mod state;
pub mod stream;
pub mod ws;

pub use {
    error::StreamError,
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
    stream::{Stream, StreamPolicy},
};
