//! HTTP and WebSocket transport for Deskpilot.
//!
//! Every route delegates to a `CommandHandler`; the gateway only maps
//! payloads and errors onto HTTP.

pub mod server;
pub mod ws;

pub use server::{ApiError, AppState, ErrorResponse, GatewayConfig, GatewayServer};
pub use ws::reply_to;
