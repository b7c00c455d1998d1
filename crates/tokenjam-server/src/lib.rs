//! # tokenjam-server
//!
//! Axum HTTP + `WebSocket` transport for a tokenjam session.
//!
//! - `/ws`: live channel, one subscriber per connection
//! - `/control?<command>`: operator commands
//! - `/health`: liveness plus a session status read
//! - everything else: static frontend assets
//! - [`ShutdownCoordinator`]: owns the long-lived tasks and stops them on Ctrl-C

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::TokenjamServer;
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
