//! `WebSocket` live channel.
//!
//! Each connection becomes one session subscriber. Outbound frames are the
//! subscriber's snapshots serialized as JSON; inbound text frames are
//! position updates for the subscriber's own token.

pub mod connection;

pub use connection::handle_socket;
