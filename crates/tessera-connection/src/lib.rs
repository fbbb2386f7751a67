//! # tessera-connection
//!
//! Resilient bidirectional realtime channel.
//!
//! - [`ConnectionManager`]: endpoint + credentials in, single-flight dials,
//!   one fixed-delay reconnect timer per failure window, generation-tagged
//!   sockets so a cleared channel never hears from its old socket
//! - [`Connector`]: dial seam; [`WsConnector`] speaks WebSocket through
//!   `tokio-tungstenite`
//! - [`Frame`]: text or binary message, FIFO within one socket

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod transport;

pub use errors::ConnectionError;
pub use manager::{
    AuthToken, ConnectionConfig, ConnectionManager, ConnectionStats, ConnectionStatus,
    DEFAULT_RECONNECT_DELAY,
};
pub use transport::{Connector, Frame, FrameSink, FrameStream, WsConnector};
