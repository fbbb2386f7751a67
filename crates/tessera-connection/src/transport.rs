//! Transport seam: frames, the [`Connector`] trait, and the WebSocket
//! implementation over `tokio-tungstenite`.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::trace;
use url::Url;

use crate::errors::ConnectionError;

/// One application-level message on the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text (JSON payloads).
    Text(String),
    /// Opaque binary payload.
    Binary(Bytes),
}

impl Frame {
    /// Text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outbound half of an open socket.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = ConnectionError> + Send>>;

/// Inbound half of an open socket. Ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, ConnectionError>> + Send>>;

/// Opens sockets for the connection manager.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `url` and return the split socket.
    async fn dial(&self, url: &Url) -> Result<(FrameSink, FrameStream), ConnectionError>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Ping/pong is answered by tungstenite itself; only text and binary
/// messages surface as [`Frame`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn dial(&self, url: &Url) -> Result<(FrameSink, FrameStream), ConnectionError> {
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::Dial(e.to_string()))?;
        let (ws_tx, ws_rx) = ws.split();

        let sink = ws_tx
            .sink_map_err(|e| ConnectionError::Transport(e.to_string()))
            .with(|frame: Frame| async move {
                Ok::<_, ConnectionError>(match frame {
                    Frame::Text(text) => Message::text(text),
                    Frame::Binary(bytes) => Message::binary(bytes),
                })
            });

        let stream = ws_rx.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes))),
                Ok(Message::Close(reason)) => {
                    trace!(?reason, "peer sent close");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(ConnectionError::Transport(e.to_string()))),
            }
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
