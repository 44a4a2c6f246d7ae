//! Websocket wrapper shared by a shard's read loop, heartbeat and callers
//!
//! Structural operations (connect, close) and writes are serialised by the
//! writer mutex. Reads hold a separate mutex so a blocked read never stalls a
//! heartbeat; `close` interrupts a pending read through the connection's
//! cancellation token.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::SocketError;

/// A frame the gateway cares about; pings and pongs are handled below this layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: Option<u16>, reason: String },
}

/// Write half of a connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError>;

    /// Send a normal-closure frame and tear down the transport
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Read half of a connection; `None` once the transport is gone
#[async_trait]
pub trait FrameStream: Send {
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>>;
}

/// Opens websocket connections
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), SocketError>;
}

/// One websocket at a time, reconnectable
pub struct Socket {
    connector: Arc<dyn Connector>,
    writer: Mutex<Option<Box<dyn FrameSink>>>,
    reader: Mutex<Option<Box<dyn FrameStream>>>,
    connection: parking_lot::Mutex<CancellationToken>,
}

impl Socket {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connection: parking_lot::Mutex::new(CancellationToken::new()),
        }
    }

    pub async fn connect(&self, url: &str) -> Result<(), SocketError> {
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Err(SocketError::AlreadyConnected);
        }

        let (sink, stream) = self.connector.connect(url).await?;

        *self.connection.lock() = CancellationToken::new();
        *self.reader.lock().await = Some(stream);
        *writer = Some(sink);
        Ok(())
    }

    /// Read the next text frame and decode it
    ///
    /// Returns `NotConnected` when called without a connection or when the
    /// connection is closed while waiting.
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, SocketError> {
        let connection = self.connection.lock().clone();
        let mut reader = self.reader.lock().await;
        let Some(stream) = reader.as_mut() else {
            return Err(SocketError::NotConnected);
        };

        let frame = tokio::select! {
            biased;
            () = connection.cancelled() => None,
            frame = stream.next_frame() => Some(frame),
        };

        match frame {
            Some(Some(Ok(Frame::Text(text)))) => Ok(serde_json::from_str(&text)?),
            Some(Some(Ok(Frame::Close { code, reason }))) => {
                *reader = None;
                Err(SocketError::Closed { code, reason })
            }
            Some(Some(Err(err))) => {
                *reader = None;
                Err(err)
            }
            Some(None) => {
                *reader = None;
                Err(SocketError::Closed {
                    code: None,
                    reason: "stream ended".to_string(),
                })
            }
            None => {
                *reader = None;
                Err(SocketError::NotConnected)
            }
        }
    }

    pub async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), SocketError> {
        let text = serde_json::to_string(value)?;
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(SocketError::NotConnected)?;
        sink.send_text(text).await
    }

    /// Close the connection; a no-op when already closed
    pub async fn close(&self) {
        self.connection.lock().cancel();

        let mut writer = self.writer.lock().await;
        let Some(mut sink) = writer.take() else {
            return;
        };

        if let Err(err) = sink.close().await {
            tracing::debug!(error = %err, "Error while closing websocket");
        }

        // A pending read drops the stream itself once it sees the cancellation
        if let Ok(mut reader) = self.reader.try_lock() {
            *reader = None;
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket").finish_non_exhaustive()
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn transport(err: impl std::fmt::Display) -> SocketError {
    SocketError::Transport(err.to_string())
}

/// [`Connector`] backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), SocketError> {
        let (stream, _response) = connect_async(url).await.map_err(transport)?;
        let (sink, source) = stream.split();
        Ok((Box::new(WsSink(sink)), Box::new(WsSource(source))))
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.0.send(Message::Text(text)).await.map_err(transport)
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        let frame = CloseFrame {
            code: WsCloseCode::Normal,
            reason: Cow::Borrowed(""),
        };
        if let Err(err) = self.0.send(Message::Close(Some(frame))).await {
            tracing::trace!(error = %err, "Close frame not delivered");
        }
        self.0.close().await.map_err(transport)
    }
}

struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl FrameStream for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>> {
        loop {
            let message = match self.0.next().await? {
                Ok(message) => message,
                Err(err) => return Some(Err(transport(err))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Binary(bytes) => {
                    return Some(String::from_utf8(bytes).map(Frame::Text).map_err(transport));
                }
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    return Some(Ok(Frame::Close { code, reason }));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
