//! In-memory gateway peer for shard and manager tests

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::error::SocketError;
use crate::protocol::EventPacket;
use crate::socket::{Connector, Frame, FrameSink, FrameStream};

/// Hands every accepted connection to the test as a [`PeerConnection`]
pub(crate) struct ScriptedConnector {
    peers: mpsc::UnboundedSender<PeerConnection>,
    refuse: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<PeerConnection>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            refuse: AtomicUsize::new(0),
        };
        (connector, accepted)
    }

    /// Refuse the next `count` connection attempts
    pub(crate) fn refusing(self, count: usize) -> Self {
        self.refuse.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), SocketError> {
        if self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SocketError::Transport("connection refused".to_string()));
        }

        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();

        self.peers
            .send(PeerConnection {
                url: url.to_string(),
                to_client,
                from_client,
            })
            .map_err(|_| SocketError::Transport("test peer dropped".to_string()))?;

        Ok((
            Box::new(ChannelSink(Some(client_tx))),
            Box::new(ChannelStream(client_rx)),
        ))
    }
}

/// Server side of one scripted connection
pub(crate) struct PeerConnection {
    pub(crate) url: String,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl PeerConnection {
    pub(crate) fn send_json<T: Serialize>(&self, value: &T) {
        let text = serde_json::to_string(value).unwrap();
        // The client may already have gone away
        let _ = self.to_client.send(Frame::Text(text));
    }

    pub(crate) fn send(&self, packet: &EventPacket) {
        self.send_json(packet);
    }

    pub(crate) fn close_with(&self, code: u16) {
        let _ = self.to_client.send(Frame::Close {
            code: Some(code),
            reason: String::new(),
        });
    }

    pub(crate) async fn next_json(&mut self) -> Value {
        let text = self
            .from_client
            .recv()
            .await
            .expect("client closed before sending");
        serde_json::from_str(&text).unwrap()
    }

    pub(crate) async fn next_packet(&mut self) -> EventPacket {
        serde_json::from_value(self.next_json().await).unwrap()
    }

    /// Packets in arrival order; heartbeat and identify race after hello
    pub(crate) async fn next_packets(&mut self, count: usize) -> Vec<EventPacket> {
        let mut packets = Vec::with_capacity(count);
        for _ in 0..count {
            packets.push(self.next_packet().await);
        }
        packets
    }

    /// Whether the client closed its side, draining anything still queued
    pub(crate) async fn is_closed(&mut self) -> bool {
        while self.from_client.recv().await.is_some() {}
        true
    }
}

struct ChannelSink(Option<mpsc::UnboundedSender<String>>);

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        let sender = self.0.as_ref().ok_or(SocketError::NotConnected)?;
        sender
            .send(text)
            .map_err(|_| SocketError::Transport("peer gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.0.take();
        Ok(())
    }
}

struct ChannelStream(mpsc::UnboundedReceiver<Frame>);

#[async_trait]
impl FrameStream for ChannelStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>> {
        self.0.recv().await.map(Ok)
    }
}
