//! Topic broadcasting
//!
//! The broadcaster turns a [`SystemMessage`] into a transport frame and queues
//! it for the network sender task, which resolves the topic's current
//! subscribers at send time. Delivery is best effort: a subscriber that left
//! before the frame went out never receives it, and nothing is retried.

use log::{debug, error};
use shared::{Packet, ProtocolError, SystemMessage};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// A message addressed to a topic
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub topic: String,
    pub message: SystemMessage,
}

impl Broadcast {
    pub fn new(topic: impl Into<String>, message: SystemMessage) -> Self {
        Self {
            topic: topic.into(),
            message,
        }
    }
}

/// Messages sent from the main loop to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    PublishPacket { topic: String, packet: Packet },
}

/// Cloneable handle for queueing outgoing frames
#[derive(Debug, Clone)]
pub struct Broadcaster {
    game_tx: mpsc::UnboundedSender<GameMessage>,
}

impl Broadcaster {
    pub fn new(game_tx: mpsc::UnboundedSender<GameMessage>) -> Self {
        Self { game_tx }
    }

    /// Queues `message` for every subscriber of `topic`
    pub fn broadcast(&self, topic: &str, message: &SystemMessage) -> Result<(), ProtocolError> {
        let packet = Packet::broadcast(topic, message)?;
        debug!("Broadcasting on {}", topic);

        if let Err(e) = self.game_tx.send(GameMessage::PublishPacket {
            topic: topic.to_string(),
            packet,
        }) {
            error!("Failed to queue broadcast on {}: {}", topic, e);
        }
        Ok(())
    }

    pub fn publish(&self, broadcast: &Broadcast) -> Result<(), ProtocolError> {
        self.broadcast(&broadcast.topic, &broadcast.message)
    }

    /// Queues a frame for a single address
    pub fn send(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for {}: {}", addr, e);
        }
    }
}
