//! Transport-agnostic half of the client session
//!
//! [`SessionProxy`] tracks the subscription state, queues outgoing packets and
//! dispatches incoming ones to the registered handlers. Socket I/O lives in
//! [`crate::network::NetworkClient`].

use log::{debug, info, warn};
use shared::{Action, Packet, ProtocolError, SystemMessage};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub type ConnectedHandler = Box<dyn FnMut(&str) + Send>;
pub type ReceivedHandler = Box<dyn FnMut(&SystemMessage) + Send>;
pub type DisconnectedHandler = Box<dyn FnMut(&str) + Send>;

pub struct SessionProxy {
    identity: Option<String>,
    state: ConnectionState,
    outgoing: VecDeque<Packet>,
    /// Actions performed before the subscription was confirmed
    pending: VecDeque<Packet>,

    on_connected: Option<ConnectedHandler>,
    on_received: Option<ReceivedHandler>,
    on_disconnected: Option<DisconnectedHandler>,
}

impl SessionProxy {
    pub fn new() -> Self {
        Self {
            identity: None,
            state: ConnectionState::Disconnected,
            outgoing: VecDeque::new(),
            pending: VecDeque::new(),
            on_connected: None,
            on_received: None,
            on_disconnected: None,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn set_on_connected<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_connected = Some(Box::new(handler));
    }

    pub fn set_on_received<F>(&mut self, handler: F)
    where
        F: FnMut(&SystemMessage) + Send + 'static,
    {
        self.on_received = Some(Box::new(handler));
    }

    pub fn set_on_disconnected<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_disconnected = Some(Box::new(handler));
    }

    pub fn clear_handlers(&mut self) {
        self.on_connected = None;
        self.on_received = None;
        self.on_disconnected = None;
    }

    /// Queues a subscription for `identity`. Reconnecting with a new identity
    /// replaces the old one.
    pub fn connect(&mut self, identity: &str) {
        info!("Subscribing as {}", identity);
        self.identity = Some(identity.to_string());
        self.state = ConnectionState::Connecting;
        self.outgoing.push_back(Packet::Subscribe {
            identity: identity.to_string(),
        });
    }

    /// Queues an action. Returns false when there is no session to carry it.
    pub fn perform(&mut self, action: &Action) -> Result<bool, ProtocolError> {
        let packet = Packet::perform(action)?;

        match self.state {
            ConnectionState::Disconnected => {
                debug!("Dropping {} while disconnected", action.name());
                Ok(false)
            }
            ConnectionState::Connecting => {
                self.pending.push_back(packet);
                Ok(true)
            }
            ConnectionState::Connected => {
                self.outgoing.push_back(packet);
                Ok(true)
            }
        }
    }

    /// Keeps a confirmed session alive, or repeats the subscription while the
    /// confirmation is outstanding.
    pub fn heartbeat(&mut self) {
        match (self.state, self.identity.as_deref()) {
            (ConnectionState::Connected, _) => self.outgoing.push_back(Packet::Heartbeat),
            (ConnectionState::Connecting, Some(identity)) => {
                debug!("No confirmation yet, resubscribing as {}", identity);
                let packet = Packet::Subscribe {
                    identity: identity.to_string(),
                };
                self.outgoing.push_back(packet);
            }
            _ => {}
        }
    }

    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.outgoing.push_back(Packet::Unsubscribe);
        self.drop_session("client disconnected");
    }

    fn drop_session(&mut self, reason: &str) {
        self.state = ConnectionState::Disconnected;
        self.pending.clear();

        if let Some(handler) = self.on_disconnected.as_mut() {
            handler(reason);
        }
    }

    /// Drains packets waiting to be sent.
    pub fn take_outgoing(&mut self) -> Vec<Packet> {
        self.outgoing.drain(..).collect()
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Confirmed { identity } => {
                if self.identity.as_deref() != Some(identity.as_str()) {
                    warn!("Confirmation for unexpected identity {}", identity);
                    return;
                }
                if self.state != ConnectionState::Connecting {
                    return;
                }

                info!("Subscribed as {}", identity);
                self.state = ConnectionState::Connected;
                self.outgoing.extend(self.pending.drain(..));

                if let Some(handler) = self.on_connected.as_mut() {
                    handler(&identity);
                }
            }

            Packet::Broadcast { topic, message } => match SystemMessage::from_json(&message) {
                Ok(message) => {
                    debug!("Received message on {}", topic);
                    if let Some(handler) = self.on_received.as_mut() {
                        handler(&message);
                    }
                }
                Err(e) => warn!("Ignoring broadcast on {}: {}", topic, e),
            },

            Packet::Rejected { reason } => {
                warn!("Server rejected session: {}", reason);
                self.drop_session(&reason);
            }

            _ => {
                warn!("Unexpected packet type from server");
            }
        }
    }
}

impl Default for SessionProxy {
    fn default() -> Self {
        Self::new()
    }
}
