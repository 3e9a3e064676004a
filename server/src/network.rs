//! Server network layer handling UDP communications and action dispatch

use crate::broadcaster::{Broadcast, Broadcaster, GameMessage};
use crate::channel::GamesChannel;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use log::{debug, error, info, warn};
use shared::{Action, Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { identity: String },
    Shutdown,
}

/// Main server coordinating subscribers and the games channel
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    channel: GamesChannel,
    broadcaster: Broadcaster,
    subscriber_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_subscribers))),
            channel: GamesChannel::new(config.build_store()),
            broadcaster: Broadcaster::new(game_tx),
            subscriber_timeout: config.subscriber_timeout,
            server_tx,
            server_rx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping [`Server::run`] from another task
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn channel(&self) -> &GamesChannel {
        &self.channel
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut game_rx) = self.game_rx.take() else {
            warn!("Network sender already running");
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::PublishPacket { topic, packet } => {
                        let recipients = {
                            let clients_guard = clients.read().await;
                            clients_guard.subscribers_of(&topic)
                        };

                        if recipients.is_empty() {
                            debug!("No subscribers on {}, dropping", topic);
                            continue;
                        }

                        let data = match packet.encode() {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast on {}: {}", topic, e);
                                continue;
                            }
                        };

                        for (client_id, addr) in recipients {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                debug!("Dropped broadcast to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors subscriber timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.subscriber_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for subscriber in timed_out {
                    let message = ServerMessage::ClientTimeout {
                        identity: subscriber.identity,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn publish(&self, broadcasts: Vec<Broadcast>) {
        for broadcast in &broadcasts {
            if let Err(e) = self.broadcaster.publish(broadcast) {
                error!("Failed to publish on {}: {}", broadcast.topic, e);
            }
        }
    }

    /// Tells a dropped subscriber to start over
    fn reject_unsubscribed(&self, addr: SocketAddr) {
        let response = Packet::Rejected {
            reason: "not subscribed".to_string(),
        };
        self.broadcaster.send(response, addr);
    }

    /// The device stays online while another address holds the identity
    async fn handle_timeout(&mut self, identity: &str) {
        let still_subscribed = self.clients.read().await.has_identity(identity);
        if !still_subscribed {
            self.channel.unsubscribed(identity);
        }
    }

    /// Processes incoming packets and applies actions to the games channel
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Subscribe { identity } => {
                let (client_id, replaced) = {
                    let mut clients = self.clients.write().await;
                    let previous = clients.identity_at(addr);
                    let client_id = clients.subscribe(addr, &identity);
                    let replaced =
                        previous.filter(|old| *old != identity && !clients.has_identity(old));
                    (client_id, replaced)
                };

                if let Some(old_identity) = replaced {
                    self.channel.unsubscribed(&old_identity);
                }

                if client_id.is_some() {
                    self.channel.subscribed(&identity);
                    self.broadcaster.send(Packet::Confirmed { identity }, addr);
                } else {
                    let response = Packet::Rejected {
                        reason: "Server full".to_string(),
                    };
                    self.broadcaster.send(response, addr);
                }
            }

            Packet::Perform { data } => {
                let identity = {
                    let mut clients = self.clients.write().await;
                    clients.refresh(addr)
                };

                let Some(identity) = identity else {
                    warn!("Action from unsubscribed address {}", addr);
                    self.reject_unsubscribed(addr);
                    return;
                };

                match Action::from_json(&data) {
                    Ok(action) => {
                        let broadcasts = self.channel.perform(&identity, action);
                        self.publish(broadcasts);
                    }
                    Err(e) => warn!("Ignoring action from {}: {}", identity, e),
                }
            }

            Packet::Heartbeat => {
                let identity = {
                    let mut clients = self.clients.write().await;
                    clients.refresh(addr)
                };
                if identity.is_none() {
                    debug!("Heartbeat from unsubscribed address {}", addr);
                    self.reject_unsubscribed(addr);
                }
            }

            Packet::Unsubscribe => {
                let gone = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .and_then(|client_id| clients.remove_client(&client_id))
                        .filter(|subscriber| !clients.has_identity(&subscriber.identity))
                };

                if let Some(subscriber) = gone {
                    self.channel.unsubscribed(&subscriber.identity);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ClientTimeout { identity } => {
                    info!("Subscriber {} timed out", identity);
                    self.handle_timeout(&identity).await;
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
