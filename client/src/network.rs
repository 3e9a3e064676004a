use crate::session::SessionProxy;
use log::{debug, warn};
use shared::{Action, Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP carrier for a [`SessionProxy`]
pub struct NetworkClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    proxy: SessionProxy,
    buffer: Vec<u8>,
}

impl NetworkClient {
    pub async fn new(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let bind_addr = if server_addr.ip().is_loopback() {
            "127.0.0.1:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        Ok(NetworkClient {
            socket,
            server_addr,
            proxy: SessionProxy::new(),
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn proxy(&self) -> &SessionProxy {
        &self.proxy
    }

    /// Access for registering handlers
    pub fn proxy_mut(&mut self) -> &mut SessionProxy {
        &mut self.proxy
    }

    pub fn is_connected(&self) -> bool {
        self.proxy.is_connected()
    }

    pub async fn connect(&mut self, identity: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.proxy.connect(identity);
        self.flush().await
    }

    pub async fn perform(&mut self, action: &Action) -> Result<bool, Box<dyn std::error::Error>> {
        let queued = self.proxy.perform(action)?;
        self.flush().await?;
        Ok(queued)
    }

    pub async fn heartbeat(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.proxy.heartbeat();
        self.flush().await
    }

    pub async fn disconnect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.proxy.disconnect();
        self.flush().await
    }

    /// Sends everything the proxy has queued.
    pub async fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for packet in self.proxy.take_outgoing() {
            self.send_packet(&packet).await?;
        }
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = packet.encode()?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Waits for one datagram from the server and dispatches it through the
    /// proxy handlers. Cancel safe; packets released by a confirmation stay
    /// queued until the next [`NetworkClient::flush`].
    pub async fn receive(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (len, addr) = self.socket.recv_from(&mut self.buffer).await?;
        if addr != self.server_addr {
            debug!("Ignoring datagram from {}", addr);
            return Ok(());
        }

        match Packet::decode(&self.buffer[..len]) {
            Ok(packet) => self.proxy.handle_packet(packet),
            Err(e) => warn!("Dropping datagram from server: {}", e),
        }
        Ok(())
    }

    /// Receives and flushes, returning false if nothing arrived within
    /// `timeout`.
    pub async fn receive_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        match tokio::time::timeout(timeout, self.receive()).await {
            Ok(result) => {
                result?;
                self.flush().await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}
