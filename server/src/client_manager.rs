//! Subscriber registry for the broadcast channel
//!
//! This module tracks every client that has subscribed to the server:
//! - Subscription lifecycle (subscribe, unsubscribe, timeout)
//! - The topics each subscriber listens on
//! - Address lookup so incoming datagrams can be tied to an identity
//!
//! Topic routing for broadcasts is resolved here, so a subscriber that is gone
//! simply stops appearing in the recipient list.

use log::info;
use shared::{identity_topic, COMMANDS_TOPIC};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A subscribed client
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Connection id assigned by the server
    pub id: u32,
    /// Identity the client subscribed with, also its device id
    pub identity: String,
    /// Network address for sending broadcasts
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Topics this subscriber receives
    pub topics: BTreeSet<String>,
}

impl Subscriber {
    /// Creates a subscriber listening on the global commands topic and on its
    /// own identity topic.
    pub fn new(id: u32, identity: &str, addr: SocketAddr) -> Self {
        let topics = [COMMANDS_TOPIC.to_string(), identity_topic(identity)]
            .into_iter()
            .collect();

        Self {
            id,
            identity: identity.to_string(),
            addr,
            last_seen: Instant::now(),
            topics,
        }
    }

    pub fn is_subscribed_to(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Returns true if no packets have been received within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all subscribers and their topic membership
pub struct ClientManager {
    /// Subscribers indexed by connection id
    clients: HashMap<u32, Subscriber>,
    /// Next available connection id
    next_client_id: u32,
    /// Maximum number of concurrent subscribers allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Subscribes the client at `addr` under `identity`
    ///
    /// A repeated subscription from the same address replaces the previous
    /// one and keeps its connection id. Returns None if the server is full.
    pub fn subscribe(&mut self, addr: SocketAddr, identity: &str) -> Option<u32> {
        if let Some(existing_id) = self.find_client_by_addr(addr) {
            let subscriber = Subscriber::new(existing_id, identity, addr);
            info!("Client {} resubscribed as {}", existing_id, identity);
            self.clients.insert(existing_id, subscriber);
            return Some(existing_id);
        }

        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} subscribed as {} from {}", client_id, identity, addr);
        self.clients
            .insert(client_id, Subscriber::new(client_id, identity, addr));

        Some(client_id)
    }

    /// Removes a subscriber, returning it if it was present
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Subscriber> {
        let removed = self.clients.remove(client_id);
        if let Some(subscriber) = &removed {
            info!("Client {} ({}) unsubscribed", subscriber.id, subscriber.identity);
        }
        removed
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn identity_at(&self, addr: SocketAddr) -> Option<String> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.identity.clone())
    }

    /// True while any address is still subscribed under `identity`
    pub fn has_identity(&self, identity: &str) -> bool {
        self.clients.values().any(|client| client.identity == identity)
    }

    /// Marks the subscriber at `addr` as seen and returns its identity
    pub fn refresh(&mut self, addr: SocketAddr) -> Option<String> {
        self.clients
            .values_mut()
            .find(|client| client.addr == addr)
            .map(|client| {
                client.last_seen = Instant::now();
                client.identity.clone()
            })
    }

    /// Removes and returns subscribers silent for longer than `timeout`
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<Subscriber> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    /// Connection ids and addresses of everyone listening on `topic`
    pub fn subscribers_of(&self, topic: &str) -> Vec<(u32, SocketAddr)> {
        self.clients
            .values()
            .filter(|client| client.is_subscribed_to(topic))
            .map(|client| (client.id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_subscriber_topics() {
        let subscriber = Subscriber::new(1, "d1", test_addr());

        assert!(subscriber.is_subscribed_to("commands"));
        assert!(subscriber.is_subscribed_to("commands-d1"));
        assert!(!subscriber.is_subscribed_to("commands-d2"));
    }

    #[test]
    fn test_subscriber_timeout() {
        let mut subscriber = Subscriber::new(1, "d1", test_addr());
        assert!(!subscriber.is_timed_out(Duration::from_secs(1)));

        subscriber.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(subscriber.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_subscribe_assigns_ids() {
        let mut manager = ClientManager::new(3);

        assert_eq!(manager.subscribe(test_addr(), "d1"), Some(1));
        assert_eq!(manager.subscribe(test_addr2(), "d2"), Some(2));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_resubscribe_from_same_address() {
        let mut manager = ClientManager::new(1);

        let first = manager.subscribe(test_addr(), "d1");
        let second = manager.subscribe(test_addr(), "d1-renamed");

        assert_eq!(first, second);
        assert_eq!(manager.len(), 1);
        assert!(manager.subscribers_of("commands-d1").is_empty());
        assert_eq!(manager.subscribers_of("commands-d1-renamed").len(), 1);
    }

    #[test]
    fn test_subscribe_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.subscribe(test_addr(), "d1").is_some());
        assert!(manager.subscribe(test_addr2(), "d2").is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        let client_id = manager.subscribe(test_addr(), "d1").unwrap();

        let removed = manager.remove_client(&client_id).unwrap();
        assert_eq!(removed.identity, "d1");
        assert!(manager.is_empty());
        assert!(manager.remove_client(&client_id).is_none());
    }

    #[test]
    fn test_refresh_returns_identity() {
        let mut manager = ClientManager::new(2);
        manager.subscribe(test_addr(), "d1");

        assert_eq!(manager.refresh(test_addr()), Some("d1".to_string()));
        assert_eq!(manager.refresh(test_addr2()), None);
    }

    #[test]
    fn test_topic_routing() {
        let mut manager = ClientManager::new(3);
        let id1 = manager.subscribe(test_addr(), "d1").unwrap();
        manager.subscribe(test_addr2(), "d2");

        assert_eq!(manager.subscribers_of("commands").len(), 2);
        assert_eq!(
            manager.subscribers_of("commands-d1"),
            vec![(id1, test_addr())]
        );
        assert!(manager.subscribers_of("commands-d3").is_empty());
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::new(3);
        let id1 = manager.subscribe(test_addr(), "d1").unwrap();
        manager.subscribe(test_addr2(), "d2");

        if let Some(client) = manager.clients.get_mut(&id1) {
            client.last_seen = Instant::now() - Duration::from_secs(30);
        }

        let removed = manager.check_timeouts(Duration::from_secs(10));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].identity, "d1");
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_identity_lookup_across_addresses() {
        let mut manager = ClientManager::new(3);
        manager.subscribe(test_addr(), "d1");
        let id2 = manager.subscribe(test_addr2(), "d1").unwrap();

        assert_eq!(manager.identity_at(test_addr()), Some("d1".to_string()));
        manager.remove_client(&id2);
        assert!(manager.has_identity("d1"));

        manager.subscribe(test_addr(), "d9");
        assert!(!manager.has_identity("d1"));
        assert!(manager.has_identity("d9"));
    }
}
