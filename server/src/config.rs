use crate::store::GameStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::GAME_CAPACITY;
use std::time::Duration;

/// Runtime settings for [`crate::network::Server`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Players an active game may hold before it is rotated out
    pub capacity: usize,
    pub max_subscribers: usize,
    /// Silence after which a subscriber is dropped and its device goes offline
    pub subscriber_timeout: Duration,
    /// Fixed seed for avatar/color draws; entropy when unset
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            capacity: GAME_CAPACITY,
            max_subscribers: 256,
            subscriber_timeout: Duration::from_secs(10),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn build_store(&self) -> GameStore {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GameStore::new(self.capacity, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.capacity, 50);
        assert_eq!(config.subscriber_timeout, Duration::from_secs(10));
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_build_store_uses_capacity() {
        let config = ServerConfig {
            capacity: 3,
            seed: Some(1),
            ..ServerConfig::default()
        };
        assert_eq!(config.build_store().capacity(), 3);
    }

    #[test]
    fn test_server_binds_ephemeral_port() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };

        let server = tokio_test::block_on(crate::network::Server::new(&config)).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_bad_bind_address_fails() {
        let config = ServerConfig {
            bind_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        assert!(tokio_test::block_on(crate::network::Server::new(&config)).is_err());
    }
}
