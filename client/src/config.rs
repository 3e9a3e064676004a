use crate::game::ClientGameState;
use crate::spawn::SpawnAllocator;
use shared::TICKS_PER_SECOND;
use std::time::Duration;

/// Runtime settings for the headless client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    /// Identity to subscribe with; also the player's client id
    pub device_id: String,
    pub screen_width: f32,
    pub screen_height: f32,
    /// Broadcast `start_game` once the player has joined
    pub start_game: bool,
    pub heartbeat_interval: Duration,
    /// Seconds between `save_game` submissions while running
    pub save_every_secs: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            device_id: "device-1".to_string(),
            screen_width: 1920.0,
            screen_height: 1080.0,
            start_game: false,
            heartbeat_interval: Duration::from_secs(2),
            save_every_secs: 5,
        }
    }
}

impl ClientConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / TICKS_PER_SECOND
    }

    pub fn build_game_state(&self) -> ClientGameState {
        ClientGameState::new(SpawnAllocator::new(self.screen_width, self.screen_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(2));
        assert!(!config.start_game);
    }

    #[test]
    fn test_tick_interval_matches_tick_rate() {
        let config = ClientConfig::default();
        assert_eq!(config.tick_interval().as_millis(), 16);
    }

    #[test]
    fn test_game_state_starts_empty() {
        let game = ClientConfig::default().build_game_state();
        assert_eq!(game.player_count(), 0);
        assert!(game.game_id().is_none());
    }

    #[test]
    fn test_network_client_starts_disconnected() {
        let config = ClientConfig::default();
        let network =
            tokio_test::block_on(crate::network::NetworkClient::new(&config.server_addr)).unwrap();

        assert!(!network.is_connected());
        assert!(network.proxy().identity().is_none());
    }
}
