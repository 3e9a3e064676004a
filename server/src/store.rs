//! In-memory game store
//!
//! Owns every game record, the single active game, and device records. All
//! operations succeed by falling back: no active game creates one, an unknown
//! player id is treated as new, and an over-full game is rotated out.

use crate::game::{Device, Game, GameId, Player};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use shared::{GameInfo, AVATARS, COLORS, GAME_CAPACITY};
use std::collections::{BTreeMap, HashMap};

/// Result of registering a client id with a game.
#[derive(Debug, Clone, PartialEq)]
pub enum AddPlayerOutcome {
    Created(Player),
    /// The id was already on the roster; the caller re-announces it.
    Existing(Player),
}

pub struct GameStore {
    games: BTreeMap<GameId, Game>,
    devices: HashMap<String, Device>,
    next_game_id: GameId,
    next_player_id: u64,
    capacity: usize,
    rng: StdRng,
}

fn random_pair(rng: &mut StdRng) -> (&'static str, &'static str) {
    let avatar = AVATARS[rng.gen_range(0..AVATARS.len())];
    let color = COLORS[rng.gen_range(0..COLORS.len())];
    (avatar, color)
}

impl GameStore {
    pub fn new(capacity: usize, rng: StdRng) -> Self {
        Self {
            games: BTreeMap::new(),
            devices: HashMap::new(),
            next_game_id: 1,
            next_player_id: 1,
            capacity,
            rng,
        }
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::new(capacity, StdRng::seed_from_u64(seed))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn create_game(&mut self) -> GameId {
        let id = self.next_game_id;
        self.next_game_id += 1;
        self.games.insert(id, Game::new(id));
        info!("Created game {}", id);
        id
    }

    fn active_game_id(&self) -> Option<GameId> {
        self.games.values().find(|g| g.active).map(|g| g.id)
    }

    fn deactivate_all(&mut self) {
        for game in self.games.values_mut().filter(|g| g.active) {
            game.active = false;
            info!("Retired game {} with {} players", game.id, game.player_count());
        }
    }

    /// Returns the id of the active game, creating or rotating as needed.
    pub fn current_game_id(&mut self) -> GameId {
        let id = match self.active_game_id() {
            Some(id) => id,
            None => self.create_game(),
        };

        let player_count = self.games.get(&id).map_or(0, Game::player_count);
        if player_count > self.capacity {
            debug!(
                "Game {} holds {} players (capacity {}), rotating",
                id, player_count, self.capacity
            );
            self.deactivate_all();
            return self.create_game();
        }

        id
    }

    pub fn current_game(&mut self) -> &Game {
        let id = self.current_game_id();
        &self.games[&id]
    }

    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    pub fn active_game_count(&self) -> usize {
        self.games.values().filter(|g| g.active).count()
    }

    /// Registers `client_id` with the given game, falling back to the current
    /// game when `game_id` is unknown.
    ///
    /// Avatar/color pairs are drawn at random and re-drawn while taken, until
    /// the roster is as large as the number of combinations; past that point a
    /// duplicate pair is accepted.
    pub fn add_player(&mut self, game_id: GameId, client_id: &str) -> AddPlayerOutcome {
        let game_id = if self.games.contains_key(&game_id) {
            game_id
        } else {
            self.current_game_id()
        };

        let player_id = self.next_player_id;
        let rng = &mut self.rng;
        let game = self
            .games
            .entry(game_id)
            .or_insert_with(|| Game::new(game_id));

        if let Some(existing) = game.find_player(client_id) {
            debug!(
                "Player id already exists: {} (game {})",
                client_id, game_id
            );
            return AddPlayerOutcome::Existing(existing.clone());
        }
        debug!("Player id is new: {} (game {})", client_id, game_id);

        let combinations = AVATARS.len() * COLORS.len();
        let (mut avatar, mut color) = random_pair(rng);
        while game.has_pair(avatar, color) {
            (avatar, color) = random_pair(rng);
            if game.player_count() >= combinations {
                break;
            }
        }

        let player = Player {
            id: player_id,
            game_id,
            client_id: client_id.to_string(),
            avatar: avatar.to_string(),
            color: color.to_string(),
        };
        game.players.push(player.clone());
        self.next_player_id += 1;

        info!(
            "Player {} joined game {} as {}",
            client_id,
            game_id,
            player.avatar_slug()
        );
        AddPlayerOutcome::Created(player)
    }

    /// Replaces the current game's data blob; last write wins.
    pub fn save(&mut self, data: Value) -> GameId {
        let id = self.current_game_id();
        if let Some(game) = self.games.get_mut(&id) {
            game.data = data;
        }
        id
    }

    /// Retires the current game and opens a fresh one.
    pub fn new_game(&mut self) -> GameId {
        self.current_game_id();
        self.deactivate_all();
        self.create_game()
    }

    /// Stores the final data blob and closes the current game.
    pub fn finish(&mut self, data: Value) -> GameId {
        let id = self.current_game_id();
        if let Some(game) = self.games.get_mut(&id) {
            game.data = data;
            game.active = false;
        }
        info!("Finished game {}", id);
        id
    }

    pub fn snapshot(&mut self) -> GameInfo {
        self.current_game().snapshot()
    }

    pub fn device_online(&mut self, identity: &str) {
        self.devices
            .entry(identity.to_string())
            .and_modify(|d| d.online = true)
            .or_insert_with(|| {
                debug!("New device {}", identity);
                Device {
                    external_id: identity.to_string(),
                    online: true,
                }
            });
    }

    pub fn device_offline(&mut self, identity: &str) {
        if let Some(device) = self.devices.get_mut(identity) {
            device.online = false;
        }
    }

    pub fn device(&self, identity: &str) -> Option<&Device> {
        self.devices.get(identity)
    }

    pub fn online_devices(&self) -> usize {
        self.devices.values().filter(|d| d.online).count()
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new(GAME_CAPACITY, StdRng::from_entropy())
    }
}
