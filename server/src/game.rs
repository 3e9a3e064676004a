//! Records owned by the game store: games, their players, and devices.

use serde_json::{json, Value};
use shared::{GameInfo, PlayerInfo, DEFAULT_LEVEL, DEFAULT_SCORE, DEFAULT_TIME_REMAINING};

pub type GameId = u64;

/// A single game session and its roster.
///
/// `data` is the schemaless blob clients submit on save and finish. Per-player
/// values live under `data["players"][<client id>]`, the clock under
/// `data["time_remaining"]`.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: GameId,
    pub active: bool,
    pub data: Value,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: u64,
    pub game_id: GameId,
    /// Id chosen by the client, unique within its game.
    pub client_id: String,
    pub avatar: String,
    pub color: String,
}

impl Player {
    pub fn avatar_slug(&self) -> String {
        format!("{}_{}", self.avatar, self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub external_id: String,
    pub online: bool,
}

impl Game {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            active: true,
            data: json!({}),
            players: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn find_player(&self, client_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.client_id == client_id)
    }

    pub fn has_pair(&self, avatar: &str, color: &str) -> bool {
        self.players
            .iter()
            .any(|p| p.avatar == avatar && p.color == color)
    }

    fn player_value(&self, client_id: &str, key: &str) -> Option<&Value> {
        self.data
            .get("players")
            .and_then(|players| players.get(client_id))
            .and_then(|player| player.get(key))
    }

    fn player_u32(&self, client_id: &str, key: &str) -> Option<u32> {
        self.player_value(client_id, key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    fn player_f32(&self, client_id: &str, key: &str) -> Option<f32> {
        self.player_value(client_id, key)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
    }

    pub fn time_remaining(&self) -> u32 {
        self.data
            .get("time_remaining")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_TIME_REMAINING)
    }

    /// Roster entry for `player`, filling gaps in the data blob with defaults.
    pub fn player_info(&self, player: &Player) -> PlayerInfo {
        let client_id = player.client_id.as_str();
        PlayerInfo {
            id: player.client_id.clone(),
            avatar: player.avatar_slug(),
            score: self.player_u32(client_id, "score").unwrap_or(DEFAULT_SCORE),
            level: self.player_u32(client_id, "level").unwrap_or(DEFAULT_LEVEL),
            spawn_x: self.player_f32(client_id, "spawn_x").unwrap_or(0.0),
            spawn_y: self.player_f32(client_id, "spawn_y").unwrap_or(0.0),
            game_id: self.id,
        }
    }

    pub fn snapshot(&self) -> GameInfo {
        GameInfo {
            game_id: self.id,
            game_data: self.data.clone(),
            players: self.players.iter().map(|p| self.player_info(p)).collect(),
            time_remaining: self.time_remaining(),
        }
    }
}
