use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Players an active game accepts before it is retired.
pub const GAME_CAPACITY: usize = 50;
pub const DEFAULT_SCORE: u32 = 0;
pub const DEFAULT_LEVEL: u32 = 2;
pub const MAX_LEVEL: u32 = 7;
/// Seconds on the clock of a fresh game.
pub const DEFAULT_TIME_REMAINING: u32 = 60;

pub const PLAYER_WIDTH: f32 = 212.0;
pub const PLAYER_HEIGHT: f32 = 125.0;
pub const SPAWN_MARGIN: f32 = 10.0;
pub const SPAWN_GAP: f32 = 10.0;
pub const SPAWN_BOTTOM_CLEARANCE: f32 = 50.0;

/// Client update ticks per second of game clock.
pub const TICKS_PER_SECOND: u32 = 60;
/// Length of the post-damage invulnerability window, in update ticks.
pub const FLICKER_TICKS: u32 = 60;
/// Number of alternating visibility phases inside the window.
pub const FLICKER_PHASES: u32 = 10;
/// Where a bullet leaves the ship, relative to the ship's position.
pub const BULLET_OFFSET_X: f32 = 50.0;
pub const BULLET_OFFSET_Y: f32 = 20.0;

pub const AVATARS: [&str; 8] = [
    "appy", "blaze", "cloudy", "codey", "earnie", "hootie", "koa", "astro",
];
pub const COLORS: [&str; 6] = ["blue", "green", "orange", "pink", "purple", "yellow"];

pub const SYSTEM_ID: &str = "system";
pub const COMMANDS_TOPIC: &str = "commands";
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Topic a single identity listens on for acknowledgements.
pub fn identity_topic(identity: &str) -> String {
    format!("{}-{}", COMMANDS_TOPIC, identity)
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
    #[error("invalid message body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport frame carried in a single datagram.
///
/// Bodies of `Perform` and `Broadcast` are JSON documents so that the game
/// data blob can stay schemaless.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Subscribe { identity: String },
    Perform { data: String },
    Heartbeat,
    Unsubscribe,

    Confirmed { identity: String },
    Broadcast { topic: String, message: String },
    Rejected { reason: String },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        bincode::deserialize(bytes).map_err(ProtocolError::Decode)
    }

    pub fn perform(action: &Action) -> Result<Self, ProtocolError> {
        Ok(Packet::Perform {
            data: action.to_json()?,
        })
    }

    pub fn broadcast(topic: &str, message: &SystemMessage) -> Result<Self, ProtocolError> {
        Ok(Packet::Broadcast {
            topic: topic.to_string(),
            message: message.to_json()?,
        })
    }
}

/// Named action a client asks the server to perform.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreatePlayer { device_id: String },
    FetchGame { device_id: String },
    StartGame,
    StopGame,
    SaveGame { game_data: Value },
    FinishGame { game_data: Value },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreatePlayer { .. } => "create_player",
            Action::FetchGame { .. } => "fetch_game",
            Action::StartGame => "start_game",
            Action::StopGame => "stop_game",
            Action::SaveGame { .. } => "save_game",
            Action::FinishGame { .. } => "finish_game",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Body of every broadcast. Receivers tell messages apart by which body key
/// is present, there is no request correlation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SystemMessage {
    pub id: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    GameInfo(GameInfo),
    Command(LifecycleCommand),
    GameFinished(GameFinished),
    NewPlayer(PlayerInfo),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    StartGame,
    StopGame,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameInfo {
    pub game_id: u64,
    pub game_data: Value,
    pub players: Vec<PlayerInfo>,
    pub time_remaining: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GameFinished {
    pub game_id: u64,
}

/// One roster entry as seen by clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: String,
    pub avatar: String,
    pub score: u32,
    pub level: u32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub game_id: u64,
}

impl SystemMessage {
    fn system(body: MessageBody) -> Self {
        Self {
            id: SYSTEM_ID.to_string(),
            body,
        }
    }

    pub fn game_info(info: GameInfo) -> Self {
        Self::system(MessageBody::GameInfo(info))
    }

    pub fn command(command: LifecycleCommand) -> Self {
        Self::system(MessageBody::Command(command))
    }

    pub fn game_finished(game_id: u64) -> Self {
        Self::system(MessageBody::GameFinished(GameFinished { game_id }))
    }

    pub fn new_player(player: PlayerInfo) -> Self {
        Self::system(MessageBody::NewPlayer(player))
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    fn sample_player() -> PlayerInfo {
        PlayerInfo {
            id: "d1".to_string(),
            avatar: "koa_blue".to_string(),
            score: 0,
            level: DEFAULT_LEVEL,
            spawn_x: 116.0,
            spawn_y: 72.5,
            game_id: 3,
        }
    }

    #[test]
    fn test_identity_topic() {
        assert_eq!(identity_topic("d1"), "commands-d1");
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let message = SystemMessage::game_info(GameInfo {
            game_id: 3,
            game_data: json!({}),
            players: vec![sample_player()],
            time_remaining: DEFAULT_TIME_REMAINING,
        });

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["id"], "system");
        assert_eq!(value["game_info"]["game_id"], 3);
        assert_eq!(value["game_info"]["time_remaining"], 60);
        assert_eq!(value["game_info"]["players"][0]["id"], "d1");
        assert_eq!(value["game_info"]["players"][0]["level"], 2);
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_command_wire_shape() {
        let value = serde_json::to_value(SystemMessage::command(LifecycleCommand::StartGame)).unwrap();
        assert_eq!(value, json!({ "id": "system", "command": "start_game" }));

        let value = serde_json::to_value(SystemMessage::command(LifecycleCommand::StopGame)).unwrap();
        assert_eq!(value, json!({ "id": "system", "command": "stop_game" }));
    }

    #[test]
    fn test_game_finished_wire_shape() {
        let value = serde_json::to_value(SystemMessage::game_finished(9)).unwrap();
        assert_eq!(value, json!({ "id": "system", "game_finished": { "game_id": 9 } }));
    }

    #[test]
    fn test_message_body_is_told_apart_by_shape() {
        let raw = r#"{"id":"system","new_player":{"id":"d1","avatar":"koa_blue","score":0,"level":2,"spawn_x":116.0,"spawn_y":72.5,"game_id":3}}"#;
        let message = SystemMessage::from_json(raw).unwrap();

        match message.body {
            MessageBody::NewPlayer(player) => {
                assert_eq!(player.id, "d1");
                assert_approx_eq!(player.spawn_y, 72.5, 0.001);
            }
            other => panic!("Unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_action_json_names() {
        let create = Action::CreatePlayer {
            device_id: "d1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({ "action": "create_player", "device_id": "d1" })
        );
        assert_eq!(create.name(), "create_player");

        let start = Action::from_json(r#"{"action":"start_game"}"#).unwrap();
        assert_eq!(start, Action::StartGame);

        let finish = Action::from_json(r#"{"action":"finish_game","game_data":{"id":"d1"}}"#).unwrap();
        match finish {
            Action::FinishGame { game_data } => assert_eq!(game_data["id"], "d1"),
            other => panic!("Unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = Action::from_json(r#"{"action":"launch_rocket"}"#);
        assert!(matches!(result, Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_packet_carries_json_body() {
        let packet = Packet::perform(&Action::FetchGame {
            device_id: "d2".to_string(),
        })
        .unwrap();

        let bytes = packet.encode().unwrap();
        let decoded = Packet::decode(&bytes).unwrap();

        match decoded {
            Packet::Perform { data } => {
                let action = Action::from_json(&data).unwrap();
                assert_eq!(
                    action,
                    Action::FetchGame {
                        device_id: "d2".to_string()
                    }
                );
            }
            other => panic!("Wrong packet type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_packet_fails_to_decode() {
        let bytes = Packet::Subscribe {
            identity: "device-123".to_string(),
        }
        .encode()
        .unwrap();

        let result = Packet::decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
        assert!(Packet::decode(&[]).is_err());
    }
}
