//! Channel action dispatch
//!
//! [`GamesChannel`] is the session context the main loop owns. It applies each
//! action a client performs to the [`GameStore`] and answers with the
//! broadcasts that let every client converge on the server's view. Nothing is
//! correlated to a request: clients resync from snapshots.

use crate::broadcaster::Broadcast;
use crate::store::{AddPlayerOutcome, GameStore};
use log::{debug, info};
use serde_json::Value;
use shared::{identity_topic, Action, LifecycleCommand, SystemMessage, COMMANDS_TOPIC};

pub struct GamesChannel {
    store: GameStore,
}

impl GamesChannel {
    pub fn new(store: GameStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GameStore {
        &mut self.store
    }

    pub fn subscribed(&mut self, identity: &str) {
        self.store.device_online(identity);
    }

    pub fn unsubscribed(&mut self, identity: &str) {
        self.store.device_offline(identity);
    }

    /// Applies `action` on behalf of `identity`
    pub fn perform(&mut self, identity: &str, action: Action) -> Vec<Broadcast> {
        debug!("{} performs {}", identity, action.name());

        match action {
            Action::CreatePlayer { device_id } => self.create_player(identity, &device_id),
            Action::FetchGame { device_id } => {
                debug!("Snapshot requested by device {}", device_id);
                vec![self.snapshot()]
            }
            Action::StartGame => vec![Broadcast::new(
                COMMANDS_TOPIC,
                SystemMessage::command(LifecycleCommand::StartGame),
            )],
            Action::StopGame => vec![Broadcast::new(
                COMMANDS_TOPIC,
                SystemMessage::command(LifecycleCommand::StopGame),
            )],
            Action::SaveGame { game_data } => {
                self.store.save(game_data);
                vec![self.snapshot()]
            }
            Action::FinishGame { game_data } => self.finish_game(identity, game_data),
        }
    }

    fn snapshot(&mut self) -> Broadcast {
        Broadcast::new(
            COMMANDS_TOPIC,
            SystemMessage::game_info(self.store.snapshot()),
        )
    }

    fn create_player(&mut self, identity: &str, device_id: &str) -> Vec<Broadcast> {
        let game_id = self.store.current_game_id();

        match self.store.add_player(game_id, device_id) {
            AddPlayerOutcome::Created(_) => vec![self.snapshot()],
            AddPlayerOutcome::Existing(player) => {
                let info = match self.store.game(player.game_id) {
                    Some(game) => game.player_info(&player),
                    None => return vec![self.snapshot()],
                };
                vec![Broadcast::new(
                    identity_topic(identity),
                    SystemMessage::new_player(info),
                )]
            }
        }
    }

    /// The acknowledgement goes to the identity named in the submitted data,
    /// or to the submitter when the data carries none.
    fn finish_game(&mut self, identity: &str, game_data: Value) -> Vec<Broadcast> {
        let target = game_data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(identity)
            .to_string();

        let game_id = self.store.finish(game_data);
        info!("Game {} finished by {}", game_id, target);

        vec![Broadcast::new(
            identity_topic(&target),
            SystemMessage::game_finished(game_id),
        )]
    }
}
