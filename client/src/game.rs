use crate::player::{BulletFate, BulletId, Collidable, CollisionOutcome, PlayerController};
use crate::spawn::{SpawnAllocator, SpawnPoint};
use log::{debug, info};
use serde_json::{json, Map, Value};
use shared::{
    GameInfo, LifecycleCommand, MessageBody, PlayerInfo, SystemMessage, DEFAULT_TIME_REMAINING,
    TICKS_PER_SECOND,
};
use std::collections::BTreeMap;

/// Local view of the current game, rebuilt from server broadcasts
#[derive(Debug, Clone)]
pub struct ClientGameState {
    players: BTreeMap<String, PlayerController>,
    spawner: SpawnAllocator,
    game_id: Option<u64>,
    time_remaining: u32,
    running: bool,
    finished: bool,
    tick: u64,
}

impl ClientGameState {
    pub fn new(spawner: SpawnAllocator) -> Self {
        Self {
            players: BTreeMap::new(),
            spawner,
            game_id: None,
            time_remaining: DEFAULT_TIME_REMAINING,
            running: false,
            finished: false,
            tick: 0,
        }
    }

    pub fn game_id(&self) -> Option<u64> {
        self.game_id
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: &str) -> Option<&PlayerController> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerController> {
        self.players.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerController> {
        self.players.values()
    }

    pub fn apply_message(&mut self, message: &SystemMessage) {
        match &message.body {
            MessageBody::GameInfo(info) => self.apply_snapshot(info),
            MessageBody::NewPlayer(player) => {
                if !self.players.contains_key(&player.id) {
                    self.add_player(player);
                }
            }
            MessageBody::Command(LifecycleCommand::StartGame) => {
                info!("Game started");
                self.running = true;
            }
            MessageBody::Command(LifecycleCommand::StopGame) => {
                info!("Game stopped");
                self.running = false;
            }
            MessageBody::GameFinished(finished) => {
                info!("Game {} finished", finished.game_id);
                self.running = false;
                self.finished = true;
            }
        }
    }

    fn apply_snapshot(&mut self, info: &GameInfo) {
        if self.game_id.is_some_and(|id| id != info.game_id) {
            let retired = self.retire_roster();
            debug!(
                "Switching to game {}, retired {} players",
                info.game_id,
                retired.len()
            );
            self.finished = false;
        }

        self.game_id = Some(info.game_id);
        self.time_remaining = info.time_remaining;

        for player in &info.players {
            match self.players.get_mut(&player.id) {
                Some(controller) => controller.set_progress(player.score, player.level),
                None => self.add_player(player),
            }
        }
    }

    fn add_player(&mut self, info: &PlayerInfo) {
        let mut controller = PlayerController::new(&info.id, &info.avatar, info.game_id);
        controller.place(self.spawner.next());

        let stored = SpawnPoint::new(info.spawn_x, info.spawn_y);
        if !stored.is_unset() {
            controller.set_spawn(stored);
        }
        controller.set_progress(info.score, info.level);

        info!("{} joined as {}", info.id, controller.display_name());
        self.players.insert(info.id.clone(), controller);
    }

    pub fn remove_player(&mut self, id: &str) -> Option<PlayerController> {
        let mut controller = self.players.remove(id)?;
        controller.destroy();
        Some(controller)
    }

    /// Destroys every controller and frees the spawn grid. The retired
    /// controllers keep their final score and level.
    pub fn retire_roster(&mut self) -> Vec<PlayerController> {
        let ids: Vec<String> = self.players.keys().cloned().collect();
        let retired = ids
            .iter()
            .filter_map(|id| self.remove_player(id))
            .collect();
        self.spawner.reset();
        retired
    }

    /// Routes a collision to `player_id` and applies its side effects to the
    /// other players involved.
    pub fn handle_collision(&mut self, player_id: &str, other: &Collidable) -> CollisionOutcome {
        let Some(player) = self.players.get_mut(player_id) else {
            return CollisionOutcome::Ignored;
        };

        let outcome = player.collide(other);
        match &outcome {
            CollisionOutcome::PowerUpCollected { .. } => {
                player.level_up();
            }
            CollisionOutcome::Damaged {
                exploded_bullet: Some((owner, bullet_id)),
            } => {
                if let Some(shooter) = self.players.get_mut(owner) {
                    shooter.resolve_bullet(*bullet_id, BulletFate::HitPlayer);
                }
            }
            CollisionOutcome::Damaged {
                exploded_bullet: None,
            }
            | CollisionOutcome::Ignored => {}
        }
        outcome
    }

    pub fn resolve_bullet(&mut self, player_id: &str, bullet: BulletId, fate: BulletFate) -> bool {
        self.players
            .get_mut(player_id)
            .is_some_and(|player| player.resolve_bullet(bullet, fate))
    }

    /// Advances every controller by one update tick and, while running, the
    /// game clock. Returns true on the tick the clock reaches zero.
    pub fn tick(&mut self) -> bool {
        for player in self.players.values_mut() {
            player.update();
        }

        if !self.running || self.time_remaining == 0 {
            return false;
        }

        self.tick += 1;
        if self.tick % u64::from(TICKS_PER_SECOND) == 0 {
            self.time_remaining -= 1;
            return self.time_remaining == 0;
        }
        false
    }

    /// Data blob for `save_game` and `finish_game`.
    pub fn finish_data(&self, identity: &str) -> Value {
        let players: Map<String, Value> = self
            .players
            .iter()
            .map(|(id, player)| {
                let spawn = player.spawn();
                let entry = json!({
                    "score": player.score(),
                    "level": player.level(),
                    "spawn_x": spawn.x,
                    "spawn_y": spawn.y,
                });
                (id.clone(), entry)
            })
            .collect();

        json!({
            "id": identity,
            "time_remaining": self.time_remaining,
            "players": players,
        })
    }
}
