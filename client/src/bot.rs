//! Random play for the headless client
//!
//! Stands in for the physics engine: each turn may fire, resolve a bullet or
//! produce a collision for the bot's own player.

use crate::game::ClientGameState;
use crate::player::{BulletFate, BulletId, Collidable, CollisionOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FATES: [BulletFate; 4] = [
    BulletFate::HitEnemy,
    BulletFate::HitBullet,
    BulletFate::HitPlayer,
    BulletFate::Expired,
];

#[derive(Debug, Clone, PartialEq)]
pub enum DemoEvent {
    Fired(BulletId),
    BulletResolved(BulletId, BulletFate),
    Collision(CollisionOutcome),
}

pub struct DemoBot {
    identity: String,
    rng: StdRng,
    next_object_id: u32,
}

impl DemoBot {
    pub fn new(identity: &str, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            identity: identity.to_string(),
            rng,
            next_object_id: 1,
        }
    }

    fn object_id(&mut self) -> u32 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    /// Plays one update tick for the bot's player while the game runs.
    pub fn play_turn(&mut self, game: &mut ClientGameState) -> Option<DemoEvent> {
        if !game.is_running() {
            return None;
        }

        let roll = self.rng.gen_range(0..100);
        match roll {
            0..=4 => {
                let player = game.player_mut(&self.identity)?;
                player.fire().map(DemoEvent::Fired)
            }
            5..=9 => {
                let bullet = game.player(&self.identity)?.bullets().next()?.id;
                let fate = FATES[self.rng.gen_range(0..FATES.len())];
                game.resolve_bullet(&self.identity, bullet, fate)
                    .then_some(DemoEvent::BulletResolved(bullet, fate))
            }
            10 => {
                let enemy = Collidable::Enemy {
                    id: self.object_id(),
                };
                self.collide(game, &enemy)
            }
            11 => {
                let power_up = Collidable::PowerUp {
                    id: self.object_id(),
                };
                self.collide(game, &power_up)
            }
            _ => None,
        }
    }

    fn collide(&self, game: &mut ClientGameState, other: &Collidable) -> Option<DemoEvent> {
        match game.handle_collision(&self.identity, other) {
            CollisionOutcome::Ignored => None,
            outcome => Some(DemoEvent::Collision(outcome)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::SpawnAllocator;
    use serde_json::json;
    use shared::{GameInfo, LifecycleCommand, PlayerInfo, SystemMessage, MAX_LEVEL};

    fn running_game(identity: &str) -> ClientGameState {
        let mut game = ClientGameState::new(SpawnAllocator::new(1920.0, 1080.0));
        game.apply_message(&SystemMessage::game_info(GameInfo {
            game_id: 1,
            game_data: json!({}),
            players: vec![PlayerInfo {
                id: identity.to_string(),
                avatar: "hootie_pink".to_string(),
                score: 0,
                level: 2,
                spawn_x: 0.0,
                spawn_y: 0.0,
                game_id: 1,
            }],
            time_remaining: 60,
        }));
        game
    }

    #[test]
    fn test_idle_while_stopped() {
        let mut game = running_game("bot");
        let mut bot = DemoBot::new("bot", Some(3));

        for _ in 0..500 {
            assert!(bot.play_turn(&mut game).is_none());
        }
    }

    #[test]
    fn test_random_play_keeps_player_consistent() {
        let mut game = running_game("bot");
        game.apply_message(&SystemMessage::command(LifecycleCommand::StartGame));
        let mut bot = DemoBot::new("bot", Some(11));

        let mut events = 0;
        for _ in 0..5_000 {
            if bot.play_turn(&mut game).is_some() {
                events += 1;
            }
            game.tick();

            let player = game.player("bot").unwrap();
            assert!(player.level() <= MAX_LEVEL);
            assert!(player.outstanding_bullets() <= MAX_LEVEL as usize + 1);
        }
        assert!(events > 0);
    }

    #[test]
    fn test_missing_player_produces_no_events() {
        let mut game = running_game("someone-else");
        game.apply_message(&SystemMessage::command(LifecycleCommand::StartGame));
        let mut bot = DemoBot::new("bot", Some(7));

        for _ in 0..500 {
            assert!(bot.play_turn(&mut game).is_none());
        }
    }
}
