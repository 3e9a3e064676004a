//! Per-player session state: score, level, bullets and invulnerability
//!
//! A controller moves through `Spawning -> Active`, drops into `Flickering`
//! for a fixed number of update ticks after taking damage, and ends in
//! `Destroyed`, after which every event is ignored.

use crate::spawn::SpawnPoint;
use log::debug;
use shared::{
    BULLET_OFFSET_X, BULLET_OFFSET_Y, DEFAULT_LEVEL, DEFAULT_SCORE, FLICKER_PHASES, FLICKER_TICKS,
    MAX_LEVEL,
};
use std::collections::BTreeMap;

pub type BulletId = u32;

/// Events that move a player's score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    DestroyEnemy,
    DestroyBullet,
    TouchEnemy,
    TouchBullet,
    LevelUp,
}

impl ScoreEvent {
    pub fn points(self) -> i64 {
        match self {
            ScoreEvent::DestroyEnemy => 50,
            ScoreEvent::DestroyBullet => 20,
            ScoreEvent::TouchEnemy => -40,
            ScoreEvent::TouchBullet => -50,
            ScoreEvent::LevelUp => 30,
        }
    }

    /// Damage also costs a level.
    pub fn is_damage(self) -> bool {
        matches!(self, ScoreEvent::TouchEnemy | ScoreEvent::TouchBullet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Spawning,
    Active,
    /// Invulnerable; `elapsed` counts update ticks since the hit
    Flickering { elapsed: u32 },
    Destroyed,
}

/// Anything a player's body can touch
#[derive(Debug, Clone, PartialEq)]
pub enum Collidable {
    Bullet { id: BulletId, owner: String },
    Enemy { id: u32 },
    PowerUp { id: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollisionOutcome {
    Ignored,
    /// The player took a hit; a touched bullet is reported so its owner can
    /// resolve it.
    Damaged {
        exploded_bullet: Option<(String, BulletId)>,
    },
    PowerUpCollected { id: u32 },
}

/// How an outstanding bullet left play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletFate {
    HitEnemy,
    HitBullet,
    HitPlayer,
    Expired,
}

impl BulletFate {
    fn score_event(self) -> Option<ScoreEvent> {
        match self {
            BulletFate::HitEnemy => Some(ScoreEvent::DestroyEnemy),
            BulletFate::HitBullet => Some(ScoreEvent::DestroyBullet),
            BulletFate::HitPlayer | BulletFate::Expired => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: BulletId,
    pub origin: SpawnPoint,
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    id: String,
    avatar: String,
    game_id: u64,
    spawn: SpawnPoint,
    score: u32,
    level: u32,
    max_level: u32,
    state: PlayerState,
    alpha: f32,
    bullets: BTreeMap<BulletId, Bullet>,
    next_bullet_id: BulletId,
    flicker_ticks: u32,
    flicker_phases: u32,
}

impl PlayerController {
    pub fn new(id: &str, avatar: &str, game_id: u64) -> Self {
        Self {
            id: id.to_string(),
            avatar: avatar.to_string(),
            game_id,
            spawn: SpawnPoint::new(0.0, 0.0),
            score: DEFAULT_SCORE,
            level: DEFAULT_LEVEL,
            max_level: MAX_LEVEL,
            state: PlayerState::Spawning,
            alpha: 1.0,
            bullets: BTreeMap::new(),
            next_bullet_id: 1,
            flicker_ticks: FLICKER_TICKS,
            flicker_phases: FLICKER_PHASES,
        }
    }

    pub fn with_flicker(mut self, ticks: u32, phases: u32) -> Self {
        self.flicker_ticks = ticks;
        self.flicker_phases = phases.max(1);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    /// "Blue Koa" for avatar slug `koa_blue`.
    pub fn display_name(&self) -> String {
        fn capitalize(word: &str) -> String {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }

        match self.avatar.split_once('_') {
            Some((character, color)) => format!("{} {}", capitalize(color), capitalize(character)),
            None => capitalize(&self.avatar),
        }
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn spawn(&self) -> SpawnPoint {
        self.spawn
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_flickering(&self) -> bool {
        matches!(self.state, PlayerState::Flickering { .. })
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == PlayerState::Destroyed
    }

    pub fn outstanding_bullets(&self) -> usize {
        self.bullets.len()
    }

    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.values()
    }

    /// Attaches a spawning player at `spawn`.
    pub fn place(&mut self, spawn: SpawnPoint) -> bool {
        if self.state != PlayerState::Spawning {
            return false;
        }
        self.spawn = spawn;
        self.state = PlayerState::Active;
        debug!("Player {} placed at ({}, {})", self.id, spawn.x, spawn.y);
        true
    }

    pub fn set_spawn(&mut self, spawn: SpawnPoint) {
        self.spawn = spawn;
    }

    /// Adopts score and level reported by the server.
    pub fn set_progress(&mut self, score: u32, level: u32) {
        if self.is_destroyed() {
            return;
        }
        self.score = score;
        self.level = level.min(self.max_level);
    }

    pub fn score_event(&mut self, event: ScoreEvent) {
        if self.is_destroyed() {
            return;
        }

        if event.is_damage() && self.level > 0 {
            self.level -= 1;
        }

        let score = (i64::from(self.score) + event.points()).max(0);
        self.score = u32::try_from(score).unwrap_or(u32::MAX);
    }

    /// Raises the level by one below the maximum, with a score bonus.
    pub fn level_up(&mut self) -> bool {
        if self.is_destroyed() || self.level >= self.max_level {
            return false;
        }
        self.score_event(ScoreEvent::LevelUp);
        self.level += 1;
        true
    }

    /// Fires a bullet unless `level + 1` are already in flight.
    pub fn fire(&mut self) -> Option<BulletId> {
        match self.state {
            PlayerState::Active | PlayerState::Flickering { .. } => {}
            PlayerState::Spawning | PlayerState::Destroyed => return None,
        }

        if self.bullets.len() > self.level as usize {
            return None;
        }

        let id = self.next_bullet_id;
        self.next_bullet_id += 1;
        let origin = SpawnPoint::new(self.spawn.x + BULLET_OFFSET_X, self.spawn.y + BULLET_OFFSET_Y);
        self.bullets.insert(id, Bullet { id, origin });
        Some(id)
    }

    /// Removes an outstanding bullet, scoring hits on enemies and bullets.
    pub fn resolve_bullet(&mut self, id: BulletId, fate: BulletFate) -> bool {
        if self.bullets.remove(&id).is_none() {
            return false;
        }
        if let Some(event) = fate.score_event() {
            self.score_event(event);
        }
        true
    }

    pub fn collide(&mut self, other: &Collidable) -> CollisionOutcome {
        if self.state != PlayerState::Active {
            return CollisionOutcome::Ignored;
        }

        match other {
            Collidable::Bullet { owner, .. } if *owner == self.id => CollisionOutcome::Ignored,
            Collidable::Bullet { id, owner } => {
                self.score_event(ScoreEvent::TouchBullet);
                self.start_flicker();
                CollisionOutcome::Damaged {
                    exploded_bullet: Some((owner.clone(), *id)),
                }
            }
            Collidable::Enemy { .. } => {
                self.score_event(ScoreEvent::TouchEnemy);
                self.start_flicker();
                CollisionOutcome::Damaged {
                    exploded_bullet: None,
                }
            }
            Collidable::PowerUp { id } => CollisionOutcome::PowerUpCollected { id: *id },
        }
    }

    fn start_flicker(&mut self) {
        self.state = PlayerState::Flickering { elapsed: 0 };
    }

    /// Advances the flicker window by one update tick.
    pub fn update(&mut self) {
        let PlayerState::Flickering { elapsed } = self.state else {
            return;
        };

        let elapsed = elapsed + 1;
        if elapsed >= self.flicker_ticks {
            self.state = PlayerState::Active;
            self.alpha = 1.0;
            return;
        }

        let phase_length = (self.flicker_ticks / self.flicker_phases).max(1);
        let phase = (elapsed - 1) / phase_length;
        self.alpha = if phase % 2 == 0 { 0.5 } else { 1.0 };
        self.state = PlayerState::Flickering { elapsed };
    }

    /// Tears the player down; all bullets are dropped.
    pub fn destroy(&mut self) {
        self.state = PlayerState::Destroyed;
        self.bullets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn active_player() -> PlayerController {
        let mut player = PlayerController::new("d1", "koa_blue", 1);
        player.place(SpawnPoint::new(116.0, 72.5));
        player
    }

    fn enemy() -> Collidable {
        Collidable::Enemy { id: 1 }
    }

    #[test]
    fn test_new_player_defaults() {
        let player = PlayerController::new("d1", "koa_blue", 1);
        assert_eq!(player.state(), PlayerState::Spawning);
        assert_eq!(player.score(), 0);
        assert_eq!(player.level(), 2);
        assert_eq!(player.display_name(), "Blue Koa");
    }

    #[test]
    fn test_place_activates_once() {
        let mut player = PlayerController::new("d1", "koa_blue", 1);
        assert!(player.place(SpawnPoint::new(116.0, 72.5)));
        assert_eq!(player.state(), PlayerState::Active);
        assert!(!player.place(SpawnPoint::new(1.0, 1.0)));
        assert_eq!(player.spawn(), SpawnPoint::new(116.0, 72.5));
    }

    #[test]
    fn test_touch_bullet_floors_score_at_zero() {
        let mut player = active_player();
        player.score_event(ScoreEvent::TouchBullet);
        assert_eq!(player.score(), 0);
        assert_eq!(player.level(), 1);
    }

    #[test]
    fn test_destroy_enemy_then_touch_enemy() {
        let mut player = active_player();
        player.score_event(ScoreEvent::DestroyEnemy);
        player.score_event(ScoreEvent::TouchEnemy);

        assert_eq!(player.score(), 10);
        assert_eq!(player.level(), 1);
    }

    #[test]
    fn test_level_floors_at_zero() {
        let mut player = active_player();
        for _ in 0..5 {
            player.score_event(ScoreEvent::TouchEnemy);
        }
        assert_eq!(player.level(), 0);
        assert_eq!(player.score(), 0);
    }

    #[test]
    fn test_level_up_caps_at_max() {
        let mut player = active_player();

        for expected in 3..=7 {
            assert!(player.level_up());
            assert_eq!(player.level(), expected);
        }
        let score_at_cap = player.score();
        assert_eq!(score_at_cap, 5 * 30);

        assert!(!player.level_up());
        assert!(!player.level_up());
        assert_eq!(player.level(), 7);
        assert_eq!(player.score(), score_at_cap);
    }

    #[test]
    fn test_fire_gated_by_level() {
        let mut player = active_player();
        let level = player.level() as usize;

        for _ in 0..=level {
            assert!(player.fire().is_some());
        }
        assert_eq!(player.outstanding_bullets(), level + 1);

        assert!(player.fire().is_none());
        assert_eq!(player.outstanding_bullets(), level + 1);
    }

    #[test]
    fn test_resolving_bullet_frees_a_slot() {
        let mut player = active_player();
        let first = player.fire().unwrap();
        player.fire();
        player.fire();
        assert!(player.fire().is_none());

        assert!(player.resolve_bullet(first, BulletFate::Expired));
        assert_eq!(player.score(), 0);
        assert!(player.fire().is_some());
        assert!(!player.resolve_bullet(first, BulletFate::HitEnemy));
    }

    #[test]
    fn test_bullet_hits_score() {
        let mut player = active_player();
        let a = player.fire().unwrap();
        let b = player.fire().unwrap();

        player.resolve_bullet(a, BulletFate::HitEnemy);
        player.resolve_bullet(b, BulletFate::HitBullet);
        assert_eq!(player.score(), 70);
    }

    #[test]
    fn test_bullet_leaves_from_offset() {
        let mut player = active_player();
        let id = player.fire().unwrap();
        let bullet = player.bullets().find(|b| b.id == id).unwrap();

        assert_approx_eq!(bullet.origin.x, 166.0, 0.001);
        assert_approx_eq!(bullet.origin.y, 92.5, 0.001);
    }

    #[test]
    fn test_spawning_player_cannot_fire_or_be_hit() {
        let mut player = PlayerController::new("d1", "koa_blue", 1);
        assert!(player.fire().is_none());
        assert_eq!(player.collide(&enemy()), CollisionOutcome::Ignored);
    }

    #[test]
    fn test_enemy_touch_starts_flicker() {
        let mut player = active_player();
        player.score_event(ScoreEvent::DestroyEnemy);

        let outcome = player.collide(&enemy());
        assert_eq!(
            outcome,
            CollisionOutcome::Damaged {
                exploded_bullet: None
            }
        );
        assert!(player.is_flickering());
        assert_eq!(player.score(), 10);
        assert_eq!(player.level(), 1);
    }

    #[test]
    fn test_flicker_blocks_further_damage() {
        let mut player = active_player();
        player.score_event(ScoreEvent::DestroyEnemy);
        player.score_event(ScoreEvent::DestroyEnemy);
        player.collide(&enemy());
        let score = player.score();
        let level = player.level();

        assert_eq!(player.collide(&enemy()), CollisionOutcome::Ignored);
        assert_eq!(
            player.collide(&Collidable::Bullet {
                id: 4,
                owner: "d2".to_string()
            }),
            CollisionOutcome::Ignored
        );
        assert_eq!(player.score(), score);
        assert_eq!(player.level(), level);
    }

    #[test]
    fn test_flicker_window_elapses() {
        let mut player = active_player().with_flicker(10, 5);
        player.collide(&enemy());

        player.update();
        assert_approx_eq!(player.alpha(), 0.5, 0.001);
        player.update();
        assert_approx_eq!(player.alpha(), 0.5, 0.001);
        player.update();
        assert_approx_eq!(player.alpha(), 1.0, 0.001);

        for _ in 3..9 {
            player.update();
            assert!(player.is_flickering());
        }
        player.update();
        assert_eq!(player.state(), PlayerState::Active);
        assert_approx_eq!(player.alpha(), 1.0, 0.001);

        let outcome = player.collide(&enemy());
        assert!(matches!(outcome, CollisionOutcome::Damaged { .. }));
    }

    #[test]
    fn test_touching_bullet_reports_explosion() {
        let mut player = active_player();
        let outcome = player.collide(&Collidable::Bullet {
            id: 3,
            owner: "d2".to_string(),
        });

        assert_eq!(
            outcome,
            CollisionOutcome::Damaged {
                exploded_bullet: Some(("d2".to_string(), 3))
            }
        );
        assert_eq!(player.score(), 0);
    }

    #[test]
    fn test_own_bullet_is_ignored() {
        let mut player = active_player();
        let outcome = player.collide(&Collidable::Bullet {
            id: 1,
            owner: "d1".to_string(),
        });
        assert_eq!(outcome, CollisionOutcome::Ignored);
        assert!(!player.is_flickering());
    }

    #[test]
    fn test_power_up_is_reported() {
        let mut player = active_player();
        assert_eq!(
            player.collide(&Collidable::PowerUp { id: 9 }),
            CollisionOutcome::PowerUpCollected { id: 9 }
        );
        assert_eq!(player.level(), 2);
    }

    #[test]
    fn test_destroyed_is_terminal() {
        let mut player = active_player();
        player.fire();
        player.destroy();

        assert!(player.is_destroyed());
        assert_eq!(player.outstanding_bullets(), 0);
        assert!(player.fire().is_none());
        assert!(!player.level_up());
        assert_eq!(player.collide(&enemy()), CollisionOutcome::Ignored);
        player.score_event(ScoreEvent::DestroyEnemy);
        assert_eq!(player.score(), 0);
    }
}
