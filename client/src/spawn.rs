//! Grid placement of newly joined players
//!
//! Spawn points tile the play area top to bottom, then left to right. When the
//! grid is full the cursor goes back to the origin, so later players share
//! positions with earlier ones.

use serde::{Deserialize, Serialize};
use shared::{PLAYER_HEIGHT, PLAYER_WIDTH, SPAWN_BOTTOM_CLEARANCE, SPAWN_GAP, SPAWN_MARGIN};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

impl SpawnPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// True when the server has no stored position for a player.
    pub fn is_unset(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct SpawnAllocator {
    screen_width: f32,
    screen_height: f32,
    player_width: f32,
    player_height: f32,
    /// Top-left corner of the next slot
    cursor: SpawnPoint,
}

impl SpawnAllocator {
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self::with_player_size(screen_width, screen_height, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    pub fn with_player_size(
        screen_width: f32,
        screen_height: f32,
        player_width: f32,
        player_height: f32,
    ) -> Self {
        Self {
            screen_width,
            screen_height,
            player_width,
            player_height,
            cursor: Self::origin(),
        }
    }

    fn origin() -> SpawnPoint {
        SpawnPoint::new(SPAWN_MARGIN, SPAWN_MARGIN)
    }

    /// Returns the centre of the current slot and advances the cursor.
    pub fn next(&mut self) -> SpawnPoint {
        let spawn = SpawnPoint::new(
            self.cursor.x + self.player_width / 2.0,
            self.cursor.y + self.player_height / 2.0,
        );

        if self.screen_height > spawn.y + self.player_height * 2.0 + SPAWN_BOTTOM_CLEARANCE {
            self.cursor.y += self.player_height + SPAWN_GAP;
        } else if self.screen_width > spawn.x + self.player_width + SPAWN_GAP {
            self.cursor.x += self.player_width + SPAWN_GAP;
            self.cursor.y = SPAWN_MARGIN;
        } else {
            self.cursor = Self::origin();
        }

        spawn
    }

    pub fn reset(&mut self) {
        self.cursor = Self::origin();
    }

    pub fn cursor(&self) -> SpawnPoint {
        self.cursor
    }
}
