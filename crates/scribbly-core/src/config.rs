//! Peer and game configuration.

use crate::model::RoomId;
use serde::{Deserialize, Serialize};

/// Round length used until someone sets a timer.
pub const DEFAULT_ROUND_DURATION_SECS: u32 = 60;

/// Scoring and guard parameters of the guessing game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Players needed before a game can start.
    pub min_players: usize,
    /// Points a drawer earns when the topic is guessed instantly.
    pub max_round_points: u32,
    /// Points awarded to the player who guessed the topic.
    pub guess_bonus: u32,
    /// Initial round duration in seconds.
    pub default_round_duration: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_round_points: 20,
            guess_bonus: 5,
            default_round_duration: DEFAULT_ROUND_DURATION_SECS,
        }
    }
}

/// Everything a peer needs to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub room: RoomId,
    #[serde(default)]
    pub game: GameConfig,
}

impl PeerConfig {
    pub fn new(room: impl Into<RoomId>) -> Self {
        Self {
            room: room.into(),
            game: GameConfig::default(),
        }
    }

    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }
}
