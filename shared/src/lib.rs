use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod codec;

pub const GRID_SIZE: usize = 4;
pub const MAX_NAME_LEN: usize = 20;
pub const PRESS_TIMEOUT_SECS: u64 = 10;
pub const GAME_SPACER_TIMEOUT_SECS: u64 = 5;
pub const GAME_START_FLASH_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TileState {
    #[default]
    Unpressed,
    Pressed,
    Winning,
}

/// A board coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
}

/// The play grid. Row-major: `tiles[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: [[TileState; GRID_SIZE]; GRID_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self {
            tiles: [[TileState::Unpressed; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn in_bounds(x: usize, y: usize) -> bool {
        x < GRID_SIZE && y < GRID_SIZE
    }

    /// State of the tile at `(x, y)`. Panics when out of bounds; callers
    /// validate coordinates with [`Board::in_bounds`] first.
    pub fn state(&self, x: usize, y: usize) -> TileState {
        self.tiles[y][x]
    }

    /// Overwrite the tile at `(x, y)`. Panics when out of bounds.
    pub fn set(&mut self, x: usize, y: usize, state: TileState) {
        self.tiles[y][x] = state;
    }

    pub fn unpressed_count(&self) -> usize {
        self.tiles
            .iter()
            .flatten()
            .filter(|t| **t == TileState::Unpressed)
            .count()
    }

    /// Coordinates of all tiles still unpressed, in row-major order.
    pub fn unpressed_tiles(&self) -> Vec<Tile> {
        let mut out = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if *tile == TileState::Unpressed {
                    out.push(Tile { x, y });
                }
            }
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the clients are allowed to see, attached to every outbound
/// event so they can re-derive their display from any single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub in_progress: bool,
    pub can_start_new_game: bool,
    /// Active participants in turn order.
    pub players: Vec<String>,
    /// Participants who joined mid-round, deferred to the next round.
    pub waiting: Vec<String>,
    pub board: Board,
    pub current_turn: Option<usize>,
    /// The hidden coordinate, populated only after it has been revealed.
    pub winning_tile: Option<Tile>,
    pub wins: HashMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    Join { name: String },
    Start,
    Press { x: usize, y: usize },
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    ConnectResult {
        state: GameSnapshot,
    },
    JoinResult {
        success: bool,
        /// Human-readable rejection reason; `None` on success.
        message: Option<String>,
        /// The sanitized name the server registered; `None` on failure.
        name: Option<String>,
        /// True when the join landed in the waiting room of a running round.
        waiting: bool,
        state: GameSnapshot,
    },
    PlayerListUpdate {
        state: GameSnapshot,
    },
    GameStart {
        state: GameSnapshot,
    },
    TilePress {
        state: GameSnapshot,
    },
    Victory {
        state: GameSnapshot,
    },
    GameReset {
        message: String,
        state: GameSnapshot,
    },
}

impl ServerEvent {
    /// The snapshot every variant carries.
    pub fn state(&self) -> &GameSnapshot {
        match self {
            ServerEvent::ConnectResult { state }
            | ServerEvent::JoinResult { state, .. }
            | ServerEvent::PlayerListUpdate { state }
            | ServerEvent::GameStart { state }
            | ServerEvent::TilePress { state }
            | ServerEvent::Victory { state }
            | ServerEvent::GameReset { state, .. } => state,
        }
    }
}
