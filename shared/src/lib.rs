//! Data model and wire contract shared by the grid client and its tests.
//!
//! Nothing in this crate performs I/O. The `board` module normalizes the raw
//! grids pushed by the server, and `protocol` maps named bus events to typed
//! inbound/outbound messages.

pub mod board;
pub mod protocol;

pub use board::{Board, BoardCell, RawGrid};
pub use protocol::{ClientEvent, Envelope, MoveIntent, ServerEvent};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Round counter pushed with every board sync. 0 means "not started".
pub type RoundNumber = u32;

/// Opaque participant id. Also used as the occupancy marker on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Board coordinate. Signed so that neighbor arithmetic at the edges is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four orthogonal neighbors, not bounds-checked.
    pub fn neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y),
            Position::new(self.x, self.y + 1),
            Position::new(self.x, self.y - 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Per-player round status as the server reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub online: bool,
    #[serde(rename = "move", default)]
    pub has_moved: bool,
}

/// A single-field update merged into a [`PlayerStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPatch {
    Online(bool),
    HasMoved(bool),
}

impl PlayerStatus {
    pub fn apply(&mut self, patch: StatusPatch) {
        match patch {
            StatusPatch::Online(online) => self.online = online,
            StatusPatch::HasMoved(has_moved) => self.has_moved = has_moved,
        }
    }
}

/// Display data for a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    #[serde(rename = "_id")]
    pub id: PlayerId,
    #[serde(rename = "nickname", default)]
    pub display_name: String,
    #[serde(rename = "avatar", default)]
    pub avatar_ref: String,
}

impl PlayerProfile {
    pub fn new(id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_ref: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GameOutcome {
    #[default]
    InProgress,
    Decided {
        winner: Option<PlayerId>,
    },
    Draw,
}

impl GameOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }
}

/// The two recovery votes a room can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoteKind {
    /// Skip a stalled player and move to the next round.
    AdvanceRound,
    RestartGame,
}

impl VoteKind {
    pub const ALL: [VoteKind; 2] = [VoteKind::AdvanceRound, VoteKind::RestartGame];

    /// Event-name stem used on the bus (`"<stem>"`, `"<stem> call"`, ...).
    pub fn wire_stem(&self) -> &'static str {
        match self {
            VoteKind::AdvanceRound => "vote next step",
            VoteKind::RestartGame => "vote restart",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKind::AdvanceRound => f.write_str("advance round"),
            VoteKind::RestartGame => f.write_str("restart game"),
        }
    }
}

/// Coarse status flag kept in the session context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Idle,
    Matching,
    Gaming,
}

/// Shape of the `submit move` payload a game kind expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveShape {
    /// `{oldPos, newPos, stepNum}`; conflicts arrive as `clashed moving`.
    Relocate,
    /// `{movePos, stepNum}`; conflicts arrive as `seize fail`.
    Seize,
}

/// Per-kind switches for the single game engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameKindConfig {
    pub move_shape: MoveShape,
    pub advance_vote: bool,
    pub restart_vote: bool,
}

impl GameKindConfig {
    pub const fn relocate() -> Self {
        Self {
            move_shape: MoveShape::Relocate,
            advance_vote: true,
            restart_vote: true,
        }
    }

    pub const fn seize() -> Self {
        Self {
            move_shape: MoveShape::Seize,
            advance_vote: false,
            restart_vote: true,
        }
    }

    pub fn enables(&self, kind: VoteKind) -> bool {
        match kind {
            VoteKind::AdvanceRound => self.advance_vote,
            VoteKind::RestartGame => self.restart_vote,
        }
    }
}

impl Default for GameKindConfig {
    fn default() -> Self {
        Self::relocate()
    }
}

/// Game kinds offered by the server: `p` kinds are matched, `g` kinds are custom rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    S4p2,
    S4p4,
    S4p8,
    S4g9,
    S4g15,
    S4g21,
}

impl GameKind {
    pub const MATCHED: [GameKind; 3] = [GameKind::S4p2, GameKind::S4p4, GameKind::S4p8];
    pub const CUSTOM: [GameKind; 3] = [GameKind::S4g9, GameKind::S4g15, GameKind::S4g21];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::S4p2 => "s4p2",
            GameKind::S4p4 => "s4p4",
            GameKind::S4p8 => "s4p8",
            GameKind::S4g9 => "s4g9",
            GameKind::S4g15 => "s4g15",
            GameKind::S4g21 => "s4g21",
        }
    }

    /// Expected board size before the first sync arrives.
    pub fn board_size(&self) -> (usize, usize) {
        match self {
            GameKind::S4p2 | GameKind::S4g9 => (9, 9),
            GameKind::S4p4 | GameKind::S4g15 => (15, 15),
            GameKind::S4p8 => (19, 19),
            GameKind::S4g21 => (21, 21),
        }
    }

    pub fn is_custom(&self) -> bool {
        Self::CUSTOM.contains(self)
    }

    pub fn config(&self) -> GameKindConfig {
        GameKindConfig::relocate()
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s4p2" => Ok(GameKind::S4p2),
            "s4p4" => Ok(GameKind::S4p4),
            "s4p8" => Ok(GameKind::S4p8),
            "s4g9" => Ok(GameKind::S4g9),
            "s4g15" => Ok(GameKind::S4g15),
            "s4g21" => Ok(GameKind::S4g21),
            other => Err(ProtocolError::UnknownGameKind(other.to_string())),
        }
    }
}

/// Anything the server pushed that does not fit the wire contract.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid board cell at ({x}, {y}): {value}")]
    InvalidCell { x: usize, y: usize, value: String },
    #[error("ragged board: row {row} has {len} cells, expected {expected}")]
    RaggedBoard {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("player {0} occupies more than one cell")]
    DuplicateOccupant(PlayerId),
    #[error("position {0} is outside the board")]
    OutOfBounds(Position),
    #[error("unknown game result `{0}`")]
    UnknownResult(String),
    #[error("unknown game kind `{0}`")]
    UnknownGameKind(String),
    #[error("malformed `{event}` payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}
