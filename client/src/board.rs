//! Local mirror of the authoritative board, round counter, and player tables.

use log::{debug, info};
use shared::{
    Board, PlayerId, PlayerProfile, PlayerStatus, Position, ProtocolError, RoundNumber,
    StatusPatch,
};
use std::collections::HashMap;

/// What a board sync changed, so the caller can reset per-round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub previous_round: RoundNumber,
    pub round: RoundNumber,
    /// First sync after the round sequence was reset.
    pub restarted: bool,
}

impl SyncOutcome {
    pub fn round_changed(&self) -> bool {
        self.restarted || self.previous_round != self.round
    }
}

/// Canonical copy of everything the server pushes about the room.
///
/// The board and round are replaced together on every sync. The status table
/// supports both a wholesale replace (join confirmation) and per-player merges
/// (join/leave/move notifications).
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    board: Board,
    round: RoundNumber,
    statuses: HashMap<PlayerId, PlayerStatus>,
    profiles: HashMap<PlayerId, PlayerProfile>,
    sequence_reset: bool,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty board of the expected size, shown until the first sync.
    pub fn with_size(size_x: usize, size_y: usize) -> Self {
        Self {
            board: Board::empty(size_x, size_y),
            ..Self::default()
        }
    }

    /// Normalizes `grid` and replaces the board and round together. Nothing
    /// is touched if the grid is malformed. A round change clears every
    /// `has_moved` flag.
    pub fn apply_board_sync(
        &mut self,
        grid: &[Vec<serde_json::Value>],
        round: RoundNumber,
    ) -> Result<SyncOutcome, ProtocolError> {
        let board = Board::from_raw(grid)?;
        let outcome = SyncOutcome {
            previous_round: self.round,
            round,
            restarted: self.sequence_reset,
        };

        self.board = board;
        self.round = round;
        self.sequence_reset = false;

        if outcome.round_changed() {
            info!("Round {} -> {}", outcome.previous_round, round);
            for status in self.statuses.values_mut() {
                status.has_moved = false;
            }
        }

        Ok(outcome)
    }

    pub fn apply_status_replace(&mut self, statuses: HashMap<PlayerId, PlayerStatus>) {
        debug!("Replacing status table ({} players)", statuses.len());
        self.statuses = statuses;
    }

    /// Merges one field for one player, creating an offline/unmoved entry first if needed.
    pub fn apply_status_merge(&mut self, player: &PlayerId, patch: StatusPatch) {
        self.statuses
            .entry(player.clone())
            .or_default()
            .apply(patch);
    }

    pub fn apply_profiles_replace(&mut self, profiles: HashMap<PlayerId, PlayerProfile>) {
        self.profiles = profiles;
    }

    pub fn upsert_profile(&mut self, profile: PlayerProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn locate(&self, player: &PlayerId) -> Option<Position> {
        self.board.locate(player)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn round(&self) -> RoundNumber {
        self.round
    }

    /// Status of `player`, defaulting to offline/unmoved when unknown.
    pub fn status(&self, player: &PlayerId) -> PlayerStatus {
        self.statuses.get(player).copied().unwrap_or_default()
    }

    pub fn statuses(&self) -> &HashMap<PlayerId, PlayerStatus> {
        &self.statuses
    }

    pub fn profiles(&self) -> &HashMap<PlayerId, PlayerProfile> {
        &self.profiles
    }

    pub fn profile(&self, player: &PlayerId) -> Option<&PlayerProfile> {
        self.profiles.get(player)
    }

    pub fn online_count(&self) -> usize {
        self.statuses.values().filter(|s| s.online).count()
    }

    /// The game restarted. Every `has_moved` flag is dropped and the next sync
    /// counts as a new round whatever number it carries.
    pub fn reset_round_sequence(&mut self) {
        info!("Round sequence reset at round {}", self.round);
        for status in self.statuses.values_mut() {
            status.has_moved = false;
        }
        self.sequence_reset = true;
    }

    /// True when someone is offline and has not moved, i.e. the round is stuck on them.
    pub fn has_stalled_player(&self) -> bool {
        self.statuses.values().any(|s| !s.online && !s.has_moved)
    }

    /// Forget everything; used when leaving the room.
    pub fn clear(&mut self) {
        *self = Self::with_size(self.board.size_x(), self.board.size_y());
    }
}
