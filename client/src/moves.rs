//! Legal destination derivation and the optimistic move state machine.
//!
//! Per round the engine walks `Idle -> Selected -> Submitted` and then either
//! `Confirmed` (the server echoed the move or the round advanced) or
//! `Rejected` (a conflict push rolled it back). The legal set is never cached:
//! callers recompute it from the current board, position and turn gate.

use log::{debug, info};
use shared::{Board, MoveIntent, MoveShape, Position, RoundNumber};

/// Cells the local player may move to right now.
///
/// Unplaced players may drop onto any empty cell. Placed players may step to
/// an in-bounds, empty orthogonal neighbor. A closed turn yields nothing.
pub fn legal_destinations(
    board: &Board,
    my_position: Option<Position>,
    turn_open: bool,
) -> Vec<Position> {
    if !turn_open {
        return Vec::new();
    }

    match my_position {
        None => board.empty_cells().collect(),
        Some(pos) => pos
            .neighbors()
            .into_iter()
            .filter(|n| board.get(*n).is_some_and(|cell| cell.is_empty()))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePhase {
    Idle,
    Selected(Position),
    Submitted(MoveIntent),
    Confirmed(Position),
    Rejected,
}

#[derive(Debug, Clone)]
pub struct MoveEngine {
    shape: MoveShape,
    phase: MovePhase,
    /// Set on submit, before the server has acknowledged anything.
    optimistic_moved: bool,
    /// Set once the game is over; closes the turn regardless of round.
    frozen: bool,
}

impl MoveEngine {
    pub fn new(shape: MoveShape) -> Self {
        Self {
            shape,
            phase: MovePhase::Idle,
            optimistic_moved: false,
            frozen: false,
        }
    }

    pub fn phase(&self) -> &MovePhase {
        &self.phase
    }

    pub fn shape(&self) -> MoveShape {
        self.shape
    }

    /// The locally chosen destination the server has not confirmed yet.
    pub fn pending(&self) -> Option<Position> {
        match &self.phase {
            MovePhase::Selected(pos) => Some(*pos),
            MovePhase::Submitted(intent) => Some(intent.destination()),
            _ => None,
        }
    }

    pub fn has_moved_optimistically(&self) -> bool {
        self.optimistic_moved
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Derived turn gate; `server_says_moved` is the local player's status flag.
    pub fn turn_open(&self, round: RoundNumber, server_says_moved: bool) -> bool {
        !self.frozen && round != 0 && !self.optimistic_moved && !server_says_moved
    }

    /// Records `pos` as the pending move if it is currently legal. Illegal
    /// picks are ignored. Returns whether the selection took.
    pub fn select(&mut self, pos: Position, legal: &[Position], turn_open: bool) -> bool {
        if !turn_open || !legal.contains(&pos) {
            debug!("Ignoring selection of {}", pos);
            return false;
        }

        match self.phase {
            MovePhase::Idle | MovePhase::Selected(_) | MovePhase::Rejected => {
                self.phase = MovePhase::Selected(pos);
                true
            }
            MovePhase::Submitted(_) | MovePhase::Confirmed(_) => false,
        }
    }

    /// Turns the pending selection into a move intent and marks the local
    /// player as moved until the server says otherwise.
    pub fn submit(
        &mut self,
        origin: Option<Position>,
        round: RoundNumber,
        turn_open: bool,
    ) -> Option<MoveIntent> {
        let MovePhase::Selected(destination) = self.phase else {
            return None;
        };
        if !turn_open {
            return None;
        }

        let intent = match self.shape {
            MoveShape::Relocate => MoveIntent::Relocate {
                origin,
                destination,
                round,
            },
            MoveShape::Seize => MoveIntent::Seize { destination, round },
        };

        info!("Submitting move to {} for round {}", destination, round);
        self.phase = MovePhase::Submitted(intent.clone());
        self.optimistic_moved = true;
        Some(intent)
    }

    /// Server acknowledged the local move.
    pub fn confirm(&mut self) {
        if let MovePhase::Submitted(intent) = &self.phase {
            self.phase = MovePhase::Confirmed(intent.destination());
        }
    }

    /// Rolls back the optimistic move. Returns whether a submission was in flight.
    pub fn reject(&mut self) -> bool {
        let in_flight = matches!(self.phase, MovePhase::Submitted(_));
        self.phase = if in_flight {
            MovePhase::Rejected
        } else {
            MovePhase::Idle
        };
        self.optimistic_moved = false;
        in_flight
    }

    /// A new round started: drop any pending move and the optimistic flag.
    pub fn reset_round(&mut self) {
        self.phase = MovePhase::Idle;
        self.optimistic_moved = false;
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}
