//! Presentation-facing output of the core.
//!
//! The engine never talks to a widget toolkit. It queues [`UiEvent`]s in an
//! [`Outbox`] that the presentation layer drains after every dispatch, and it
//! exposes read-only snapshots for rendering.

use shared::{Board, GameOutcome, PlayerId, Position, RoundNumber, VoteKind};
use std::collections::VecDeque;
use std::fmt;

/// Handle for a prompt the presentation layer is showing.
pub type PromptId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Lobby,
    Game,
    Login,
}

/// Choices offered when a game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ReturnToLobby,
    VoteRestart,
}

/// Transient, non-blocking user notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MoveClashed,
    SeizeFailed,
    VoteProposed(VoteKind),
    VotePassed(VoteKind),
    VoteFailed(VoteKind),
    PlayerQuit { name: String },
    RoomOwner,
    MissingRoomContext,
    MissingIdentity,
    Evicted,
    ProtocolFault(String),
    Disconnected,
    Reconnected,
    MatchInterrupted,
    CannotJoinRoom,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MoveClashed => f.write_str("That cell was just taken. Pick another move."),
            Notice::SeizeFailed => f.write_str("Someone seized that cell first. Pick another."),
            Notice::VoteProposed(kind) => write!(f, "Proposed to {}; waiting for votes.", kind),
            Notice::VotePassed(kind) => write!(f, "Vote to {} passed.", kind),
            Notice::VoteFailed(kind) => write!(f, "Vote to {} was rejected.", kind),
            Notice::PlayerQuit { name } => write!(f, "{} left the game.", name),
            Notice::RoomOwner => f.write_str("You own this room. Start once everyone is here."),
            Notice::MissingRoomContext => f.write_str("No game room to join; back to the lobby."),
            Notice::MissingIdentity => f.write_str("No account in the session; log in first."),
            Notice::Evicted => {
                f.write_str("You fell behind (possibly disconnected) and were removed.")
            }
            Notice::ProtocolFault(detail) => write!(f, "Ignored a malformed server update: {}", detail),
            Notice::Disconnected => f.write_str("Disconnected from the server."),
            Notice::Reconnected => f.write_str("Reconnected."),
            Notice::MatchInterrupted => {
                f.write_str("Connection lost while matching. Start again once reconnected.")
            }
            Notice::CannotJoinRoom => {
                f.write_str("Could not join; the game may have already started.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    /// Ask the local user to approve or reject a vote.
    VotePrompt {
        kind: VoteKind,
        prompt: PromptId,
    },
    /// Close a prompt that is no longer answerable.
    DismissPrompt(PromptId),
    GameOverPrompt {
        outcome: GameOutcome,
        local_won: bool,
        prompt: PromptId,
        options: [Resolution; 2],
    },
    Navigate(Route),
}

/// FIFO of pending UI events plus the prompt id allocator.
#[derive(Debug, Default)]
pub struct Outbox {
    events: VecDeque<UiEvent>,
    next_prompt: PromptId,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: UiEvent) {
        self.events.push_back(event);
    }

    pub fn notice(&mut self, notice: Notice) {
        self.push(UiEvent::Notice(notice));
    }

    pub fn navigate(&mut self, route: Route) {
        self.push(UiEvent::Navigate(route));
    }

    pub fn dismiss(&mut self, prompt: PromptId) {
        self.push(UiEvent::DismissPrompt(prompt));
    }

    pub fn next_prompt_id(&mut self) -> PromptId {
        self.next_prompt += 1;
        self.next_prompt
    }

    pub fn drain(&mut self) -> Vec<UiEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One row of the player list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    pub id: PlayerId,
    pub name: String,
    pub online: bool,
    pub has_moved: bool,
    pub is_owner: bool,
}

/// Read-only snapshot of the game for rendering. Rebuilt on demand, never
/// written back.
#[derive(Debug, Clone)]
pub struct GameView {
    pub board: Board,
    pub round: RoundNumber,
    pub local: PlayerId,
    pub my_position: Option<Position>,
    pub pending: Option<Position>,
    pub legal: Vec<Position>,
    pub turn_open: bool,
    pub outcome: GameOutcome,
    /// Sorted by player id.
    pub players: Vec<PlayerLine>,
    pub can_start: bool,
    pub can_propose_advance: bool,
    pub can_propose_restart: bool,
}

/// Name to show for a player: display name when known, else the raw id.
pub fn display_name(id: &PlayerId, known: Option<&str>) -> String {
    match known {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id.to_string(),
    }
}
