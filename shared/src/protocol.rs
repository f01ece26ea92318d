//! Named-event wire contract.
//!
//! Every message on the bus is an [`Envelope`]: an event name plus a JSON
//! payload. Inbound envelopes decode into [`ServerEvent`], outbound intents
//! encode from [`ClientEvent`].

use crate::board::RawGrid;
use crate::{
    GameKind, GameOutcome, PlayerId, PlayerProfile, PlayerStatus, Position, ProtocolError,
    RoundNumber, VoteKind,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Inbound event names.
pub mod events {
    pub const SYNC_BOARD: &str = "sync board";
    pub const SYNC_PLAYERS_STATUS: &str = "sync players status";
    pub const SYNC_PLAYERS_INFO: &str = "sync players info";
    pub const OTHER_PLAYER_JOIN: &str = "other player join";
    pub const OTHER_PLAYER_LEAVE: &str = "other player leave";
    pub const OTHER_PLAYER_MOVE: &str = "other player move";
    pub const OTHER_PLAYER_QUIT_GAME: &str = "other player quit game";
    pub const CLASHED_MOVING: &str = "clashed moving";
    pub const SEIZE_FAIL: &str = "seize fail";
    pub const CUSTOM_GAME_MASTER: &str = "custom game master";
    pub const VOTE_RESTART_CALL: &str = "vote restart call";
    pub const VOTE_RESTART_SUCCESS: &str = "vote restart success";
    pub const VOTE_RESTART_FAILED: &str = "vote restart failed";
    pub const VOTE_NEXT_STEP_CALL: &str = "vote next step call";
    pub const VOTE_NEXT_STEP_SUCCESS: &str = "vote next step success";
    pub const VOTE_NEXT_STEP_FAILED: &str = "vote next step failed";
    pub const GAME_OVER: &str = "game over";
    pub const GAME_OVER_CAUSE_MISS_STEP: &str = "game over cause miss step";
    pub const MATCH_GAME_SUCCESS: &str = "match game success";
    pub const CUSTOM_GAME_SUCCESS: &str = "custom game success";
    pub const CUSTOM_GAME_BASE_INFO_SUCCESS: &str = "custom game base info success";
    pub const NEED_LOGIN: &str = "need login";

    /// Everything the in-game controller listens to.
    pub const GAME: &[&str] = &[
        SYNC_BOARD,
        SYNC_PLAYERS_STATUS,
        SYNC_PLAYERS_INFO,
        OTHER_PLAYER_JOIN,
        OTHER_PLAYER_LEAVE,
        OTHER_PLAYER_MOVE,
        OTHER_PLAYER_QUIT_GAME,
        CLASHED_MOVING,
        SEIZE_FAIL,
        CUSTOM_GAME_MASTER,
        VOTE_RESTART_CALL,
        VOTE_RESTART_SUCCESS,
        VOTE_RESTART_FAILED,
        VOTE_NEXT_STEP_CALL,
        VOTE_NEXT_STEP_SUCCESS,
        VOTE_NEXT_STEP_FAILED,
        GAME_OVER,
        GAME_OVER_CAUSE_MISS_STEP,
    ];

    /// Everything the lobby listens to.
    pub const LOBBY: &[&str] = &[
        MATCH_GAME_SUCCESS,
        CUSTOM_GAME_SUCCESS,
        CUSTOM_GAME_BASE_INFO_SUCCESS,
        NEED_LOGIN,
    ];
}

/// One named event with its JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SyncBoard {
        grid: RawGrid,
        round: RoundNumber,
    },
    SyncPlayersStatus(HashMap<PlayerId, PlayerStatus>),
    SyncPlayersInfo(HashMap<PlayerId, PlayerProfile>),
    PlayerJoined {
        player_id: PlayerId,
        profile: Option<PlayerProfile>,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerMoved {
        player_id: PlayerId,
    },
    PlayerQuitGame {
        player_id: PlayerId,
    },
    /// Destination was taken by a concurrent relocate.
    MoveClashed,
    /// Destination was taken by a concurrent seize.
    SeizeFailed,
    CustomGameMaster {
        owner: PlayerId,
    },
    VoteProposed {
        kind: VoteKind,
        initiator: Option<PlayerId>,
    },
    VoteResolved {
        kind: VoteKind,
        passed: bool,
    },
    GameOver(GameOutcome),
    /// The local player missed too many rounds and was removed.
    EvictedForMissedRounds,
    MatchSucceeded {
        room_id: String,
    },
    CustomGameCreated {
        room_id: String,
    },
    RoomInfo {
        room_id: String,
        game_kind: GameKind,
        can_join: bool,
    },
    NeedLogin,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncBoardMsg {
    board_grids: RawGrid,
    #[serde(deserialize_with = "round_number")]
    current_step_num: RoundNumber,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayersStatusMsg {
    players_status_map: HashMap<PlayerId, PlayerStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayersInfoMsg {
    players_info_map: HashMap<PlayerId, PlayerProfile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerMsg {
    player_id: PlayerId,
    #[serde(default)]
    player_info: Option<PlayerProfile>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VoteCallMsg {
    #[serde(default)]
    player_id: Option<PlayerId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameMasterMsg {
    custom_game_master: PlayerId,
}

#[derive(Deserialize)]
struct GameOverMsg {
    result: String,
    #[serde(default)]
    winner: Option<PlayerId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomMsg {
    game_room_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomInfoMsg {
    game_room_id: String,
    game_type: String,
    #[serde(default)]
    can_join: bool,
}

/// The round counter has been seen both as a number and as a numeric string.
fn round_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RoundNumber, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(RoundNumber),
        Text(String),
    }

    match Loose::deserialize(deserializer)? {
        Loose::Number(n) => Ok(n),
        Loose::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ProtocolError> {
    T::deserialize(&envelope.data).map_err(|source| ProtocolError::Payload {
        event: envelope.event.clone(),
        source,
    })
}

/// Vote call payloads are optional; a missing or null body means "unknown initiator".
fn vote_call(envelope: &Envelope, kind: VoteKind) -> Result<ServerEvent, ProtocolError> {
    let msg: VoteCallMsg = if envelope.data.is_null() {
        VoteCallMsg::default()
    } else {
        payload(envelope)?
    };
    Ok(ServerEvent::VoteProposed {
        kind,
        initiator: msg.player_id,
    })
}

impl ServerEvent {
    /// Decodes an inbound envelope. Unknown event names yield `Ok(None)`.
    pub fn decode(envelope: &Envelope) -> Result<Option<Self>, ProtocolError> {
        use events::*;

        let event = match envelope.event.as_str() {
            SYNC_BOARD => {
                let msg: SyncBoardMsg = payload(envelope)?;
                ServerEvent::SyncBoard {
                    grid: msg.board_grids,
                    round: msg.current_step_num,
                }
            }
            SYNC_PLAYERS_STATUS => {
                let msg: PlayersStatusMsg = payload(envelope)?;
                ServerEvent::SyncPlayersStatus(msg.players_status_map)
            }
            SYNC_PLAYERS_INFO => {
                let msg: PlayersInfoMsg = payload(envelope)?;
                ServerEvent::SyncPlayersInfo(msg.players_info_map)
            }
            OTHER_PLAYER_JOIN => {
                let msg: PlayerMsg = payload(envelope)?;
                ServerEvent::PlayerJoined {
                    player_id: msg.player_id,
                    profile: msg.player_info,
                }
            }
            OTHER_PLAYER_LEAVE => ServerEvent::PlayerLeft {
                player_id: payload::<PlayerMsg>(envelope)?.player_id,
            },
            OTHER_PLAYER_MOVE => ServerEvent::PlayerMoved {
                player_id: payload::<PlayerMsg>(envelope)?.player_id,
            },
            OTHER_PLAYER_QUIT_GAME => ServerEvent::PlayerQuitGame {
                player_id: payload::<PlayerMsg>(envelope)?.player_id,
            },
            CLASHED_MOVING => ServerEvent::MoveClashed,
            SEIZE_FAIL => ServerEvent::SeizeFailed,
            CUSTOM_GAME_MASTER => ServerEvent::CustomGameMaster {
                owner: payload::<GameMasterMsg>(envelope)?.custom_game_master,
            },
            VOTE_RESTART_CALL => vote_call(envelope, VoteKind::RestartGame)?,
            VOTE_NEXT_STEP_CALL => vote_call(envelope, VoteKind::AdvanceRound)?,
            VOTE_RESTART_SUCCESS => ServerEvent::VoteResolved {
                kind: VoteKind::RestartGame,
                passed: true,
            },
            VOTE_RESTART_FAILED => ServerEvent::VoteResolved {
                kind: VoteKind::RestartGame,
                passed: false,
            },
            VOTE_NEXT_STEP_SUCCESS => ServerEvent::VoteResolved {
                kind: VoteKind::AdvanceRound,
                passed: true,
            },
            VOTE_NEXT_STEP_FAILED => ServerEvent::VoteResolved {
                kind: VoteKind::AdvanceRound,
                passed: false,
            },
            GAME_OVER => {
                let msg: GameOverMsg = payload(envelope)?;
                let outcome = match msg.result.as_str() {
                    "normal" => GameOutcome::Decided { winner: msg.winner },
                    "draw" => GameOutcome::Draw,
                    other => return Err(ProtocolError::UnknownResult(other.to_string())),
                };
                ServerEvent::GameOver(outcome)
            }
            GAME_OVER_CAUSE_MISS_STEP => ServerEvent::EvictedForMissedRounds,
            MATCH_GAME_SUCCESS => ServerEvent::MatchSucceeded {
                room_id: payload::<RoomMsg>(envelope)?.game_room_id,
            },
            CUSTOM_GAME_SUCCESS => ServerEvent::CustomGameCreated {
                room_id: payload::<RoomMsg>(envelope)?.game_room_id,
            },
            CUSTOM_GAME_BASE_INFO_SUCCESS => {
                let msg: RoomInfoMsg = payload(envelope)?;
                ServerEvent::RoomInfo {
                    room_id: msg.game_room_id,
                    game_kind: msg.game_type.parse()?,
                    can_join: msg.can_join,
                }
            }
            NEED_LOGIN => ServerEvent::NeedLogin,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Move submission in the shape the current game kind expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
    Relocate {
        origin: Option<Position>,
        destination: Position,
        round: RoundNumber,
    },
    Seize {
        destination: Position,
        round: RoundNumber,
    },
}

impl MoveIntent {
    pub fn destination(&self) -> Position {
        match self {
            MoveIntent::Relocate { destination, .. } | MoveIntent::Seize { destination, .. } => {
                *destination
            }
        }
    }
}

/// Intents sent to the server. All are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    JoinGameRoom { room_id: String },
    SubmitMove(MoveIntent),
    /// Both a vote response and, with `approve = true`, a proposal.
    Vote { kind: VoteKind, approve: bool },
    CustomGameStart { room_id: String },
    QuitGame,
    Logout,
    MatchGame { kind: GameKind },
    CancelMatchGame { kind: Option<GameKind> },
    CustomGame { kind: GameKind },
    CustomGameBaseInfo { room_id: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinGameRoom { .. } => "join game room",
            ClientEvent::SubmitMove(_) => "submit move",
            ClientEvent::Vote { kind, .. } => kind.wire_stem(),
            ClientEvent::CustomGameStart { .. } => "custom game start",
            ClientEvent::QuitGame => "quit game",
            ClientEvent::Logout => "logout",
            ClientEvent::MatchGame { .. } => "match game",
            ClientEvent::CancelMatchGame { .. } => "cancel match game",
            ClientEvent::CustomGame { .. } => "custom game",
            ClientEvent::CustomGameBaseInfo { .. } => "custom game base info",
        }
    }

    fn payload(&self) -> Value {
        match self {
            ClientEvent::JoinGameRoom { room_id }
            | ClientEvent::CustomGameStart { room_id }
            | ClientEvent::CustomGameBaseInfo { room_id } => json!({ "gameRoomId": room_id }),
            ClientEvent::SubmitMove(MoveIntent::Relocate {
                origin,
                destination,
                round,
            }) => match origin {
                Some(origin) => json!({ "oldPos": origin, "newPos": destination, "stepNum": round }),
                None => json!({ "newPos": destination, "stepNum": round }),
            },
            ClientEvent::SubmitMove(MoveIntent::Seize { destination, round }) => {
                json!({ "movePos": destination, "stepNum": round })
            }
            ClientEvent::Vote { approve, .. } => json!({ "vote": approve }),
            ClientEvent::QuitGame | ClientEvent::Logout => Value::Null,
            ClientEvent::MatchGame { kind } | ClientEvent::CustomGame { kind } => {
                json!({ "gameType": kind })
            }
            ClientEvent::CancelMatchGame { kind } => json!({ "gameType": kind }),
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        Envelope::new(self.name(), self.payload())
    }
}
