//! Game lifecycle controller.
//!
//! One controller serves every game kind; the differences (move payload
//! shape, which votes exist) come from [`GameKindConfig`]. The controller
//! owns the board mirror, the move engine and the vote registry, and is the
//! only thing that mutates them.

use crate::board::BoardStore;
use crate::error::ClientError;
use crate::moves::{self, MoveEngine};
use crate::session::SessionContext;
use crate::transport::{EventChannel, Listener, Subscription, Transport};
use crate::ui::{
    display_name, GameView, Notice, Outbox, PlayerLine, PromptId, Resolution, Route, UiEvent,
};
use crate::votes::VoteCoordinator;
use log::{debug, info, warn};
use shared::protocol::events;
use shared::{
    ClientEvent, GameKind, GameKindConfig, GameOutcome, PlayerId, Position, ProtocolError,
    RawGrid, RoundNumber, ServerEvent, StatusPatch, VoteKind,
};

pub struct GameController<T: Transport> {
    local: PlayerId,
    kind: Option<GameKind>,
    config: GameKindConfig,
    store: BoardStore,
    moves: MoveEngine,
    votes: VoteCoordinator,
    outcome: GameOutcome,
    owner: Option<PlayerId>,
    room_id: Option<String>,
    owner_notice_shown: bool,
    status_synced: bool,
    left: bool,
    game_over_prompt: Option<PromptId>,
    transport: T,
    outbox: Outbox,
    subscription: Option<Subscription>,
}

impl<T: Transport> GameController<T> {
    pub fn new(local: PlayerId, kind: Option<GameKind>, transport: T) -> Self {
        let config = kind.map(|k| k.config()).unwrap_or_default();
        let mut controller = Self::with_config(local, config, transport);
        if let Some(kind) = kind {
            let (size_x, size_y) = kind.board_size();
            controller.store = BoardStore::with_size(size_x, size_y);
        }
        controller.kind = kind;
        controller
    }

    pub fn with_config(local: PlayerId, config: GameKindConfig, transport: T) -> Self {
        Self {
            local,
            kind: None,
            config,
            store: BoardStore::new(),
            moves: MoveEngine::new(config.move_shape),
            votes: VoteCoordinator::new(config),
            outcome: GameOutcome::InProgress,
            owner: None,
            room_id: None,
            owner_notice_shown: false,
            status_synced: false,
            left: false,
            game_over_prompt: None,
            transport,
            outbox: Outbox::new(),
            subscription: None,
        }
    }

    pub fn attach(&mut self, channel: &EventChannel) {
        self.subscription = Some(channel.attach(Listener::Game, events::GAME));
    }

    pub fn detach(&mut self) {
        self.subscription = None;
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Sends `join game room` for the room stored in the session. Without a
    /// room id nothing is sent and the user is routed back to the lobby.
    pub fn join_room(&mut self, session: &mut SessionContext) -> Result<(), ClientError> {
        let Some(room_id) = session.room_id() else {
            warn!("No room id in session; returning to lobby");
            self.outbox.notice(Notice::MissingRoomContext);
            self.outbox.navigate(Route::Lobby);
            return Err(ClientError::MissingRoomContext);
        };

        info!("Joining room {}", room_id);
        self.left = false;
        self.status_synced = false;
        self.transport.emit(ClientEvent::JoinGameRoom {
            room_id: room_id.clone(),
        });
        self.room_id = Some(room_id);
        Ok(())
    }

    /// The connection came back. Nothing from before is trusted: listeners
    /// are re-attached and the room is joined again.
    pub fn on_reconnect(
        &mut self,
        channel: &EventChannel,
        session: &mut SessionContext,
    ) -> Result<(), ClientError> {
        if self.left {
            return Ok(());
        }

        self.detach();
        self.attach(channel);
        // A submission in flight may have been lost with the old connection
        self.moves.reset_round();
        // So would any vote resolution
        self.votes.close_all(&mut self.outbox);
        self.join_room(session)
    }

    pub fn handle(&mut self, event: ServerEvent, session: &mut SessionContext) {
        if self.left {
            debug!("Left the room; dropping {:?}", event);
            return;
        }

        match event {
            ServerEvent::SyncBoard { grid, round } => self.on_board_sync(&grid, round),
            ServerEvent::SyncPlayersStatus(statuses) => {
                if !self.status_synced {
                    info!("Room joined with {} players", statuses.len());
                    self.status_synced = true;
                }
                self.store.apply_status_replace(statuses);
                if self.store.status(&self.local).has_moved {
                    self.moves.confirm();
                }
            }
            ServerEvent::SyncPlayersInfo(profiles) => self.store.apply_profiles_replace(profiles),
            ServerEvent::PlayerJoined { player_id, profile } => {
                debug!("{} joined", player_id);
                if let Some(profile) = profile {
                    self.store.upsert_profile(profile);
                }
                self.store
                    .apply_status_merge(&player_id, StatusPatch::Online(true));
            }
            ServerEvent::PlayerLeft { player_id } => {
                debug!("{} left", player_id);
                self.store
                    .apply_status_merge(&player_id, StatusPatch::Online(false));
                self.votes.on_player_left(&player_id, &mut self.outbox);
            }
            ServerEvent::PlayerMoved { player_id } => {
                self.store
                    .apply_status_merge(&player_id, StatusPatch::HasMoved(true));
                if player_id == self.local {
                    self.moves.confirm();
                }
            }
            ServerEvent::PlayerQuitGame { player_id } => {
                self.store
                    .apply_status_merge(&player_id, StatusPatch::Online(false));
                self.votes.on_player_left(&player_id, &mut self.outbox);
                let known = self
                    .store
                    .profile(&player_id)
                    .map(|p| p.display_name.as_str());
                let name = display_name(&player_id, known);
                info!("{} quit the game", name);
                self.outbox.notice(Notice::PlayerQuit { name });
            }
            ServerEvent::MoveClashed => self.on_move_rejected(Notice::MoveClashed),
            ServerEvent::SeizeFailed => self.on_move_rejected(Notice::SeizeFailed),
            ServerEvent::CustomGameMaster { owner } => {
                info!("Room owner is {}", owner);
                self.owner = Some(owner);
                self.maybe_show_owner_notice();
            }
            ServerEvent::VoteProposed { kind, initiator } => {
                self.votes
                    .on_proposal(kind, initiator, &self.local, &mut self.outbox);
            }
            ServerEvent::VoteResolved { kind, passed } => {
                self.votes.on_resolved(kind, passed, &mut self.outbox);
                if passed && kind == VoteKind::RestartGame {
                    self.full_restart();
                }
            }
            ServerEvent::GameOver(outcome) => self.on_game_over(outcome),
            ServerEvent::EvictedForMissedRounds => self.on_forced_eviction(session),
            other => debug!("Game ignoring {:?}", other),
        }
    }

    /// A known event arrived with a payload that could not be decoded.
    pub fn report_fault(&mut self, err: &ProtocolError) {
        warn!("Dropping malformed push: {}", err);
        self.outbox.notice(Notice::ProtocolFault(err.to_string()));
    }

    pub fn select(&mut self, pos: Position) -> bool {
        let legal = self.legal_destinations();
        let turn_open = self.turn_open();
        self.moves.select(pos, &legal, turn_open)
    }

    pub fn submit(&mut self) -> bool {
        let origin = self.my_position();
        let round = self.store.round();
        let turn_open = self.turn_open();

        match self.moves.submit(origin, round, turn_open) {
            Some(intent) => {
                self.transport.emit(ClientEvent::SubmitMove(intent));
                true
            }
            None => false,
        }
    }

    pub fn turn_open(&self) -> bool {
        self.moves
            .turn_open(self.store.round(), self.store.status(&self.local).has_moved)
    }

    /// Recomputed from the current board every call.
    pub fn legal_destinations(&self) -> Vec<Position> {
        moves::legal_destinations(self.store.board(), self.my_position(), self.turn_open())
    }

    pub fn my_position(&self) -> Option<Position> {
        self.store.locate(&self.local)
    }

    /// Local view of whether we have moved this round, optimistic or confirmed.
    pub fn local_has_moved(&self) -> bool {
        self.moves.has_moved_optimistically() || self.store.status(&self.local).has_moved
    }

    pub fn can_propose_advance(&self) -> bool {
        !self.left
            && self.config.advance_vote
            && !self.outcome.is_terminal()
            && !self.votes.is_open(VoteKind::AdvanceRound)
            && self.store.has_stalled_player()
    }

    pub fn can_propose_restart(&self) -> bool {
        !self.left
            && self.config.restart_vote
            && !self.votes.is_open(VoteKind::RestartGame)
            && (self.store.round() > 0 || self.outcome.is_terminal())
    }

    /// Proposes skipping the stalled player. Silent no-op unless someone is stalled.
    pub fn propose_advance_round(&mut self) -> bool {
        if !self.can_propose_advance() {
            debug!("Advance-round proposal not available");
            return false;
        }
        self.propose(VoteKind::AdvanceRound)
    }

    pub fn propose_restart(&mut self) -> bool {
        if !self.can_propose_restart() {
            debug!("Restart proposal not available");
            return false;
        }
        self.propose(VoteKind::RestartGame)
    }

    pub fn respond_vote(&mut self, kind: VoteKind, approve: bool) -> bool {
        match self.votes.respond(kind, approve) {
            Some(event) => {
                self.transport.emit(event);
                true
            }
            None => false,
        }
    }

    pub fn on_game_over(&mut self, outcome: GameOutcome) {
        if !outcome.is_terminal() {
            return;
        }

        info!("Game over: {:?}", outcome);
        self.moves.freeze();
        self.outcome = outcome.clone();

        let local_won =
            matches!(&outcome, GameOutcome::Decided { winner: Some(w) } if *w == self.local);
        self.dismiss_game_over_prompt();
        let prompt = self.outbox.next_prompt_id();
        self.game_over_prompt = Some(prompt);
        self.outbox.push(UiEvent::GameOverPrompt {
            outcome,
            local_won,
            prompt,
            options: [Resolution::ReturnToLobby, Resolution::VoteRestart],
        });
    }

    /// Returns false when a restart could not be proposed.
    pub fn resolve_game_over(
        &mut self,
        resolution: Resolution,
        session: &mut SessionContext,
    ) -> bool {
        match resolution {
            Resolution::ReturnToLobby => {
                self.return_to_lobby(session);
                true
            }
            Resolution::VoteRestart => {
                self.dismiss_game_over_prompt();
                self.propose_restart()
            }
        }
    }

    /// The server removed us for missing rounds. No vote, no appeal.
    pub fn on_forced_eviction(&mut self, session: &mut SessionContext) {
        warn!("Evicted from room {:?} for missed rounds", self.room_id);
        self.outbox.notice(Notice::Evicted);
        self.return_to_lobby(session);
    }

    pub fn return_to_lobby(&mut self, session: &mut SessionContext) {
        self.quit(session);
    }

    /// Tells the server we are leaving, forgets the room and goes back to the
    /// lobby. Calling it again does nothing.
    pub fn quit(&mut self, session: &mut SessionContext) {
        if self.left {
            debug!("Already left the room");
            return;
        }

        info!("Leaving room {:?}", self.room_id);
        self.left = true;
        self.transport.emit(ClientEvent::QuitGame);
        session.clear_game();
        self.votes.close_all(&mut self.outbox);
        self.dismiss_game_over_prompt();
        self.store.clear();
        self.room_id = None;
        self.detach();
        self.outbox.navigate(Route::Lobby);
    }

    pub fn is_owner(&self) -> bool {
        self.owner.as_ref() == Some(&self.local)
    }

    pub fn can_start_game(&self) -> bool {
        !self.left && self.is_owner() && self.store.round() == 0 && self.store.online_count() > 1
    }

    pub fn start_custom_game(&mut self, session: &mut SessionContext) -> bool {
        if !self.can_start_game() {
            debug!("Cannot start the game yet");
            return false;
        }
        let Some(room_id) = self.room_id.clone().or_else(|| session.room_id()) else {
            return false;
        };

        info!("Starting custom game in {}", room_id);
        self.transport.emit(ClientEvent::CustomGameStart { room_id });
        true
    }

    pub fn view(&self) -> GameView {
        let mut players: Vec<PlayerLine> = self
            .store
            .statuses()
            .iter()
            .map(|(id, status)| PlayerLine {
                id: id.clone(),
                name: display_name(id, self.store.profile(id).map(|p| p.display_name.as_str())),
                online: status.online,
                has_moved: status.has_moved,
                is_owner: self.owner.as_ref() == Some(id),
            })
            .collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));

        GameView {
            board: self.store.board().clone(),
            round: self.store.round(),
            local: self.local.clone(),
            my_position: self.my_position(),
            pending: self.moves.pending(),
            legal: self.legal_destinations(),
            turn_open: self.turn_open(),
            outcome: self.outcome.clone(),
            players,
            can_start: self.can_start_game(),
            can_propose_advance: self.can_propose_advance(),
            can_propose_restart: self.can_propose_restart(),
        }
    }

    pub fn drain_ui(&mut self) -> Vec<UiEvent> {
        self.outbox.drain()
    }

    pub fn local(&self) -> &PlayerId {
        &self.local
    }

    pub fn kind(&self) -> Option<GameKind> {
        self.kind
    }

    pub fn config(&self) -> GameKindConfig {
        self.config
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    pub fn moves(&self) -> &MoveEngine {
        &self.moves
    }

    pub fn votes(&self) -> &VoteCoordinator {
        &self.votes
    }

    pub fn outcome(&self) -> &GameOutcome {
        &self.outcome
    }

    pub fn round(&self) -> RoundNumber {
        self.store.round()
    }

    pub fn has_left(&self) -> bool {
        self.left
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    fn on_board_sync(&mut self, grid: &RawGrid, round: RoundNumber) {
        match self.store.apply_board_sync(grid, round) {
            Ok(outcome) => {
                if outcome.round_changed() {
                    self.moves.reset_round();
                }
                self.maybe_show_owner_notice();
            }
            Err(e) => self.report_fault(&e),
        }
    }

    fn on_move_rejected(&mut self, notice: Notice) {
        let in_flight = self.moves.reject();
        if self.store.statuses().contains_key(&self.local) {
            self.store
                .apply_status_merge(&self.local, StatusPatch::HasMoved(false));
        }
        info!("Move rolled back ({})", if in_flight { "in flight" } else { "none pending" });
        self.outbox.notice(notice);
    }

    fn propose(&mut self, kind: VoteKind) -> bool {
        match self.votes.propose(kind, &self.local, &mut self.outbox) {
            Some(event) => {
                self.transport.emit(event);
                true
            }
            None => false,
        }
    }

    fn full_restart(&mut self) {
        info!("Restarting game");
        self.outcome = GameOutcome::InProgress;
        self.moves = MoveEngine::new(self.config.move_shape);
        self.store.reset_round_sequence();
        self.votes.close_all(&mut self.outbox);
        self.dismiss_game_over_prompt();
    }

    fn maybe_show_owner_notice(&mut self) {
        if !self.owner_notice_shown && self.is_owner() && self.store.round() == 0 {
            self.owner_notice_shown = true;
            self.outbox.notice(Notice::RoomOwner);
        }
    }

    fn dismiss_game_over_prompt(&mut self) {
        if let Some(prompt) = self.game_over_prompt.take() {
            self.outbox.dismiss(prompt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MovePhase;
    use crate::transport::Recorder;
    use serde_json::json;
    use shared::{GameStatus, MoveIntent, PlayerStatus};
    use std::collections::HashMap;

    fn grid(value: serde_json::Value) -> RawGrid {
        serde_json::from_value(value).unwrap()
    }

    fn session_in_room() -> SessionContext {
        let mut session = SessionContext::in_memory();
        session.set_room_id("room-1");
        session.set_game_kind(GameKind::S4p2);
        session.set_game_status(GameStatus::Gaming);
        session
    }

    fn joined() -> (GameController<Recorder>, Recorder, SessionContext) {
        let recorder = Recorder::new();
        let mut game = GameController::new("me".into(), Some(GameKind::S4p2), recorder.clone());
        let mut session = session_in_room();
        game.join_room(&mut session).unwrap();
        recorder.take();
        (game, recorder, session)
    }

    fn statuses(entries: &[(&str, bool, bool)]) -> HashMap<PlayerId, PlayerStatus> {
        entries
            .iter()
            .map(|(id, online, has_moved)| {
                (
                    PlayerId::from(*id),
                    PlayerStatus {
                        online: *online,
                        has_moved: *has_moved,
                    },
                )
            })
            .collect()
    }

    fn sync(
        game: &mut GameController<Recorder>,
        session: &mut SessionContext,
        value: serde_json::Value,
        round: RoundNumber,
    ) {
        game.handle(
            ServerEvent::SyncBoard {
                grid: grid(value),
                round,
            },
            session,
        );
    }

    #[test]
    fn test_join_requires_room_id() {
        let recorder = Recorder::new();
        let mut game = GameController::new("me".into(), None, recorder.clone());
        let mut session = SessionContext::in_memory();

        let result = game.join_room(&mut session);
        assert!(matches!(result, Err(ClientError::MissingRoomContext)));
        assert!(recorder.sent().is_empty());
        assert_eq!(
            game.drain_ui(),
            vec![
                UiEvent::Notice(Notice::MissingRoomContext),
                UiEvent::Navigate(Route::Lobby)
            ]
        );
    }

    #[test]
    fn test_join_emits_room_id() {
        let recorder = Recorder::new();
        let mut game = GameController::new("me".into(), Some(GameKind::S4p4), recorder.clone());
        let mut session = session_in_room();

        game.join_room(&mut session).unwrap();
        assert_eq!(
            recorder.sent(),
            vec![ClientEvent::JoinGameRoom {
                room_id: "room-1".into()
            }]
        );
        assert_eq!(game.store().board().size_x(), 15);
    }

    #[test]
    fn test_move_round_trip() {
        let (mut game, recorder, mut session) = joined();
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false), ("p2", true, false)])),
            &mut session,
        );
        sync(&mut game, &mut session, json!([["me", 0, 0], [0, 0, 0], [0, 0, "p2"]]), 1);

        assert!(game.select(Position::new(0, 1)));
        assert!(game.submit());
        assert_eq!(
            recorder.take(),
            vec![ClientEvent::SubmitMove(MoveIntent::Relocate {
                origin: Some(Position::new(0, 0)),
                destination: Position::new(0, 1),
                round: 1
            })]
        );
        assert!(game.legal_destinations().is_empty());
        assert!(game.local_has_moved());

        game.handle(ServerEvent::PlayerMoved { player_id: "me".into() }, &mut session);
        assert_eq!(game.moves().phase(), &MovePhase::Confirmed(Position::new(0, 1)));

        sync(&mut game, &mut session, json!([[0, "me", 0], [0, 0, 0], [0, 0, "p2"]]), 2);
        assert_eq!(game.moves().phase(), &MovePhase::Idle);
        assert!(game.turn_open());
        assert!(!game.local_has_moved());
    }

    #[test]
    fn test_clash_rolls_back() {
        let (mut game, _recorder, mut session) = joined();
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false)])),
            &mut session,
        );
        sync(&mut game, &mut session, json!([["me", 0], [0, 0]]), 1);
        game.select(Position::new(1, 0));
        game.submit();

        game.handle(ServerEvent::MoveClashed, &mut session);

        assert_eq!(game.moves().phase(), &MovePhase::Rejected);
        assert!(!game.local_has_moved());
        assert!(game.select(Position::new(1, 0)));
        assert_eq!(game.drain_ui(), vec![UiEvent::Notice(Notice::MoveClashed)]);
    }

    #[test]
    fn test_clash_does_not_invent_local_status() {
        let (mut game, _recorder, mut session) = joined();
        game.handle(ServerEvent::SeizeFailed, &mut session);
        assert!(!game.store().statuses().contains_key(&PlayerId::from("me")));
        assert_eq!(game.drain_ui(), vec![UiEvent::Notice(Notice::SeizeFailed)]);
    }

    #[test]
    fn test_select_before_start_is_ignored() {
        let (mut game, recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([[0, 0], [0, 0]]), 0);

        assert!(!game.select(Position::new(0, 0)));
        assert!(!game.submit());
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn test_malformed_sync_reports_fault() {
        let (mut game, _recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([["me"]]), 1);
        sync(&mut game, &mut session, json!([[true]]), 2);

        assert_eq!(game.round(), 1);
        let ui = game.drain_ui();
        assert!(matches!(ui.as_slice(), [UiEvent::Notice(Notice::ProtocolFault(_))]));
    }

    #[test]
    fn test_game_over_freezes_and_prompts() {
        let (mut game, _recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([[0, 0], [0, 0]]), 3);
        assert!(game.turn_open());

        game.handle(
            ServerEvent::GameOver(GameOutcome::Decided {
                winner: Some("me".into()),
            }),
            &mut session,
        );

        assert!(!game.turn_open());
        assert!(game.legal_destinations().is_empty());
        match game.drain_ui().as_slice() {
            [UiEvent::GameOverPrompt {
                local_won, options, ..
            }] => {
                assert!(*local_won);
                assert_eq!(*options, [Resolution::ReturnToLobby, Resolution::VoteRestart]);
            }
            other => panic!("unexpected {:?}", other),
        }

        sync(&mut game, &mut session, json!([[0, 0], [0, 0]]), 4);
        assert!(!game.turn_open(), "a later round does not unfreeze");
    }

    #[test]
    fn test_restart_vote_success_unfreezes() {
        let (mut game, recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([[0]]), 5);
        game.handle(ServerEvent::GameOver(GameOutcome::Draw), &mut session);
        game.drain_ui();

        game.resolve_game_over(Resolution::VoteRestart, &mut session);
        assert_eq!(
            recorder.take(),
            vec![ClientEvent::Vote {
                kind: VoteKind::RestartGame,
                approve: true
            }]
        );

        game.handle(
            ServerEvent::VoteResolved {
                kind: VoteKind::RestartGame,
                passed: true,
            },
            &mut session,
        );
        assert_eq!(game.outcome(), &GameOutcome::InProgress);
        assert!(!game.moves().is_frozen());

        sync(&mut game, &mut session, json!([[0]]), 1);
        assert!(game.turn_open());
    }

    #[test]
    fn test_restart_accepts_same_round_number() {
        let (mut game, _recorder, mut session) = joined();
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false)])),
            &mut session,
        );
        sync(&mut game, &mut session, json!([["me", 0]]), 1);
        assert!(game.select(Position::new(1, 0)));
        assert!(game.submit());
        game.handle(ServerEvent::PlayerMoved { player_id: "me".into() }, &mut session);
        game.handle(ServerEvent::GameOver(GameOutcome::Draw), &mut session);
        game.handle(
            ServerEvent::VoteResolved {
                kind: VoteKind::RestartGame,
                passed: true,
            },
            &mut session,
        );

        sync(&mut game, &mut session, json!([["me", 0]]), 1);

        assert!(!game.local_has_moved());
        assert!(game.turn_open());
        assert_eq!(game.moves().phase(), &MovePhase::Idle);
    }

    #[test]
    fn test_restart_refused_while_vote_open() {
        let (mut game, recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([[0]]), 2);
        game.handle(ServerEvent::GameOver(GameOutcome::Draw), &mut session);

        assert!(game.resolve_game_over(Resolution::VoteRestart, &mut session));
        assert_eq!(recorder.take().len(), 1);
        assert!(!game.resolve_game_over(Resolution::VoteRestart, &mut session));
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn test_advance_vote_needs_stalled_player() {
        let (mut game, recorder, mut session) = joined();
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false), ("p2", true, false)])),
            &mut session,
        );
        sync(&mut game, &mut session, json!([[0, 0]]), 1);

        assert!(!game.propose_advance_round());
        assert!(recorder.sent().is_empty());

        game.handle(ServerEvent::PlayerLeft { player_id: "p2".into() }, &mut session);
        assert!(game.propose_advance_round());
        assert_eq!(
            recorder.take(),
            vec![ClientEvent::Vote {
                kind: VoteKind::AdvanceRound,
                approve: true
            }]
        );
        assert!(!game.propose_advance_round(), "already open");
    }

    #[test]
    fn test_incoming_vote_prompt_and_response() {
        let (mut game, recorder, mut session) = joined();
        game.handle(
            ServerEvent::VoteProposed {
                kind: VoteKind::AdvanceRound,
                initiator: Some("p2".into()),
            },
            &mut session,
        );
        assert!(matches!(
            game.drain_ui().as_slice(),
            [UiEvent::VotePrompt {
                kind: VoteKind::AdvanceRound,
                ..
            }]
        ));

        assert!(game.respond_vote(VoteKind::AdvanceRound, false));
        assert!(!game.respond_vote(VoteKind::AdvanceRound, true));
        assert_eq!(recorder.take().len(), 1);

        game.handle(
            ServerEvent::VoteResolved {
                kind: VoteKind::AdvanceRound,
                passed: false,
            },
            &mut session,
        );
        assert!(!game.votes().is_open(VoteKind::AdvanceRound));
    }

    #[test]
    fn test_quit_is_idempotent() {
        let (mut game, recorder, mut session) = joined();

        game.quit(&mut session);
        game.quit(&mut session);

        assert_eq!(recorder.sent(), vec![ClientEvent::QuitGame]);
        assert_eq!(session.room_id(), None);
        assert_eq!(session.game_status(), None);
        assert_eq!(game.drain_ui(), vec![UiEvent::Navigate(Route::Lobby)]);
        assert!(game.has_left());
    }

    #[test]
    fn test_eviction_returns_to_lobby() {
        let (mut game, recorder, mut session) = joined();
        game.handle(ServerEvent::EvictedForMissedRounds, &mut session);

        assert_eq!(recorder.sent(), vec![ClientEvent::QuitGame]);
        assert_eq!(
            game.drain_ui(),
            vec![
                UiEvent::Notice(Notice::Evicted),
                UiEvent::Navigate(Route::Lobby)
            ]
        );

        game.handle(ServerEvent::MoveClashed, &mut session);
        assert!(game.drain_ui().is_empty(), "events after leaving are dropped");
    }

    #[test]
    fn test_owner_can_start_with_company() {
        let (mut game, recorder, mut session) = joined();
        game.handle(ServerEvent::CustomGameMaster { owner: "me".into() }, &mut session);
        assert_eq!(game.drain_ui(), vec![UiEvent::Notice(Notice::RoomOwner)]);

        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false)])),
            &mut session,
        );
        assert!(!game.start_custom_game(&mut session));

        game.handle(
            ServerEvent::PlayerJoined {
                player_id: "p2".into(),
                profile: None,
            },
            &mut session,
        );
        assert!(game.start_custom_game(&mut session));
        assert_eq!(
            recorder.take(),
            vec![ClientEvent::CustomGameStart {
                room_id: "room-1".into()
            }]
        );

        game.handle(ServerEvent::CustomGameMaster { owner: "me".into() }, &mut session);
        assert!(game.drain_ui().is_empty(), "owner notice is shown once");
    }

    #[test]
    fn test_other_player_quit_names_them() {
        let (mut game, _recorder, mut session) = joined();
        game.handle(
            ServerEvent::PlayerJoined {
                player_id: "p2".into(),
                profile: Some(shared::PlayerProfile::new("p2", "Bo")),
            },
            &mut session,
        );
        game.handle(ServerEvent::PlayerQuitGame { player_id: "p2".into() }, &mut session);

        assert!(!game.store().status(&"p2".into()).online);
        assert_eq!(
            game.drain_ui(),
            vec![UiEvent::Notice(Notice::PlayerQuit { name: "Bo".into() })]
        );
    }

    #[test]
    fn test_reconnect_rejoins() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = EventChannel::new(tx);
        let (mut game, recorder, mut session) = joined();
        game.attach(&channel);

        game.on_reconnect(&channel, &mut session).unwrap();
        assert_eq!(channel.subscription_count(), 1);
        assert_eq!(
            recorder.sent(),
            vec![ClientEvent::JoinGameRoom {
                room_id: "room-1".into()
            }]
        );
    }

    #[test]
    fn test_reconnect_closes_open_votes() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = EventChannel::new(tx);
        let (mut game, recorder, mut session) = joined();
        game.attach(&channel);
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("me", true, false), ("p2", false, false)])),
            &mut session,
        );
        sync(&mut game, &mut session, json!([["me", 0]]), 1);
        game.handle(
            ServerEvent::VoteProposed {
                kind: VoteKind::AdvanceRound,
                initiator: Some("p3".into()),
            },
            &mut session,
        );
        assert!(game.votes().is_open(VoteKind::AdvanceRound));
        game.drain_ui();

        game.on_reconnect(&channel, &mut session).unwrap();

        assert!(!game.votes().is_open(VoteKind::AdvanceRound));
        assert!(matches!(game.drain_ui().as_slice(), [UiEvent::DismissPrompt(_)]));
        assert!(game.can_propose_advance());
        recorder.take();
        assert!(game.propose_advance_round());
    }

    #[test]
    fn test_view_lists_players() {
        let (mut game, _recorder, mut session) = joined();
        sync(&mut game, &mut session, json!([["me", 0]]), 1);
        game.handle(
            ServerEvent::SyncPlayersStatus(statuses(&[("p2", false, true), ("me", true, false)])),
            &mut session,
        );

        let view = game.view();
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.players[0].id, PlayerId::from("me"));
        assert_eq!(view.my_position, Some(Position::new(0, 0)));
        assert_eq!(view.legal, vec![Position::new(1, 0)]);
        assert!(!view.can_propose_advance, "p2 is offline but already moved");
    }
}
