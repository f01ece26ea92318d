//! Matching, custom rooms and the invite door.
//!
//! The lobby only ever writes the session keys the game controller later
//! reads (`gameType`, `gameRoomId`, `gameStatus`) and asks to navigate.

use crate::clock::WaitClock;
use crate::error::ClientError;
use crate::session::SessionContext;
use crate::transport::{EventChannel, Listener, Subscription, Transport};
use crate::ui::{Notice, Outbox, Route, UiEvent};
use log::{debug, info, warn};
use shared::protocol::events;
use shared::{ClientEvent, GameKind, GameStatus, ServerEvent};

pub struct Lobby<T: Transport> {
    transport: T,
    clock: WaitClock,
    outbox: Outbox,
    subscription: Option<Subscription>,
}

impl<T: Transport> Lobby<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            clock: WaitClock::new(),
            outbox: Outbox::new(),
            subscription: None,
        }
    }

    pub fn attach(&mut self, channel: &EventChannel) {
        self.subscription = Some(channel.attach(Listener::Lobby, events::LOBBY));
    }

    /// Stops listening and cancels the wait clock.
    pub fn detach(&mut self) {
        self.subscription = None;
        self.clock.stop();
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Sends the user back into a game that was running when the client last exited.
    pub fn resume(&mut self, session: &mut SessionContext) -> bool {
        let gaming = session.game_status() == Some(GameStatus::Gaming);
        if gaming && session.game_kind().is_some() {
            info!("Resuming game in progress");
            self.outbox.navigate(Route::Game);
            return true;
        }
        false
    }

    pub fn match_game(
        &mut self,
        kind: GameKind,
        session: &mut SessionContext,
    ) -> Result<(), ClientError> {
        self.require_identity(session)?;

        info!("Matching for {}", kind);
        session.set_game_status(GameStatus::Matching);
        session.set_game_kind(kind);
        self.transport.emit(ClientEvent::MatchGame { kind });
        self.clock.start();
        Ok(())
    }

    pub fn cancel_match(&mut self, session: &mut SessionContext) {
        if session.game_status() != Some(GameStatus::Matching) {
            debug!("Not matching; nothing to cancel");
            return;
        }

        let kind = session.game_kind();
        self.transport.emit(ClientEvent::CancelMatchGame { kind });
        session.clear_game();
        self.clock.stop();
    }

    pub fn create_custom_game(
        &mut self,
        kind: GameKind,
        session: &mut SessionContext,
    ) -> Result<(), ClientError> {
        self.require_identity(session)?;
        if !kind.is_custom() {
            warn!("{} is not a custom game kind", kind);
            return Ok(());
        }

        info!("Creating custom {} room", kind);
        session.set_game_kind(kind);
        self.transport.emit(ClientEvent::CustomGame { kind });
        Ok(())
    }

    /// Asks the server about an invited room before joining it.
    pub fn open_door(&mut self, room_id: &str) {
        self.transport.emit(ClientEvent::CustomGameBaseInfo {
            room_id: room_id.to_string(),
        });
    }

    pub fn logout(&mut self, session: &mut SessionContext) {
        info!("Logging out");
        session.clear_identity();
        self.transport.emit(ClientEvent::Logout);
        self.outbox.navigate(Route::Login);
    }

    /// Connection dropped. A pending match cannot survive it.
    pub fn on_disconnect(&mut self, session: &mut SessionContext) {
        if session.game_status() == Some(GameStatus::Matching) {
            warn!("Connection lost while matching");
            session.clear_game();
            self.clock.stop();
            self.outbox.notice(Notice::MatchInterrupted);
        }
    }

    pub fn handle(&mut self, event: ServerEvent, session: &mut SessionContext) {
        match event {
            ServerEvent::MatchSucceeded { room_id } | ServerEvent::CustomGameCreated { room_id } => {
                info!("Entering room {}", room_id);
                self.enter_room(&room_id, session);
            }
            ServerEvent::RoomInfo {
                room_id,
                game_kind,
                can_join,
            } => self.on_room_info(&room_id, game_kind, can_join, session),
            ServerEvent::NeedLogin => {
                warn!("Server asked for login");
                self.clock.stop();
                self.outbox.navigate(Route::Login);
            }
            other => debug!("Lobby ignoring {:?}", other),
        }
    }

    pub fn waited_seconds(&self) -> u64 {
        self.clock.seconds()
    }

    pub fn is_matching(&self) -> bool {
        self.clock.is_running()
    }

    pub fn drain_ui(&mut self) -> Vec<UiEvent> {
        self.outbox.drain()
    }

    fn on_room_info(
        &mut self,
        room_id: &str,
        game_kind: GameKind,
        can_join: bool,
        session: &mut SessionContext,
    ) {
        let current = session.room_id();
        if current.as_deref().is_some_and(|id| id != room_id)
            && session.game_status() == Some(GameStatus::Gaming)
        {
            info!("Leaving room {:?} for invited room {}", current, room_id);
            self.transport.emit(ClientEvent::QuitGame);
            session.clear_game();
        }

        if !can_join {
            self.outbox.notice(Notice::CannotJoinRoom);
            self.outbox.navigate(Route::Lobby);
            return;
        }

        session.set_game_kind(game_kind);
        self.enter_room(room_id, session);
    }

    fn enter_room(&mut self, room_id: &str, session: &mut SessionContext) {
        session.set_room_id(room_id);
        session.set_game_status(GameStatus::Gaming);
        self.clock.stop();
        self.outbox.navigate(Route::Game);
    }

    fn require_identity(&mut self, session: &mut SessionContext) -> Result<(), ClientError> {
        if session.account().is_some() {
            return Ok(());
        }
        self.outbox.notice(Notice::MissingIdentity);
        self.outbox.navigate(Route::Login);
        Err(ClientError::MissingIdentity)
    }
}
