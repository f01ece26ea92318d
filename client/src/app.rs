//! Dispatch loop tying the connection, the core and the console together.
//!
//! Every inbound envelope and every console intent is handled to completion
//! before the next one is taken, so core handlers never overlap.

use crate::console::{self, Intent};
use crate::game::GameController;
use crate::lobby::Lobby;
use crate::network::ConnectionEvent;
use crate::session::SessionContext;
use crate::transport::{EventChannel, Listener};
use crate::ui::{Notice, Resolution, Route, UiEvent};
use log::{debug, info, warn};
use shared::{Envelope, ServerEvent, VoteKind};
use tokio::sync::mpsc;

pub struct App {
    session: SessionContext,
    channel: EventChannel,
    lobby: Lobby<EventChannel>,
    game: Option<GameController<EventChannel>>,
    route: Route,
    /// Set after a disconnect; the next `Connected` is a reconnect.
    needs_resync: bool,
}

impl App {
    pub fn new(session: SessionContext, channel: EventChannel) -> Self {
        let mut lobby = Lobby::new(channel.clone());
        lobby.attach(&channel);
        Self {
            session,
            channel,
            lobby,
            game: None,
            route: Route::Lobby,
            needs_resync: false,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn game(&self) -> Option<&GameController<EventChannel>> {
        self.game.as_ref()
    }

    pub fn session(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub async fn run(
        mut self,
        mut connection: mpsc::UnboundedReceiver<ConnectionEvent>,
        mut intents: mpsc::UnboundedReceiver<Intent>,
    ) {
        self.lobby.resume(&mut self.session);
        self.flush();

        loop {
            tokio::select! {
                event = connection.recv() => match event {
                    Some(event) => self.on_connection(event),
                    None => {
                        warn!("Connection task ended");
                        break;
                    }
                },
                intent = intents.recv() => match intent {
                    Some(Intent::Exit) | None => break,
                    Some(intent) => self.on_intent(intent),
                },
            }
            self.flush();
        }

        info!("Exiting");
    }

    pub fn on_connection(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                info!("Connected");
                if !self.needs_resync {
                    return;
                }
                self.needs_resync = false;
                println!("{}", Notice::Reconnected);

                self.lobby.attach(&self.channel);
                if let Some(game) = self.game.as_mut() {
                    if let Err(e) = game.on_reconnect(&self.channel, &mut self.session) {
                        warn!("Rejoin failed: {}", e);
                    }
                }
            }
            ConnectionEvent::Disconnected { reason } => {
                debug!("Disconnect reason: {}", reason);
                if !self.needs_resync {
                    println!("{}", Notice::Disconnected);
                }
                self.needs_resync = true;
                self.lobby.on_disconnect(&mut self.session);
            }
            ConnectionEvent::Message(envelope) => self.dispatch(envelope),
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let listeners = self.channel.listeners_for(&envelope.event);
        if listeners.is_empty() {
            debug!("No listener for `{}`", envelope.event);
            return;
        }

        let event = match ServerEvent::decode(&envelope) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                match self.game.as_mut() {
                    Some(game) if listeners.contains(&Listener::Game) => game.report_fault(&e),
                    _ => warn!("Dropping malformed `{}`: {}", envelope.event, e),
                }
                return;
            }
        };

        let redraw = matches!(event, ServerEvent::SyncBoard { .. });
        for listener in listeners {
            match listener {
                Listener::Lobby => self.lobby.handle(event.clone(), &mut self.session),
                Listener::Game => {
                    if let Some(game) = self.game.as_mut() {
                        game.handle(event.clone(), &mut self.session);
                    }
                }
            }
        }
        if redraw {
            self.print_board();
        }
    }

    pub fn on_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Match(kind) => {
                if let Err(e) = self.lobby.match_game(kind, &mut self.session) {
                    debug!("Match refused: {}", e);
                }
            }
            Intent::Cancel => self.lobby.cancel_match(&mut self.session),
            Intent::Custom(kind) => {
                if let Err(e) = self.lobby.create_custom_game(kind, &mut self.session) {
                    debug!("Custom game refused: {}", e);
                }
            }
            Intent::Door(room_id) => self.lobby.open_door(&room_id),
            Intent::Logout => {
                if let Some(mut game) = self.game.take() {
                    game.quit(&mut self.session);
                }
                self.lobby.logout(&mut self.session);
            }
            Intent::Board => self.print_board(),
            Intent::Help => println!("{}", console::HELP),
            Intent::Exit => {}
            game_intent => self.on_game_intent(game_intent),
        }
    }

    fn on_game_intent(&mut self, intent: Intent) {
        let Some(game) = self.game.as_mut() else {
            println!("Not in a game.");
            return;
        };

        let accepted = match intent {
            Intent::Select(pos) => game.select(pos),
            Intent::Submit => game.submit(),
            Intent::Propose(VoteKind::AdvanceRound) => game.propose_advance_round(),
            Intent::Propose(VoteKind::RestartGame) if game.outcome().is_terminal() => {
                game.resolve_game_over(Resolution::VoteRestart, &mut self.session)
            }
            Intent::Propose(VoteKind::RestartGame) => game.propose_restart(),
            Intent::Respond { kind, approve } => game.respond_vote(kind, approve),
            Intent::Start => game.start_custom_game(&mut self.session),
            Intent::Quit => {
                game.quit(&mut self.session);
                true
            }
            Intent::Resolve(resolution) => game.resolve_game_over(resolution, &mut self.session),
            _ => true,
        };

        if !accepted {
            println!("Not available right now.");
        } else if self.route == Route::Game {
            self.print_board();
        }
    }

    /// Drains both outboxes until neither has anything left, acting on navigation.
    fn flush(&mut self) {
        loop {
            let mut events = self.lobby.drain_ui();
            if let Some(game) = self.game.as_mut() {
                events.extend(game.drain_ui());
            }
            if events.is_empty() {
                break;
            }

            for event in events {
                match event {
                    UiEvent::Navigate(route) => self.navigate(route),
                    other => {
                        if let Some(text) = console::describe(&other) {
                            println!("{}", text);
                        }
                    }
                }
            }
        }
    }

    fn navigate(&mut self, route: Route) {
        debug!("Navigate to {:?}", route);
        match route {
            Route::Game => self.enter_game(),
            Route::Lobby => {
                self.game = None;
                self.route = Route::Lobby;
                println!("-- lobby -- (type `help`)");
            }
            Route::Login => {
                self.game = None;
                self.route = Route::Login;
                println!("Login required: restart with --account-id and --token.");
            }
        }
    }

    fn enter_game(&mut self) {
        let room_id = self.session.room_id();
        if let Some(game) = self.game.as_ref() {
            if !game.has_left() && game.room_id() == room_id.as_deref() {
                return;
            }
        }
        let Some(account) = self.session.account() else {
            println!("{}", Notice::MissingIdentity);
            self.route = Route::Login;
            return;
        };

        let kind = self.session.game_kind();
        let mut game = GameController::new(account.id, kind, self.channel.clone());
        game.attach(&self.channel);
        self.route = Route::Game;
        if game.join_room(&mut self.session).is_ok() {
            println!("-- game{} --", kind.map(|k| format!(" {}", k)).unwrap_or_default());
        }
        // A failed join leaves a lobby navigation in the game's outbox
        self.game = Some(game);
    }

    fn print_board(&self) {
        match self.game.as_ref() {
            Some(game) if self.route == Route::Game => {
                print!("{}", console::render_board(&game.view()))
            }
            _ if self.lobby.is_matching() => {
                println!("Matching... {}s", self.lobby.waited_seconds())
            }
            _ => println!("In the lobby."),
        }
    }
}
