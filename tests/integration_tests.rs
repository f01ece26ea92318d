//! Integration tests for the client core
//!
//! These tests drive the public API the way the dispatch loop does and check
//! what reaches the wire, plus one real WebSocket round trip.

use client::game::GameController;
use client::moves::MovePhase;
use client::session::SessionContext;
use client::transport::Recorder;
use client::ui::{Notice, Resolution, Route, UiEvent};
use serde_json::{json, Value};
use shared::{
    ClientEvent, Envelope, GameKind, GameOutcome, GameStatus, MoveIntent, Position, ServerEvent,
    VoteKind,
};

fn push(
    game: &mut GameController<Recorder>,
    session: &mut SessionContext,
    event: &str,
    data: Value,
) {
    let decoded = ServerEvent::decode(&Envelope::new(event, data))
        .expect("valid payload")
        .expect("known event");
    game.handle(decoded, session);
}

fn in_room() -> (GameController<Recorder>, Recorder, SessionContext) {
    let recorder = Recorder::new();
    let mut session = SessionContext::in_memory();
    session.set_room_id("room-42");
    session.set_game_kind(GameKind::S4p2);
    session.set_game_status(GameStatus::Gaming);

    let mut game = GameController::new("p1".into(), Some(GameKind::S4p2), recorder.clone());
    game.join_room(&mut session).unwrap();
    (game, recorder, session)
}

/// 9x9 board, empty except (0,0) holding the local player
fn corner_board() -> Value {
    let mut rows = vec![vec![json!(0); 9]; 9];
    rows[0][0] = json!("p1");
    json!(rows)
}

/// SCENARIOS FROM THE GAME RULES
mod scenario_tests {
    use super::*;

    #[test]
    fn placed_player_moves_to_neighbor() {
        let (mut game, recorder, mut session) = in_room();
        assert_eq!(
            recorder.take(),
            vec![ClientEvent::JoinGameRoom {
                room_id: "room-42".into()
            }]
        );

        push(
            &mut game,
            &mut session,
            "sync players status",
            json!({ "playersStatusMap": { "p1": { "online": true, "move": false } } }),
        );
        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": corner_board(), "currentStepNum": 4 }),
        );

        let mut legal = game.legal_destinations();
        legal.sort();
        assert_eq!(legal, vec![Position::new(0, 1), Position::new(1, 0)]);

        assert!(!game.select(Position::new(5, 5)), "not adjacent");
        assert!(game.select(Position::new(1, 0)));
        assert!(game.submit());

        let sent = recorder.take();
        assert_eq!(
            sent,
            vec![ClientEvent::SubmitMove(MoveIntent::Relocate {
                origin: Some(Position::new(0, 0)),
                destination: Position::new(1, 0),
                round: 4
            })]
        );
        assert_eq!(
            sent[0].to_envelope().data,
            json!({ "oldPos": { "x": 0, "y": 0 }, "newPos": { "x": 1, "y": 0 }, "stepNum": 4 })
        );
        assert!(game.legal_destinations().is_empty());
    }

    #[test]
    fn unplaced_player_may_use_any_empty_cell() {
        let (mut game, recorder, mut session) = in_room();
        recorder.take();
        let mut rows = vec![vec![json!(0); 9]; 9];
        rows[0][0] = json!("p2");
        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": rows, "currentStepNum": 1 }),
        );

        let legal = game.legal_destinations();
        assert_eq!(legal.len(), 80);
        assert!(!legal.contains(&Position::new(0, 0)));

        assert!(game.select(Position::new(5, 5)));
        assert_eq!(game.moves().pending(), Some(Position::new(5, 5)));
        assert!(game.submit());
        assert_eq!(
            recorder.take()[0].to_envelope().data,
            json!({ "newPos": { "x": 5, "y": 5 }, "stepNum": 1 })
        );
    }

    #[test]
    fn clash_rolls_back_and_allows_reselect() {
        let (mut game, _recorder, mut session) = in_room();
        push(
            &mut game,
            &mut session,
            "sync players status",
            json!({ "playersStatusMap": { "p1": { "online": true, "move": false } } }),
        );
        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": corner_board(), "currentStepNum": 2 }),
        );
        game.select(Position::new(0, 1));
        game.submit();

        push(&mut game, &mut session, "clashed moving", Value::Null);

        assert_eq!(game.moves().phase(), &MovePhase::Rejected);
        assert_eq!(game.moves().pending(), None);
        assert!(!game.local_has_moved());
        assert!(game.select(Position::new(0, 1)));
        assert_eq!(game.drain_ui(), vec![UiEvent::Notice(Notice::MoveClashed)]);
    }

    #[test]
    fn new_round_clears_pending_and_moved_flag() {
        let (mut game, _recorder, mut session) = in_room();
        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": corner_board(), "currentStepNum": 1 }),
        );
        game.select(Position::new(1, 0));
        game.submit();
        push(&mut game, &mut session, "other player move", json!({ "playerId": "p1" }));
        assert!(!game.turn_open());

        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": corner_board(), "currentStepNum": 2 }),
        );
        assert_eq!(game.moves().pending(), None);
        assert!(!game.local_has_moved());
        assert!(game.turn_open());
    }

    #[test]
    fn draw_freezes_and_offers_two_choices() {
        let (mut game, _recorder, mut session) = in_room();
        push(
            &mut game,
            &mut session,
            "sync board",
            json!({ "boardGrids": corner_board(), "currentStepNum": 9 }),
        );
        push(
            &mut game,
            &mut session,
            "game over",
            json!({ "result": "draw", "winner": "p1" }),
        );

        assert_eq!(game.outcome(), &GameOutcome::Draw);
        assert!(!game.turn_open());
        match game.drain_ui().as_slice() {
            [UiEvent::GameOverPrompt {
                outcome,
                local_won,
                options,
                ..
            }] => {
                assert_eq!(outcome, &GameOutcome::Draw);
                assert!(!local_won);
                assert_eq!(*options, [Resolution::ReturnToLobby, Resolution::VoteRestart]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

/// VOTING AND LIFECYCLE
mod lifecycle_tests {
    use super::*;

    #[test]
    fn resolve_closes_unanswered_vote() {
        let (mut game, recorder, mut session) = in_room();
        recorder.take();
        push(
            &mut game,
            &mut session,
            "vote next step call",
            json!({ "playerId": "p2" }),
        );
        assert!(game.votes().is_open(VoteKind::AdvanceRound));

        push(&mut game, &mut session, "vote next step success", Value::Null);
        assert!(!game.votes().is_open(VoteKind::AdvanceRound));
        assert!(!game.respond_vote(VoteKind::AdvanceRound, true));
        assert!(recorder.sent().is_empty());

        let ui = game.drain_ui();
        assert!(matches!(ui.first(), Some(UiEvent::VotePrompt { .. })));
        assert!(matches!(ui.get(1), Some(UiEvent::DismissPrompt(_))));
    }

    #[test]
    fn quitting_twice_sends_one_quit() {
        let (mut game, recorder, mut session) = in_room();
        recorder.take();

        game.quit(&mut session);
        game.quit(&mut session);

        assert_eq!(recorder.sent(), vec![ClientEvent::QuitGame]);
        assert_eq!(session.room_id(), None);
        assert_eq!(session.game_kind(), None);
        assert_eq!(session.game_status(), None);
    }

    #[test]
    fn eviction_skips_voting() {
        let (mut game, recorder, mut session) = in_room();
        recorder.take();
        push(
            &mut game,
            &mut session,
            "vote restart call",
            json!({ "playerId": "p3" }),
        );

        push(&mut game, &mut session, "game over cause miss step", Value::Null);

        assert_eq!(recorder.sent(), vec![ClientEvent::QuitGame]);
        assert!(!game.votes().is_open(VoteKind::RestartGame));
        assert_eq!(game.drain_ui().last(), Some(&UiEvent::Navigate(Route::Lobby)));
    }

    #[test]
    fn missing_room_context_never_reaches_transport() {
        let recorder = Recorder::new();
        let mut session = SessionContext::in_memory();
        let mut game = GameController::new("p1".into(), None, recorder.clone());

        assert!(game.join_room(&mut session).is_err());
        assert!(recorder.sent().is_empty());
        assert_eq!(game.drain_ui().last(), Some(&UiEvent::Navigate(Route::Lobby)));
    }
}

/// LOBBY TO GAME HANDOFF
mod lobby_tests {
    use super::*;
    use client::lobby::Lobby;
    use client::session::keys;
    use shared::PlayerProfile;

    #[test]
    fn match_success_feeds_the_controller() {
        tokio_test::block_on(async {
            let recorder = Recorder::new();
            let mut session = SessionContext::in_memory();
            session.set(keys::ACCOUNT, &PlayerProfile::new("p1", "One"));

            let mut lobby = Lobby::new(recorder.clone());
            lobby.match_game(GameKind::S4p2, &mut session).unwrap();
            assert!(lobby.is_matching());

            lobby.handle(
                ServerEvent::MatchSucceeded {
                    room_id: "m-7".into(),
                },
                &mut session,
            );
            assert!(!lobby.is_matching());
            assert_eq!(lobby.drain_ui(), vec![UiEvent::Navigate(Route::Game)]);

            let mut game =
                GameController::new("p1".into(), session.game_kind(), recorder.clone());
            game.join_room(&mut session).unwrap();

            assert_eq!(
                recorder.take(),
                vec![
                    ClientEvent::MatchGame {
                        kind: GameKind::S4p2
                    },
                    ClientEvent::JoinGameRoom {
                        room_id: "m-7".into()
                    }
                ]
            );
            assert_eq!(game.store().board().size_x(), 9);
        });
    }
}

/// REAL SOCKET TESTS
mod websocket_tests {
    use super::*;
    use client::network::{self, ConnectionConfig, ConnectionEvent};
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;

    #[tokio::test]
    async fn envelopes_cross_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                json!({ "event": "sync board", "data": { "boardGrids": [[0]], "currentStepNum": 1 } })
                    .to_string(),
            ))
            .await
            .unwrap();

            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return text,
                    Some(Ok(_)) => continue,
                    other => panic!("socket ended: {:?}", other),
                }
            }
        });

        let config = ConnectionConfig::new(
            &format!("ws://{}", addr),
            Some("tok"),
            Duration::from_millis(50),
        )
        .unwrap();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let handle = network::spawn(config, in_tx, out_rx);

        let first = timeout(Duration::from_secs(5), in_rx.recv()).await.unwrap();
        assert_eq!(first, Some(ConnectionEvent::Connected));

        let second = timeout(Duration::from_secs(5), in_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match second {
            ConnectionEvent::Message(envelope) => {
                assert_eq!(envelope.event, "sync board");
                let event = ServerEvent::decode(&envelope).unwrap();
                assert!(matches!(event, Some(ServerEvent::SyncBoard { round: 1, .. })));
            }
            other => panic!("unexpected {:?}", other),
        }

        out_tx
            .send(
                ClientEvent::JoinGameRoom {
                    room_id: "r1".into(),
                }
                .to_envelope(),
            )
            .unwrap();

        let received = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        let envelope = Envelope::from_json(&received).unwrap();
        assert_eq!(envelope.event, "join game room");
        assert_eq!(envelope.data, json!({ "gameRoomId": "r1" }));

        handle.abort();
    }
}
