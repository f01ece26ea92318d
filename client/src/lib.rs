//! # Gridfall client
//!
//! Client side of a turn-based grid game played against an authoritative
//! server over a named-event WebSocket bus.
//!
//! The interesting part is the reconciliation core: the client mirrors what
//! the server pushes, derives the moves the local player may make, applies
//! its own move optimistically until the server confirms or rejects it, and
//! takes part in the two recovery votes that let a room route around a
//! stalled player.
//!
//! ## Module Organization
//!
//! ### Core
//! - `board`: mirror of the board, round counter, statuses and profiles
//! - `moves`: legal destinations and the optimistic move state machine
//! - `votes`: advance-round and restart vote sessions
//! - `game`: the lifecycle controller that owns the three above
//! - `lobby`: matching, custom rooms and invite links
//!
//! ### Plumbing
//! - `transport`: fire-and-forget emit plus the subscription registry
//! - `network`: the WebSocket connection task
//! - `session`: key/value session context with optional file backing
//! - `clock`: the one-second wait clock shown while matching
//! - `ui`: what the core tells the presentation layer
//! - `console`, `app`: a line-oriented presentation and its dispatch loop
//!
//! ## Usage Example
//!
//! ```rust
//! use client::game::GameController;
//! use client::session::SessionContext;
//! use client::transport::Recorder;
//! use shared::{GameKind, ServerEvent};
//!
//! let recorder = Recorder::new();
//! let mut session = SessionContext::in_memory();
//! session.set_room_id("room-1");
//!
//! let mut game = GameController::new("me".into(), Some(GameKind::S4p2), recorder.clone());
//! game.join_room(&mut session).unwrap();
//! game.handle(ServerEvent::MoveClashed, &mut session);
//!
//! assert_eq!(recorder.sent().len(), 1);
//! ```

pub mod app;
pub mod board;
pub mod clock;
pub mod console;
pub mod error;
pub mod game;
pub mod lobby;
pub mod moves;
pub mod network;
pub mod session;
pub mod transport;
pub mod ui;
pub mod votes;

pub use error::ClientError;
