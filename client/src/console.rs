//! Line-oriented stand-in for a real presentation layer.
//!
//! Reads one command per stdin line and prints the board. It only forwards
//! intents; every rule lives in the core.

use crate::ui::{GameView, Resolution, UiEvent};
use shared::{BoardCell, GameKind, GameOutcome, Position, VoteKind};
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const HELP: &str = "\
commands:
  select <x> <y>         pick a destination
  submit                 send the picked move
  advance | restart      propose a vote
  yes <kind> | no <kind> answer a vote (kind: advance, restart)
  start                  start a custom game (room owner)
  quit                   leave the room
  lobby                  return to the lobby after game over
  match <kind>           find a game (s4p2, s4p4, s4p8)
  cancel                 stop matching
  custom <kind>          create a room (s4g9, s4g15, s4g21)
  door <room>            open an invite
  logout | board | help | exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Select(Position),
    Submit,
    Propose(VoteKind),
    Respond { kind: VoteKind, approve: bool },
    Start,
    Quit,
    Resolve(Resolution),
    Match(GameKind),
    Cancel,
    Custom(GameKind),
    Door(String),
    Logout,
    Board,
    Help,
    Exit,
}

fn vote_kind(word: &str) -> Result<VoteKind, String> {
    match word {
        "advance" | "next" => Ok(VoteKind::AdvanceRound),
        "restart" => Ok(VoteKind::RestartGame),
        other => Err(format!("unknown vote `{}`", other)),
    }
}

fn game_kind(word: Option<&str>) -> Result<GameKind, String> {
    let word = word.ok_or("missing game kind")?;
    word.parse().map_err(|_| format!("unknown game kind `{}`", word))
}

impl Intent {
    pub fn parse(line: &str) -> Result<Option<Intent>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };

        let intent = match command {
            "select" | "s" => {
                let mut coord = || -> Result<i32, String> {
                    let raw = words.next().ok_or("usage: select <x> <y>")?;
                    raw.parse().map_err(|_| format!("bad coordinate `{}`", raw))
                };
                let x = coord()?;
                let y = coord()?;
                Intent::Select(Position::new(x, y))
            }
            "submit" | "go" => Intent::Submit,
            "advance" => Intent::Propose(VoteKind::AdvanceRound),
            "restart" => Intent::Propose(VoteKind::RestartGame),
            "yes" | "no" => {
                let kind = vote_kind(words.next().ok_or("usage: yes|no <kind>")?)?;
                Intent::Respond {
                    kind,
                    approve: command == "yes",
                }
            }
            "start" => Intent::Start,
            "quit" => Intent::Quit,
            "lobby" => Intent::Resolve(Resolution::ReturnToLobby),
            "match" => Intent::Match(game_kind(words.next())?),
            "cancel" => Intent::Cancel,
            "custom" => Intent::Custom(game_kind(words.next())?),
            "door" => Intent::Door(words.next().ok_or("usage: door <room>")?.to_string()),
            "logout" => Intent::Logout,
            "board" | "b" => Intent::Board,
            "help" | "?" => Intent::Help,
            "exit" => Intent::Exit,
            other => return Err(format!("unknown command `{}`", other)),
        };
        Ok(Some(intent))
    }
}

/// Forwards parsed stdin lines until EOF, then sends [`Intent::Exit`].
pub fn spawn_reader(intents: mpsc::UnboundedSender<Intent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match Intent::parse(&line) {
                Ok(Some(intent)) => {
                    if intents.send(intent).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(msg) => println!("{}", msg),
            }
        }
        let _ = intents.send(Intent::Exit);
    })
}

/// `.` empty, `#` blocked, `@` us, `o` others, `*` legal, `+` pending.
pub fn render_board(view: &GameView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "round {}", view.round);

    for (y, row) in view.board.rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            let glyph = if view.pending == Some(pos) {
                '+'
            } else {
                match cell {
                    BoardCell::Blocked => '#',
                    BoardCell::OccupiedBy(id) if *id == view.local => '@',
                    BoardCell::OccupiedBy(_) => 'o',
                    BoardCell::Empty if view.legal.contains(&pos) => '*',
                    BoardCell::Empty => '.',
                }
            };
            out.push(glyph);
        }
        out.push('\n');
    }

    for player in &view.players {
        let _ = writeln!(
            out,
            "{}{} {}{}",
            if player.id == view.local { "> " } else { "  " },
            player.name,
            if player.online { "online" } else { "offline" },
            if player.has_moved { ", moved" } else { "" },
        );
    }

    match &view.outcome {
        GameOutcome::InProgress => {}
        GameOutcome::Draw => out.push_str("game over: draw\n"),
        GameOutcome::Decided { winner } => {
            let winner = winner.as_ref().map(|w| w.as_str()).unwrap_or("nobody");
            let _ = writeln!(out, "game over: {} won", winner);
        }
    }
    out
}

pub fn describe(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::Notice(notice) => Some(format!("! {}", notice)),
        UiEvent::VotePrompt { kind, .. } => Some(format!(
            "? Vote to {}: answer `yes {}` or `no {}`",
            kind,
            vote_word(*kind),
            vote_word(*kind)
        )),
        UiEvent::DismissPrompt(_) => None,
        UiEvent::GameOverPrompt {
            outcome, local_won, ..
        } => {
            let headline = match outcome {
                GameOutcome::Draw => "Draw.",
                _ if *local_won => "You won!",
                _ => "You lost.",
            };
            Some(format!("{} Type `lobby` or `restart`.", headline))
        }
        UiEvent::Navigate(_) => None,
    }
}

fn vote_word(kind: VoteKind) -> &'static str {
    match kind {
        VoteKind::AdvanceRound => "advance",
        VoteKind::RestartGame => "restart",
    }
}
