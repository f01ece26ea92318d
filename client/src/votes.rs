//! Proposal/response/resolve flows for the two recovery votes.
//!
//! Sessions live in a registry keyed by [`VoteKind`]. Opening a session for a
//! kind always closes the previous one first, dismissing its prompt, so a
//! replaced proposal can never leave an orphaned prompt on screen.

use crate::ui::{Notice, Outbox, PromptId, UiEvent};
use log::{debug, info};
use shared::{ClientEvent, GameKindConfig, PlayerId, VoteKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePhase {
    ProposalReceived,
    AwaitingLocalDecision,
    ResponseSent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSession {
    pub kind: VoteKind,
    pub phase: VotePhase,
    pub initiator: Option<PlayerId>,
    prompt: Option<PromptId>,
}

impl VoteSession {
    pub fn prompt(&self) -> Option<PromptId> {
        self.prompt
    }
}

#[derive(Debug, Clone)]
pub struct VoteCoordinator {
    config: GameKindConfig,
    sessions: BTreeMap<VoteKind, VoteSession>,
}

impl VoteCoordinator {
    pub fn new(config: GameKindConfig) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
        }
    }

    pub fn session(&self, kind: VoteKind) -> Option<&VoteSession> {
        self.sessions.get(&kind)
    }

    pub fn is_open(&self, kind: VoteKind) -> bool {
        self.sessions.contains_key(&kind)
    }

    /// A proposal push. Our own proposal echoed back needs no prompt.
    pub fn on_proposal(
        &mut self,
        kind: VoteKind,
        initiator: Option<PlayerId>,
        local: &PlayerId,
        outbox: &mut Outbox,
    ) {
        if !self.config.enables(kind) {
            debug!("Ignoring {} proposal; disabled for this game kind", kind);
            return;
        }

        if initiator.as_ref() == Some(local) {
            if let Some(session) = self.sessions.get(&kind) {
                if session.phase == VotePhase::ResponseSent {
                    return;
                }
            }
            self.open(kind, VotePhase::ResponseSent, initiator, outbox);
            return;
        }

        info!("{} proposed by {:?}", kind, initiator.as_ref().map(PlayerId::as_str));
        self.open(kind, VotePhase::ProposalReceived, initiator, outbox);

        let prompt = outbox.next_prompt_id();
        if let Some(session) = self.sessions.get_mut(&kind) {
            session.prompt = Some(prompt);
            session.phase = VotePhase::AwaitingLocalDecision;
        }
        outbox.push(UiEvent::VotePrompt { kind, prompt });
    }

    /// Local initiation: equivalent to receiving our own proposal and approving it.
    pub fn propose(
        &mut self,
        kind: VoteKind,
        local: &PlayerId,
        outbox: &mut Outbox,
    ) -> Option<ClientEvent> {
        if !self.config.enables(kind) {
            return None;
        }

        self.open(kind, VotePhase::ResponseSent, Some(local.clone()), outbox);
        outbox.notice(Notice::VoteProposed(kind));
        Some(ClientEvent::Vote {
            kind,
            approve: true,
        })
    }

    /// The local user's single, final answer to an open prompt.
    pub fn respond(&mut self, kind: VoteKind, approve: bool) -> Option<ClientEvent> {
        let session = self.sessions.get_mut(&kind)?;
        if session.phase != VotePhase::AwaitingLocalDecision {
            return None;
        }

        session.phase = VotePhase::ResponseSent;
        session.prompt = None;
        Some(ClientEvent::Vote { kind, approve })
    }

    /// Terminal push from the server. Closes the session whether or not the
    /// local user answered. Returns whether a session was open.
    pub fn on_resolved(&mut self, kind: VoteKind, passed: bool, outbox: &mut Outbox) -> bool {
        let was_open = self.close(kind, outbox).is_some();
        info!("{} vote {}", kind, if passed { "passed" } else { "failed" });
        outbox.notice(if passed {
            Notice::VotePassed(kind)
        } else {
            Notice::VoteFailed(kind)
        });
        was_open
    }

    /// Closes every session the departing player started.
    pub fn on_player_left(&mut self, player: &PlayerId, outbox: &mut Outbox) {
        let started: Vec<VoteKind> = self
            .sessions
            .values()
            .filter(|s| s.initiator.as_ref() == Some(player))
            .map(|s| s.kind)
            .collect();

        for kind in started {
            info!("Closing {} vote; initiator {} left", kind, player);
            self.close(kind, outbox);
        }
    }

    pub fn close_all(&mut self, outbox: &mut Outbox) {
        for kind in VoteKind::ALL {
            self.close(kind, outbox);
        }
    }

    fn open(
        &mut self,
        kind: VoteKind,
        phase: VotePhase,
        initiator: Option<PlayerId>,
        outbox: &mut Outbox,
    ) {
        self.close(kind, outbox);
        self.sessions.insert(
            kind,
            VoteSession {
                kind,
                phase,
                initiator,
                prompt: None,
            },
        );
    }

    fn close(&mut self, kind: VoteKind, outbox: &mut Outbox) -> Option<VoteSession> {
        let session = self.sessions.remove(&kind)?;
        if let Some(prompt) = session.prompt {
            outbox.dismiss(prompt);
        }
        Some(session)
    }
}
