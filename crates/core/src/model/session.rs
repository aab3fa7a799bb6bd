use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{DeckId, FlashcardId, ReviewOutcome, ReviewRecord};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already loaded its due cards")]
    AlreadyLoaded,

    #[error("no card is being presented")]
    NoCardPresented,

    #[error("card must be revealed before answering")]
    NotRevealed,

    #[error("no answer is waiting to be committed")]
    NotAnswered,

    #[error("session is finished")]
    Finished,

    #[error("acknowledged card {got} but {expected} was answered")]
    CardMismatch {
        expected: FlashcardId,
        got: FlashcardId,
    },
}

//
// ─── IDS & STATES ──────────────────────────────────────────────────────────────
//

/// Random identifier used to correlate the log lines of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Phase tag recorded in the transition history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Loading,
    Presenting,
    Answered,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Presenting {
        card: ReviewRecord,
        revealed: bool,
    },
    /// The learner picked an outcome that has not been committed yet.
    Answered {
        card: ReviewRecord,
        outcome: ReviewOutcome,
    },
    Finished,
}

impl SessionState {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Loading => SessionPhase::Loading,
            SessionState::Presenting { .. } => SessionPhase::Presenting,
            SessionState::Answered { .. } => SessionPhase::Answered,
            SessionState::Finished => SessionPhase::Finished,
        }
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// End-of-session tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    deck_id: DeckId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    correct: u32,
    wrong: u32,
}

impl SessionSummary {
    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct.saturating_add(self.wrong)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One pass over a deck's due set.
///
/// `Loading -> Presenting -> Answered -> Presenting ... -> Finished`. The
/// session never writes anything itself: the caller commits the answered
/// outcome and hands the stored record back through [`Self::acknowledge`].
#[derive(Debug, Clone)]
pub struct ReviewSession {
    id: SessionId,
    deck_id: DeckId,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    state: SessionState,
    queue: VecDeque<ReviewRecord>,
    history: Vec<SessionPhase>,
    total: usize,
    correct: u32,
    wrong: u32,
}

impl ReviewSession {
    #[must_use]
    pub fn new(deck_id: DeckId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            deck_id,
            started_at,
            completed_at: None,
            state: SessionState::Loading,
            queue: VecDeque::new(),
            history: vec![SessionPhase::Loading],
            total: 0,
            correct: 0,
            wrong: 0,
        }
    }

    /// Take the due set, already in presentation order.
    ///
    /// An empty due set finishes the session immediately.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyLoaded` unless the session is `Loading`.
    pub fn load(&mut self, due: Vec<ReviewRecord>) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Loading) {
            return Err(SessionError::AlreadyLoaded);
        }
        self.total = due.len();
        self.queue = due.into();
        let started_at = self.started_at;
        self.advance(started_at);
        Ok(())
    }

    /// Show the answer side of the presented card.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` or `SessionError::NoCardPresented`
    /// when nothing is being presented.
    pub fn reveal(&mut self) -> Result<&ReviewRecord, SessionError> {
        match &mut self.state {
            SessionState::Presenting { card, revealed } => {
                *revealed = true;
                Ok(&*card)
            }
            SessionState::Finished => Err(SessionError::Finished),
            _ => Err(SessionError::NoCardPresented),
        }
    }

    /// Record the learner's answer for the revealed card.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRevealed` if the card is still hidden,
    /// `SessionError::Finished` after the last card.
    pub fn choose(&mut self, outcome: ReviewOutcome) -> Result<(), SessionError> {
        match &self.state {
            SessionState::Presenting { revealed: false, .. } => Err(SessionError::NotRevealed),
            SessionState::Presenting { card, .. } => {
                let card = card.clone();
                self.enter(SessionState::Answered { card, outcome });
                Ok(())
            }
            SessionState::Finished => Err(SessionError::Finished),
            _ => Err(SessionError::NoCardPresented),
        }
    }

    /// The answer waiting to be committed, if any.
    #[must_use]
    pub fn pending_answer(&self) -> Option<(&ReviewRecord, ReviewOutcome)> {
        match &self.state {
            SessionState::Answered { card, outcome } => Some((card, *outcome)),
            _ => None,
        }
    }

    /// Confirm the answered card was stored as `updated` and move on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` outside `Answered`, or
    /// `SessionError::CardMismatch` if `updated` is a different card.
    pub fn acknowledge(
        &mut self,
        updated: &ReviewRecord,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let outcome = match &self.state {
            SessionState::Answered { card, outcome } => {
                if card.id() != updated.id() {
                    return Err(SessionError::CardMismatch {
                        expected: card.id(),
                        got: updated.id(),
                    });
                }
                *outcome
            }
            SessionState::Finished => return Err(SessionError::Finished),
            _ => return Err(SessionError::NotAnswered),
        };

        match outcome {
            ReviewOutcome::Correct => self.correct = self.correct.saturating_add(1),
            ReviewOutcome::Wrong => self.wrong = self.wrong.saturating_add(1),
        }
        self.advance(at);
        Ok(())
    }

    /// Stop early. Uncommitted answers are dropped; no record is touched.
    pub fn abandon(&mut self, at: DateTime<Utc>) {
        if self.is_finished() {
            return;
        }
        self.queue.clear();
        self.finish(at);
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn history(&self) -> &[SessionPhase] {
        &self.history
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished)
    }

    /// The card on screen, answered or not.
    #[must_use]
    pub fn current(&self) -> Option<&ReviewRecord> {
        match &self.state {
            SessionState::Presenting { card, .. } | SessionState::Answered { card, .. } => {
                Some(card)
            }
            _ => None,
        }
    }

    /// Number of cards in the due set when the session loaded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Cards whose answers have been committed.
    #[must_use]
    pub fn answered(&self) -> usize {
        (self.correct + self.wrong) as usize
    }

    /// Cards still to be committed, including the one on screen.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.current().is_some())
    }

    /// Tally for a finished session; `None` while it is still running.
    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        let completed_at = self.completed_at?;
        Some(SessionSummary {
            deck_id: self.deck_id,
            started_at: self.started_at,
            completed_at,
            correct: self.correct,
            wrong: self.wrong,
        })
    }

    fn advance(&mut self, at: DateTime<Utc>) {
        match self.queue.pop_front() {
            Some(card) => self.enter(SessionState::Presenting {
                card,
                revealed: false,
            }),
            None => self.finish(at),
        }
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at.max(self.started_at));
        self.enter(SessionState::Finished);
    }

    fn enter(&mut self, state: SessionState) {
        self.history.push(state.phase());
        self.state = state;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
