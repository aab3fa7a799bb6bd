use std::sync::Arc;

use log::{info, warn};
use review_core::model::{
    DeckId, ReviewOutcome, ReviewRecord, ReviewSession, SessionError, SessionSummary,
};

use super::progress::SessionProgress;
use crate::Clock;
use crate::error::CoordinatorError;
use crate::review_service::ReviewService;

/// Result of answering a single card in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    /// The card as stored after the answer.
    pub record: ReviewRecord,
    pub outcome: ReviewOutcome,
    pub progress: SessionProgress,
    /// Present once the last card is answered.
    pub summary: Option<SessionSummary>,
}

/// Drives a [`ReviewSession`] against the review store.
///
/// Exactly one store write happens per answered card, and the next card is
/// only presented once that write is confirmed. A failed write leaves the
/// session on the answered card so the caller can retry or abandon.
#[derive(Clone)]
pub struct ReviewCoordinator {
    clock: Clock,
    reviews: Arc<ReviewService>,
}

impl ReviewCoordinator {
    #[must_use]
    pub fn new(clock: Clock, reviews: Arc<ReviewService>) -> Self {
        Self { clock, reviews }
    }

    /// Load the deck's due set and present the first card.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Review` if the deck is unknown or the store
    /// cannot be read.
    pub async fn start_session(&self, deck_id: DeckId) -> Result<ReviewSession, CoordinatorError> {
        let mut session = ReviewSession::new(deck_id, self.clock.now());
        let due = self.reviews.due_records(deck_id, None).await?;
        info!(
            "session {} started on deck {deck_id} with {} due cards",
            session.id(),
            due.len()
        );
        session.load(due)?;
        if session.is_finished() {
            info!("session {}: nothing due", session.id());
        }
        Ok(session)
    }

    /// Turn the presented card over. Nothing is scheduled.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Session` if no card is being presented.
    pub fn reveal(&self, session: &mut ReviewSession) -> Result<ReviewRecord, CoordinatorError> {
        Ok(session.reveal()?.clone())
    }

    /// Record and commit the learner's answer for the revealed card.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Session` for out-of-order calls and
    /// `CoordinatorError::Review` if the commit fails; in that case the
    /// session stays on the answered card.
    pub async fn answer_current(
        &self,
        session: &mut ReviewSession,
        outcome: ReviewOutcome,
    ) -> Result<SessionAnswerResult, CoordinatorError> {
        session.choose(outcome)?;
        self.commit(session).await
    }

    /// Retry committing an answer whose earlier commit failed.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Session(NotAnswered)` if no answer is pending.
    pub async fn retry_pending(
        &self,
        session: &mut ReviewSession,
    ) -> Result<SessionAnswerResult, CoordinatorError> {
        self.commit(session).await
    }

    /// Stop the session. Cards not yet committed keep their schedules.
    pub fn abandon(&self, session: &mut ReviewSession) -> Option<SessionSummary> {
        let remaining = session.remaining();
        session.abandon(self.clock.now());
        if remaining > 0 {
            info!(
                "session {} abandoned with {remaining} cards left",
                session.id()
            );
        }
        session.summary()
    }

    #[must_use]
    pub fn progress(&self, session: &ReviewSession) -> SessionProgress {
        SessionProgress::of(session)
    }

    async fn commit(
        &self,
        session: &mut ReviewSession,
    ) -> Result<SessionAnswerResult, CoordinatorError> {
        let (id, outcome) = session
            .pending_answer()
            .map(|(card, outcome)| (card.id(), outcome))
            .ok_or(SessionError::NotAnswered)?;

        let record = match self.reviews.apply_outcome(id, outcome).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "session {}: answer for flashcard {id} not stored: {e}",
                    session.id()
                );
                return Err(e.into());
            }
        };
        session.acknowledge(&record, self.clock.now())?;

        let summary = session.summary();
        if let Some(summary) = &summary {
            info!(
                "session {} finished: {} correct, {} wrong",
                session.id(),
                summary.correct(),
                summary.wrong()
            );
        }

        Ok(SessionAnswerResult {
            record,
            outcome,
            progress: SessionProgress::of(session),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::model::{FlashcardContent, SessionPhase};
    use review_core::scheduler::Scheduler;
    use review_core::time::fixed_now;
    use storage::repository::{
        DeckRepository, InMemoryRepository, NewDeckRecord, NewReviewRecord,
        ReviewRecordRepository,
    };

    async fn setup(cards: usize) -> (ReviewCoordinator, InMemoryRepository, DeckId) {
        let repo = InMemoryRepository::new();
        let deck_id = repo
            .insert_new_deck(NewDeckRecord {
                name: "Spanish".into(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        for i in 0..cards {
            repo.insert_record(NewReviewRecord {
                deck_id,
                content: FlashcardContent::new(format!("palabra {i}"), format!("word {i}"), "")
                    .unwrap(),
                schedule: Scheduler::new().seed_schedule(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        }
        let clock = Clock::fixed(fixed_now());
        let reviews = ReviewService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
            .with_clock(clock);
        (
            ReviewCoordinator::new(clock, Arc::new(reviews)),
            repo,
            deck_id,
        )
    }

    #[tokio::test]
    async fn empty_deck_finishes_at_once() {
        let (coordinator, _repo, deck_id) = setup(0).await;
        let session = coordinator.start_session(deck_id).await.unwrap();
        assert!(session.is_finished());
        assert_eq!(session.summary().unwrap().total(), 0);
    }

    #[tokio::test]
    async fn answering_without_reveal_is_rejected() {
        let (coordinator, repo, deck_id) = setup(1).await;
        let mut session = coordinator.start_session(deck_id).await.unwrap();

        let err = coordinator
            .answer_current(&mut session, ReviewOutcome::Correct)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Session(SessionError::NotRevealed)
        ));
        let stored = repo.list_records(Some(deck_id)).await.unwrap();
        assert_eq!(stored[0].version(), 1);
    }

    #[tokio::test]
    async fn failed_commit_keeps_session_on_card() {
        let (coordinator, repo, deck_id) = setup(2).await;
        let mut session = coordinator.start_session(deck_id).await.unwrap();
        let card = coordinator.reveal(&mut session).unwrap();

        repo.delete_record(card.id()).await.unwrap();
        let err = coordinator
            .answer_current(&mut session, ReviewOutcome::Wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Review(e) if e.is_not_found()));
        assert_eq!(session.phase(), SessionPhase::Answered);
        assert_eq!(session.current().map(ReviewRecord::id), Some(card.id()));

        let summary = coordinator.abandon(&mut session).unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[tokio::test]
    async fn retry_pending_without_answer_is_rejected() {
        let (coordinator, _repo, deck_id) = setup(1).await;
        let mut session = coordinator.start_session(deck_id).await.unwrap();
        let err = coordinator.retry_pending(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Session(SessionError::NotAnswered)
        ));
    }

    #[tokio::test]
    async fn abandon_leaves_unanswered_cards_untouched() {
        let (coordinator, repo, deck_id) = setup(3).await;
        let before = repo.list_records(Some(deck_id)).await.unwrap();
        let mut session = coordinator.start_session(deck_id).await.unwrap();

        coordinator.reveal(&mut session).unwrap();
        coordinator
            .answer_current(&mut session, ReviewOutcome::Correct)
            .await
            .unwrap();
        coordinator.abandon(&mut session);

        let after = repo.list_records(Some(deck_id)).await.unwrap();
        assert_eq!(after[0].version(), 2);
        assert_eq!(after[1..], before[1..]);
        assert!(repo.get_deck(deck_id).await.unwrap().is_some());
    }
}
