use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info};

use review_core::{
    model::{DeckId, FlashcardId, ReviewOutcome, ReviewRecord},
    scheduler::Scheduler,
    time::Clock,
};
use storage::repository::{DeckRepository, DueQuery, ReviewRecordRepository, StorageError};

use crate::error::ReviewServiceError;
use crate::retry::{Attempt, RetryPolicy};

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies review outcomes to stored records and selects due sets.
///
/// Every outcome is a read-modify-write guarded by the record's version:
/// a writer that loses the race re-reads and re-applies its outcome to the
/// fresh state, so concurrent answers are serialized and none is lost.
#[derive(Clone)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
    retry: RetryPolicy,
    decks: Arc<dyn DeckRepository>,
    records: Arc<dyn ReviewRecordRepository>,
}

impl ReviewService {
    #[must_use]
    pub fn new(
        decks: Arc<dyn DeckRepository>,
        records: Arc<dyn ReviewRecordRepository>,
    ) -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::default(),
            retry: RetryPolicy::default(),
            decks,
            records,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Apply one outcome to the record with the given id and store it.
    ///
    /// Not idempotent: calling this twice records two reviews.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardNotFound` for an unknown id, and `Unavailable` when
    /// the store keeps failing, timing out, or conflicting after every retry.
    pub async fn apply_outcome(
        &self,
        id: FlashcardId,
        outcome: ReviewOutcome,
    ) -> Result<ReviewRecord, ReviewServiceError> {
        let in_flight = InFlight::default();
        let label = format!("{outcome} on flashcard {id}");
        let (slot, tag) = (&in_flight, label.as_str());

        let stored = self
            .retry
            .run(tag, move |_| async move {
                let current = self
                    .retry
                    .guard(self.records.get_record(id))
                    .await
                    .map_err(|e| not_found_as(e, ReviewServiceError::FlashcardNotFound(id)))?;

                if slot.landed(&current) {
                    debug!("{tag}: timed-out write had been stored");
                    return Ok(current);
                }

                let next = self
                    .scheduler
                    .apply_outcome(&current, outcome, self.clock.now());
                let result = self.retry.guard(self.records.put_record(&next)).await;
                if matches!(
                    result,
                    Err(Attempt::Retry(_) | Attempt::Storage(StorageError::Connection(_)))
                ) {
                    slot.remember(next);
                }
                result.map_err(|e| not_found_as(e, ReviewServiceError::FlashcardNotFound(id)))
            })
            .await?;

        info!(
            "{label}: next review at {}",
            stored
                .next_review_at()
                .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
        );
        Ok(stored)
    }

    /// Records of a deck that are due now, in presentation order.
    ///
    /// An empty result means the deck has nothing left to review.
    ///
    /// # Errors
    ///
    /// Returns `DeckNotFound` for an unknown deck, `Validation` for a zero
    /// limit, and `Unavailable` if the store cannot be read.
    pub async fn due_records(
        &self,
        deck_id: DeckId,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        self.due_set(Some(deck_id), limit).await
    }

    /// Records due now across every deck, in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero limit and `Unavailable` if the store
    /// cannot be read.
    pub async fn due_records_all(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        self.due_set(None, limit).await
    }

    async fn due_set(
        &self,
        deck_id: Option<DeckId>,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        if limit == Some(0) {
            return Err(ReviewServiceError::Validation(
                "limit must be at least 1".into(),
            ));
        }
        let now = self.clock.now();
        let query = DueQuery { deck_id, limit };
        let label = deck_id.map_or_else(
            || "due set of all decks".to_string(),
            |id| format!("due set of deck {id}"),
        );
        let query = &query;

        self.retry
            .run(&label, move |_| async move {
                if let Some(deck_id) = deck_id {
                    let deck = self.retry.guard(self.decks.get_deck(deck_id)).await?;
                    if deck.is_none() {
                        return Err(Attempt::Fail(ReviewServiceError::DeckNotFound(deck_id)));
                    }
                }
                self.retry
                    .guard(self.records.query_due(query, now))
                    .await
            })
            .await
    }
}

fn not_found_as(attempt: Attempt, err: ReviewServiceError) -> Attempt {
    match attempt {
        Attempt::Storage(StorageError::NotFound) => Attempt::Fail(err),
        other => other,
    }
}

/// Writes of one `apply_outcome` call whose fate is unknown: they failed or
/// timed out on our side but may still reach the store.
///
/// Each is kept until a fresh read shows it landed, or shows the stored
/// version moved past the one it expects, so it can no longer land.
#[derive(Default)]
struct InFlight(Mutex<Vec<ReviewRecord>>);

impl InFlight {
    fn remember(&self, write: ReviewRecord) {
        if let Ok(mut writes) = self.0.lock() {
            writes.push(write);
        }
    }

    /// Whether `current` is one of the unsettled writes, as storage stores it.
    fn landed(&self, current: &ReviewRecord) -> bool {
        let Ok(mut writes) = self.0.lock() else {
            return false;
        };
        if writes
            .iter()
            .any(|w| *current == w.clone().with_version(w.version() + 1))
        {
            writes.clear();
            return true;
        }
        writes.retain(|w| w.version() >= current.version());
        false
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
