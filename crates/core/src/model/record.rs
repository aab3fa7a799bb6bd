use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{
    content::FlashcardContent,
    ids::{DeckId, FlashcardId},
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when rehydrating a record whose stored fields disagree.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("interval must be positive, got {secs}s")]
    NonPositiveInterval { secs: i64 },

    #[error("easiness must be a positive finite number, got {value}")]
    InvalidEasiness { value: f64 },

    #[error("stored next_review_at does not equal last_reviewed_at + interval")]
    InconsistentSchedule,

    #[error("review counters are set but last_reviewed_at is missing")]
    MissingLastReview,
}

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// Scheduling state attached to one flashcard.
///
/// `next_review_at` is never stored here; it is always
/// `last_reviewed_at + interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSchedule {
    success_count: u32,
    fail_count: u32,
    interval: Duration,
    easiness: f64,
    last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewSchedule {
    /// Schedule for a card that has never been reviewed.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if `interval` is not positive or `easiness` is not
    /// a positive finite number.
    pub fn unreviewed(interval: Duration, easiness: f64) -> Result<Self, RecordError> {
        Self::from_persisted(0, 0, interval, easiness, None)
    }

    /// Rehydrate a schedule from storage.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` for a non-positive interval, invalid easiness, or
    /// counters that claim reviews happened without a review timestamp.
    pub fn from_persisted(
        success_count: u32,
        fail_count: u32,
        interval: Duration,
        easiness: f64,
        last_reviewed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, RecordError> {
        if interval <= Duration::zero() {
            return Err(RecordError::NonPositiveInterval {
                secs: interval.num_seconds(),
            });
        }
        if !easiness.is_finite() || easiness <= 0.0 {
            return Err(RecordError::InvalidEasiness { value: easiness });
        }
        if last_reviewed_at.is_none() && success_count + fail_count > 0 {
            return Err(RecordError::MissingLastReview);
        }

        Ok(Self {
            success_count,
            fail_count,
            interval,
            easiness,
            last_reviewed_at,
        })
    }

    #[must_use]
    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    #[must_use]
    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn easiness(&self) -> f64 {
        self.easiness
    }

    #[must_use]
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at.map(|last| last + self.interval)
    }

    /// True before the first review.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }
}

//
// ─── REVIEW RECORD ─────────────────────────────────────────────────────────────
//

/// One flashcard together with its scheduling state.
///
/// `version` is an opaque counter owned by storage; writers hand back the
/// version they read and storage refuses the write if it has moved on.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    id: FlashcardId,
    deck_id: DeckId,
    content: FlashcardContent,
    schedule: ReviewSchedule,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl ReviewRecord {
    #[must_use]
    pub fn new(
        id: FlashcardId,
        deck_id: DeckId,
        content: FlashcardContent,
        schedule: ReviewSchedule,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            deck_id,
            content,
            schedule,
            created_at,
            updated_at: created_at,
            version: 1,
        }
    }

    /// Rehydrate a record from storage, checking the stored due date.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InconsistentSchedule` when `stored_next_review_at`
    /// is not `last_reviewed_at + interval`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: FlashcardId,
        deck_id: DeckId,
        content: FlashcardContent,
        schedule: ReviewSchedule,
        stored_next_review_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Result<Self, RecordError> {
        if schedule.next_review_at() != stored_next_review_at {
            return Err(RecordError::InconsistentSchedule);
        }
        Ok(Self {
            id,
            deck_id,
            content,
            schedule,
            created_at,
            updated_at,
            version,
        })
    }

    #[must_use]
    pub fn id(&self) -> FlashcardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn content(&self) -> &FlashcardContent {
        &self.content
    }

    #[must_use]
    pub fn schedule(&self) -> &ReviewSchedule {
        &self.schedule
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.schedule.next_review_at()
    }

    /// Never-reviewed records are always due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at().is_none_or(|next| next <= now)
    }

    /// How far past its due date the record is; zero for new or not-yet-due cards.
    #[must_use]
    pub fn overdue_by(&self, now: DateTime<Utc>) -> Duration {
        self.next_review_at()
            .map_or(Duration::zero(), |next| (now - next).max(Duration::zero()))
    }

    /// Storage-only: stamp the version the record was persisted under.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Replace the content, leaving scheduling untouched.
    #[must_use]
    pub fn with_content(mut self, content: FlashcardContent, updated_at: DateTime<Utc>) -> Self {
        self.content = content;
        self.updated_at = updated_at;
        self
    }

    pub(crate) fn with_schedule(mut self, schedule: ReviewSchedule, updated_at: DateTime<Utc>) -> Self {
        self.schedule = schedule;
        self.updated_at = updated_at;
        self
    }
}

impl ReviewSchedule {
    /// Callers guarantee a positive interval and easiness (validated config).
    pub(crate) fn seeded(interval: Duration, easiness: f64) -> Self {
        Self {
            success_count: 0,
            fail_count: 0,
            interval,
            easiness,
            last_reviewed_at: None,
        }
    }

    pub(crate) fn reviewed(
        success_count: u32,
        fail_count: u32,
        interval: Duration,
        easiness: f64,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            success_count,
            fail_count,
            interval,
            easiness,
            last_reviewed_at: Some(reviewed_at),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
