use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{ReviewOutcome, ReviewRecord, ReviewSchedule};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("easiness floor must be positive and finite, got {provided}")]
    InvalidFloor { provided: f64 },
    #[error("initial easiness {initial} is below the floor {floor}")]
    InitialBelowFloor { initial: f64, floor: f64 },
    #[error("wrong-answer penalty must be non-negative and finite, got {provided}")]
    InvalidPenalty { provided: f64 },
    #[error("bonus scale must be positive and finite, got {provided}")]
    InvalidBonusScale { provided: f64 },
    #[error("{name} interval must be at least one second")]
    NonPositiveInterval { name: &'static str },
    #[error("max interval must be at least the seed and reset intervals")]
    MaxIntervalTooSmall,
    #[error("reset interval must not exceed the seed interval")]
    ResetLongerThanSeed,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Tunable constants of the correct/wrong scheduler.
///
/// Defaults follow SM-2: neutral easiness 2.5, floor 1.3, a 0.2 penalty per
/// miss. A card answered correctly for the first time comes back after an
/// hour; a missed card comes back after fifteen minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub initial_easiness: f64,
    pub easiness_floor: f64,
    pub wrong_penalty: f64,
    /// Numerator of the correct-answer bonus, `bonus(e) = bonus_scale / e`.
    pub bonus_scale: f64,
    pub seed_interval: Duration,
    pub reset_interval: Duration,
    /// Upper bound on any interval, so due dates stay representable.
    pub max_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness: 2.5,
            easiness_floor: 1.3,
            wrong_penalty: 0.2,
            bonus_scale: 0.25,
            seed_interval: Duration::hours(1),
            reset_interval: Duration::minutes(15),
            max_interval: Duration::days(3650),
        }
    }
}

impl SchedulerConfig {
    /// Check that the constants keep every scheduler invariant satisfiable.
    ///
    /// # Errors
    ///
    /// Returns the first `SchedulerError` found.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.easiness_floor.is_finite() || self.easiness_floor <= 0.0 {
            return Err(SchedulerError::InvalidFloor {
                provided: self.easiness_floor,
            });
        }
        if !self.initial_easiness.is_finite() || self.initial_easiness < self.easiness_floor {
            return Err(SchedulerError::InitialBelowFloor {
                initial: self.initial_easiness,
                floor: self.easiness_floor,
            });
        }
        if !self.wrong_penalty.is_finite() || self.wrong_penalty < 0.0 {
            return Err(SchedulerError::InvalidPenalty {
                provided: self.wrong_penalty,
            });
        }
        if !self.bonus_scale.is_finite() || self.bonus_scale <= 0.0 {
            return Err(SchedulerError::InvalidBonusScale {
                provided: self.bonus_scale,
            });
        }
        if self.seed_interval < Duration::seconds(1) {
            return Err(SchedulerError::NonPositiveInterval { name: "seed" });
        }
        if self.reset_interval < Duration::seconds(1) {
            return Err(SchedulerError::NonPositiveInterval { name: "reset" });
        }
        // A miss must never push a card further out than a first success.
        if self.reset_interval > self.seed_interval {
            return Err(SchedulerError::ResetLongerThanSeed);
        }
        if self.max_interval < self.seed_interval || self.max_interval < self.reset_interval {
            return Err(SchedulerError::MaxIntervalTooSmall);
        }
        Ok(())
    }

    /// Easiness reward for a correct answer. Always positive, and smaller the
    /// easier the card already is.
    #[must_use]
    pub fn bonus(&self, easiness: f64) -> f64 {
        self.bonus_scale / easiness
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Due dates each answer would produce, for showing before the learner commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomePreview {
    pub correct: DateTime<Utc>,
    pub wrong: DateTime<Utc>,
}

/// Pure correct/wrong scheduler.
///
/// Given the same record, outcome and time it always produces the same
/// result. Applying an outcome twice counts as two reviews.
///
/// # Examples
///
/// ```
/// # use review_core::scheduler::Scheduler;
/// # use review_core::model::{DeckId, FlashcardContent, FlashcardId, ReviewOutcome, ReviewRecord};
/// let scheduler = Scheduler::new();
/// let now = chrono::Utc::now();
/// let content = FlashcardContent::new("hola", "hello", "").unwrap();
/// let card = ReviewRecord::new(FlashcardId::new(1), DeckId::new(1), content, scheduler.seed_schedule(), now);
///
/// let reviewed = scheduler.apply_outcome(&card, ReviewOutcome::Correct, now);
/// assert_eq!(reviewed.schedule().interval(), chrono::Duration::hours(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Scheduler with the default constants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with custom constants.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if `config` fails [`SchedulerConfig::validate`].
    pub fn try_new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Scheduling state for a flashcard that has just been created.
    #[must_use]
    pub fn seed_schedule(&self) -> ReviewSchedule {
        ReviewSchedule::seeded(self.config.seed_interval, self.config.initial_easiness)
    }

    /// Apply one review outcome at `now` and return the updated record.
    ///
    /// Storage version and content are carried over untouched.
    #[must_use]
    pub fn apply_outcome(
        &self,
        record: &ReviewRecord,
        outcome: ReviewOutcome,
        now: DateTime<Utc>,
    ) -> ReviewRecord {
        let schedule = self.next_schedule(record.schedule(), outcome, now);
        record.clone().with_schedule(schedule, now)
    }

    /// Compute the schedule that follows `current` after `outcome`.
    #[must_use]
    pub fn next_schedule(
        &self,
        current: &ReviewSchedule,
        outcome: ReviewOutcome,
        now: DateTime<Utc>,
    ) -> ReviewSchedule {
        let floor = self.config.easiness_floor;
        // Stored easiness may predate a config change that raised the floor.
        let easiness = current.easiness().max(floor);

        match outcome {
            ReviewOutcome::Correct => {
                let easiness = (easiness + self.config.bonus(easiness)).max(floor);
                let interval = if current.is_new() {
                    self.config.seed_interval
                } else {
                    self.scale_interval(current.interval(), easiness)
                };
                ReviewSchedule::reviewed(
                    current.success_count().saturating_add(1),
                    current.fail_count(),
                    interval,
                    easiness,
                    now,
                )
            }
            ReviewOutcome::Wrong => ReviewSchedule::reviewed(
                current.success_count(),
                current.fail_count().saturating_add(1),
                self.config.reset_interval,
                (easiness - self.config.wrong_penalty).max(floor),
                now,
            ),
        }
    }

    /// Due dates for both answers, without mutating anything.
    #[must_use]
    pub fn preview(&self, record: &ReviewRecord, now: DateTime<Utc>) -> OutcomePreview {
        let due = |outcome| {
            let next = self.next_schedule(record.schedule(), outcome, now);
            now + next.interval()
        };
        OutcomePreview {
            correct: due(ReviewOutcome::Correct),
            wrong: due(ReviewOutcome::Wrong),
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn scale_interval(&self, previous: Duration, easiness: f64) -> Duration {
        let max_secs = self.config.max_interval.num_seconds();
        let scaled = (previous.num_seconds() as f64 * easiness).round();
        let secs = if scaled >= max_secs as f64 {
            max_secs
        } else {
            (scaled as i64).max(1)
        };
        Duration::seconds(secs)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
