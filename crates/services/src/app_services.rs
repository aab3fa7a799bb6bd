use std::sync::Arc;

use review_core::scheduler::{Scheduler, SchedulerConfig};
use storage::repository::Storage;

use crate::Clock;
use crate::deck_service::DeckService;
use crate::error::AppServicesError;
use crate::flashcard_service::FlashcardService;
use crate::retry::RetryPolicy;
use crate::review_service::ReviewService;
use crate::sessions::ReviewCoordinator;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    decks: Arc<DeckService>,
    flashcards: Arc<FlashcardService>,
    reviews: Arc<ReviewService>,
    coordinator: Arc<ReviewCoordinator>,
}

impl AppServices {
    /// Wire every service to `storage`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the scheduler constants or the retry
    /// policy are invalid.
    pub fn new(
        storage: &Storage,
        clock: Clock,
        scheduler: SchedulerConfig,
        retry: RetryPolicy,
    ) -> Result<Self, AppServicesError> {
        let scheduler = Scheduler::try_new(scheduler)?;
        retry.validate().map_err(AppServicesError::Retry)?;

        let decks = Arc::new(DeckService::new(clock, Arc::clone(&storage.decks)));
        let flashcards = Arc::new(
            FlashcardService::new(
                clock,
                Arc::clone(&storage.decks),
                Arc::clone(&storage.records),
            )
            .with_scheduler(scheduler.clone()),
        );
        let reviews = Arc::new(
            ReviewService::new(Arc::clone(&storage.decks), Arc::clone(&storage.records))
                .with_clock(clock)
                .with_scheduler(scheduler)
                .with_retry(retry),
        );
        let coordinator = Arc::new(ReviewCoordinator::new(clock, Arc::clone(&reviews)));

        Ok(Self {
            decks,
            flashcards,
            reviews,
            coordinator,
        })
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// configuration is invalid.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        scheduler: SchedulerConfig,
        retry: RetryPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(&storage, clock, scheduler, retry)
    }

    /// Build services over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Same as [`AppServices::new`].
    pub fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::new(
            &Storage::in_memory(),
            clock,
            SchedulerConfig::default(),
            RetryPolicy::default(),
        )
    }

    #[must_use]
    pub fn decks(&self) -> Arc<DeckService> {
        Arc::clone(&self.decks)
    }

    #[must_use]
    pub fn flashcards(&self) -> Arc<FlashcardService> {
        Arc::clone(&self.flashcards)
    }

    #[must_use]
    pub fn reviews(&self) -> Arc<ReviewService> {
        Arc::clone(&self.reviews)
    }

    #[must_use]
    pub fn coordinator(&self) -> Arc<ReviewCoordinator> {
        Arc::clone(&self.coordinator)
    }
}
