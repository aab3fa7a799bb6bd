//! Shared error types for the services crate.

use thiserror::Error;

use review_core::model::{ContentError, DeckError, DeckId, FlashcardId, SessionError};
use review_core::scheduler::SchedulerError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ReviewService`.
///
/// Write conflicts never show up here: they are retried and, once the retry
/// budget is spent, reported as `Unavailable`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error("flashcard {0} not found")]
    FlashcardNotFound(FlashcardId),
    #[error("deck {0} not found")]
    DeckNotFound(DeckId),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("review store unavailable: {0}")]
    Unavailable(String),
}

impl ReviewServiceError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FlashcardNotFound(_) | Self::DeckNotFound(_))
    }
}

/// Errors emitted by `DeckService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error("deck {0} not found")]
    NotFound(DeckId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FlashcardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardServiceError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("edit contains no fields")]
    EmptyPatch,
    #[error("deck {0} not found")]
    DeckNotFound(DeckId),
    #[error("flashcard {0} not found")]
    NotFound(FlashcardId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReviewCoordinator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoordinatorError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("invalid retry policy: {0}")]
    Retry(String),
}
