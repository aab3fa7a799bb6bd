use std::sync::Arc;

use log::{debug, info};
use review_core::model::{ContentPatch, DeckId, FlashcardContent, FlashcardId, ReviewRecord};
use review_core::scheduler::Scheduler;
use storage::repository::{
    DeckRepository, NewReviewRecord, ReviewRecordRepository, StorageError,
};

use crate::Clock;
use crate::error::FlashcardServiceError;

/// Reads-merge-writes tried before a concurrently edited flashcard gives up.
const EDIT_ATTEMPTS: u32 = 3;

/// Flashcard CRUD. Creating a flashcard also creates its review record.
#[derive(Clone)]
pub struct FlashcardService {
    clock: Clock,
    scheduler: Scheduler,
    decks: Arc<dyn DeckRepository>,
    records: Arc<dyn ReviewRecordRepository>,
}

impl FlashcardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks: Arc<dyn DeckRepository>,
        records: Arc<dyn ReviewRecordRepository>,
    ) -> Self {
        Self {
            clock,
            scheduler: Scheduler::default(),
            decks,
            records,
        }
    }

    /// Seed new flashcards with this scheduler's initial state.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Add a flashcard to a deck, scheduled as never reviewed.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::DeckNotFound` if the deck does not exist.
    /// Returns `FlashcardServiceError::Storage` if persistence fails.
    pub async fn create_flashcard(
        &self,
        deck_id: DeckId,
        content: FlashcardContent,
    ) -> Result<ReviewRecord, FlashcardServiceError> {
        let record = NewReviewRecord {
            deck_id,
            content,
            schedule: self.scheduler.seed_schedule(),
            created_at: self.clock.now(),
        };
        match self.records.insert_record(record).await {
            Ok(stored) => {
                info!("created flashcard {} in deck {deck_id}", stored.id());
                Ok(stored)
            }
            Err(StorageError::NotFound) => Err(FlashcardServiceError::DeckNotFound(deck_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// List flashcards, optionally restricted to one deck.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::DeckNotFound` for an unknown deck.
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn list_flashcards(
        &self,
        deck_id: Option<DeckId>,
    ) -> Result<Vec<ReviewRecord>, FlashcardServiceError> {
        if let Some(deck_id) = deck_id {
            if self.decks.get_deck(deck_id).await?.is_none() {
                return Err(FlashcardServiceError::DeckNotFound(deck_id));
            }
        }
        Ok(self.records.list_records(deck_id).await?)
    }

    /// # Errors
    ///
    /// Returns `FlashcardServiceError::NotFound` if missing.
    pub async fn get_flashcard(
        &self,
        id: FlashcardId,
    ) -> Result<ReviewRecord, FlashcardServiceError> {
        self.records
            .get_record(id)
            .await
            .map_err(|e| not_found(e, id))
    }

    /// Edit front, back or example. Scheduling state is kept.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::EmptyPatch` when nothing would change,
    /// `FlashcardServiceError::Content` if the edited content is invalid, and
    /// `FlashcardServiceError::NotFound` if the flashcard is missing. A
    /// flashcard that keeps changing underneath the edit surfaces as
    /// `StorageError::Conflict`.
    pub async fn update_flashcard(
        &self,
        id: FlashcardId,
        patch: ContentPatch,
    ) -> Result<ReviewRecord, FlashcardServiceError> {
        if patch.is_empty() {
            return Err(FlashcardServiceError::EmptyPatch);
        }
        let mut attempt = 1;
        loop {
            let current = self.get_flashcard(id).await?;
            let content = current.content().merged(patch.clone())?;
            match self
                .records
                .update_content(id, current.version(), content, self.clock.now())
                .await
            {
                Err(StorageError::Conflict) if attempt < EDIT_ATTEMPTS => {
                    debug!("flashcard {id} changed during edit, merging again");
                    attempt += 1;
                }
                result => return result.map_err(|e| not_found(e, id)),
            }
        }
    }

    /// # Errors
    ///
    /// Returns `FlashcardServiceError::NotFound` if missing.
    pub async fn delete_flashcard(&self, id: FlashcardId) -> Result<(), FlashcardServiceError> {
        self.records
            .delete_record(id)
            .await
            .map_err(|e| not_found(e, id))?;
        info!("deleted flashcard {id}");
        Ok(())
    }
}

fn not_found(err: StorageError, id: FlashcardId) -> FlashcardServiceError {
    match err {
        StorageError::NotFound => FlashcardServiceError::NotFound(id),
        other => other.into(),
    }
}
