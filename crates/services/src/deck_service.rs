use std::sync::Arc;

use log::info;
use review_core::model::{Deck, DeckId, validate_deck_name};
use storage::repository::{DeckListing, DeckRepository, NewDeckRecord, StorageError};

use crate::Clock;
use crate::error::DeckServiceError;

/// Orchestrates deck creation and persistence.
#[derive(Clone)]
pub struct DeckService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
}

impl DeckService {
    #[must_use]
    pub fn new(clock: Clock, decks: Arc<dyn DeckRepository>) -> Self {
        Self { clock, decks }
    }

    /// Create a new deck and persist it.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` for validation failures.
    /// Returns `DeckServiceError::Storage` if persistence fails.
    pub async fn create_deck(&self, name: &str) -> Result<Deck, DeckServiceError> {
        let name = validate_deck_name(name)?;
        let now = self.clock.now();
        let deck_id = self
            .decks
            .insert_new_deck(NewDeckRecord {
                name: name.clone(),
                created_at: now,
            })
            .await?;
        info!("created deck {deck_id} ({name})");
        Ok(Deck::new(deck_id, name, now)?)
    }

    /// List decks ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_decks(&self, limit: u32) -> Result<Vec<DeckListing>, DeckServiceError> {
        Ok(self.decks.list_decks(limit).await?)
    }

    /// Fetch a deck by ID.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` when the deck does not exist.
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn get_deck(&self, deck_id: DeckId) -> Result<Deck, DeckServiceError> {
        self.decks
            .get_deck(deck_id)
            .await?
            .ok_or(DeckServiceError::NotFound(deck_id))
    }

    /// Delete a deck together with its flashcards.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` when the deck does not exist.
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn delete_deck(&self, deck_id: DeckId) -> Result<(), DeckServiceError> {
        match self.decks.delete_deck(deck_id).await {
            Ok(()) => {
                info!("deleted deck {deck_id}");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(DeckServiceError::NotFound(deck_id)),
            Err(e) => Err(e.into()),
        }
    }
}
