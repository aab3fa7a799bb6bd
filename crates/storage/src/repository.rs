use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use review_core::model::{
    Deck, DeckId, FlashcardContent, FlashcardId, ReviewRecord, ReviewSchedule,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The record changed since it was read; re-read and try again.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert payload for a new deck; the ID is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewDeckRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A deck together with how many flashcards it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckListing {
    pub deck: Deck,
    pub flashcard_count: u64,
}

/// Insert payload for a flashcard and its initial schedule.
#[derive(Debug, Clone)]
pub struct NewReviewRecord {
    pub deck_id: DeckId,
    pub content: FlashcardContent,
    pub schedule: ReviewSchedule,
    pub created_at: DateTime<Utc>,
}

/// Which due records to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueQuery {
    /// Restrict to one deck; `None` spans every deck.
    pub deck_id: Option<DeckId>,
    pub limit: Option<u32>,
}

impl DueQuery {
    #[must_use]
    pub fn for_deck(deck_id: DeckId) -> Self {
        Self {
            deck_id: Some(deck_id),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Presentation order for a due set: never-reviewed first, then the most
/// overdue, then oldest card, then lowest id.
#[must_use]
pub fn due_order(a: &ReviewRecord, b: &ReviewRecord) -> Ordering {
    let rank = |r: &ReviewRecord| u8::from(!r.schedule().is_new());
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.next_review_at().cmp(&b.next_review_at()))
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id().cmp(&b.id()))
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Insert a new deck and return its storage-assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// Fetch a deck by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or serialization failures.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// List decks ordered by ID, with their flashcard counts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or serialization failures.
    async fn list_decks(&self, limit: u32) -> Result<Vec<DeckListing>, StorageError>;

    /// Delete a deck and every flashcard in it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError>;
}

/// Store for flashcards and their scheduling state.
///
/// `put_record` is a compare-and-swap on `ReviewRecord::version`: a writer
/// that read a stale version gets `StorageError::Conflict` and nothing is
/// written. Every successful write bumps the version.
#[async_trait]
pub trait ReviewRecordRepository: Send + Sync {
    /// Insert a flashcard with its initial schedule (version 1).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn insert_record(&self, record: NewReviewRecord) -> Result<ReviewRecord, StorageError>;

    /// Fetch a record by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_record(&self, id: FlashcardId) -> Result<ReviewRecord, StorageError>;

    /// Write `record` if its version still matches storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored version moved on,
    /// `StorageError::NotFound` if the record is gone.
    async fn put_record(&self, record: &ReviewRecord) -> Result<ReviewRecord, StorageError>;

    /// Records due at `now`, in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or serialization failures.
    async fn query_due(
        &self,
        query: &DueQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewRecord>, StorageError>;

    /// All records, optionally for one deck, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or serialization failures.
    async fn list_records(&self, deck_id: Option<DeckId>)
    -> Result<Vec<ReviewRecord>, StorageError>;

    /// Replace a flashcard's content if its version is still
    /// `expected_version`. Scheduling is untouched, the version bumps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored version moved on,
    /// `StorageError::NotFound` if missing.
    async fn update_content(
        &self,
        id: FlashcardId,
        expected_version: u64,
        content: FlashcardContent,
        updated_at: DateTime<Utc>,
    ) -> Result<ReviewRecord, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_record(&self, id: FlashcardId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    decks: HashMap<DeckId, Deck>,
    records: HashMap<FlashcardId, ReviewRecord>,
    last_deck_id: u64,
    last_record_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut guard = self.lock()?;
        guard.last_deck_id += 1;
        let id = DeckId::new(guard.last_deck_id);
        let deck = Deck::new(id, deck.name, deck.created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.decks.insert(id, deck);
        debug!("inserted deck {id}");
        Ok(id)
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.decks.get(&id).cloned())
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<DeckListing>, StorageError> {
        let guard = self.lock()?;
        let mut decks: Vec<&Deck> = guard.decks.values().collect();
        decks.sort_by_key(|d| d.id());
        Ok(decks
            .into_iter()
            .take(limit as usize)
            .map(|deck| DeckListing {
                deck: deck.clone(),
                flashcard_count: guard
                    .records
                    .values()
                    .filter(|r| r.deck_id() == deck.id())
                    .count() as u64,
            })
            .collect())
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.decks.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.records.retain(|_, r| r.deck_id() != id);
        debug!("deleted deck {id}");
        Ok(())
    }
}

#[async_trait]
impl ReviewRecordRepository for InMemoryRepository {
    async fn insert_record(&self, record: NewReviewRecord) -> Result<ReviewRecord, StorageError> {
        let mut guard = self.lock()?;
        if !guard.decks.contains_key(&record.deck_id) {
            return Err(StorageError::NotFound);
        }
        guard.last_record_id += 1;
        let stored = ReviewRecord::new(
            FlashcardId::new(guard.last_record_id),
            record.deck_id,
            record.content,
            record.schedule,
            record.created_at,
        );
        guard.records.insert(stored.id(), stored.clone());
        debug!("inserted flashcard {} in deck {}", stored.id(), stored.deck_id());
        Ok(stored)
    }

    async fn get_record(&self, id: FlashcardId) -> Result<ReviewRecord, StorageError> {
        let guard = self.lock()?;
        guard.records.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn put_record(&self, record: &ReviewRecord) -> Result<ReviewRecord, StorageError> {
        let mut guard = self.lock()?;
        let current = guard
            .records
            .get(&record.id())
            .ok_or(StorageError::NotFound)?;
        if current.version() != record.version() {
            return Err(StorageError::Conflict);
        }
        let stored = record.clone().with_version(record.version() + 1);
        guard.records.insert(stored.id(), stored.clone());
        debug!(
            "stored flashcard {} at version {}",
            stored.id(),
            stored.version()
        );
        Ok(stored)
    }

    async fn query_due(
        &self,
        query: &DueQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewRecord>, StorageError> {
        let guard = self.lock()?;
        let mut due: Vec<ReviewRecord> = guard
            .records
            .values()
            .filter(|r| query.deck_id.is_none_or(|deck| r.deck_id() == deck))
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();
        due.sort_by(due_order);
        if let Some(limit) = query.limit {
            due.truncate(limit as usize);
        }
        Ok(due)
    }

    async fn list_records(
        &self,
        deck_id: Option<DeckId>,
    ) -> Result<Vec<ReviewRecord>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<ReviewRecord> = guard
            .records
            .values()
            .filter(|r| deck_id.is_none_or(|deck| r.deck_id() == deck))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(records)
    }

    async fn update_content(
        &self,
        id: FlashcardId,
        expected_version: u64,
        content: FlashcardContent,
        updated_at: DateTime<Utc>,
    ) -> Result<ReviewRecord, StorageError> {
        let mut guard = self.lock()?;
        let current = guard.records.get(&id).ok_or(StorageError::NotFound)?;
        if current.version() != expected_version {
            return Err(StorageError::Conflict);
        }
        let version = current.version() + 1;
        let stored = current
            .clone()
            .with_content(content, updated_at)
            .with_version(version);
        guard.records.insert(id, stored.clone());
        debug!("updated content of flashcard {id}");
        Ok(stored)
    }

    async fn delete_record(&self, id: FlashcardId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.records.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        debug!("deleted flashcard {id}");
        Ok(())
    }
}

/// Aggregates deck and record repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub records: Arc<dyn ReviewRecordRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let decks: Arc<dyn DeckRepository> = Arc::new(repo.clone());
        let records: Arc<dyn ReviewRecordRepository> = Arc::new(repo);
        Self { decks, records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use review_core::model::ReviewOutcome;
    use review_core::scheduler::Scheduler;
    use review_core::time::fixed_now;

    async fn seeded_repo() -> (InMemoryRepository, DeckId) {
        let repo = InMemoryRepository::new();
        let deck_id = repo
            .insert_new_deck(NewDeckRecord {
                name: "Spanish".into(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        (repo, deck_id)
    }

    fn new_card(deck_id: DeckId, front: &str, created_at: DateTime<Utc>) -> NewReviewRecord {
        NewReviewRecord {
            deck_id,
            content: FlashcardContent::new(front, "back", "").unwrap(),
            schedule: Scheduler::new().seed_schedule(),
            created_at,
        }
    }

    #[tokio::test]
    async fn put_is_compare_and_swap() {
        let (repo, deck_id) = seeded_repo().await;
        let stored = repo
            .insert_record(new_card(deck_id, "uno", fixed_now()))
            .await
            .unwrap();
        assert_eq!(stored.version(), 1);

        let scheduler = Scheduler::new();
        let first = scheduler.apply_outcome(&stored, ReviewOutcome::Correct, fixed_now());
        let second = scheduler.apply_outcome(&stored, ReviewOutcome::Wrong, fixed_now());

        let written = repo.put_record(&first).await.unwrap();
        assert_eq!(written.version(), 2);
        assert!(matches!(
            repo.put_record(&second).await,
            Err(StorageError::Conflict)
        ));

        let current = repo.get_record(stored.id()).await.unwrap();
        assert_eq!(current.schedule().success_count(), 1);
        assert_eq!(current.schedule().fail_count(), 0);
    }

    #[tokio::test]
    async fn put_unknown_record_is_not_found() {
        let (repo, deck_id) = seeded_repo().await;
        let stored = repo
            .insert_record(new_card(deck_id, "uno", fixed_now()))
            .await
            .unwrap();
        repo.delete_record(stored.id()).await.unwrap();
        assert!(matches!(
            repo.put_record(&stored).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn insert_into_missing_deck_fails() {
        let repo = InMemoryRepository::new();
        let result = repo
            .insert_record(new_card(DeckId::new(99), "uno", fixed_now()))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn due_query_orders_new_then_most_overdue() {
        let (repo, deck_id) = seeded_repo().await;
        let scheduler = Scheduler::new();
        let now = fixed_now() + Duration::days(2);

        let a = repo
            .insert_record(new_card(deck_id, "a", fixed_now()))
            .await
            .unwrap();
        let b = repo
            .insert_record(new_card(deck_id, "b", fixed_now()))
            .await
            .unwrap();
        let c = repo
            .insert_record(new_card(deck_id, "c", fixed_now()))
            .await
            .unwrap();
        let d = repo
            .insert_record(new_card(deck_id, "d", fixed_now()))
            .await
            .unwrap();

        // a: due an hour after fixed_now; b: due 15 minutes after; d: not due yet.
        let a = scheduler.apply_outcome(&a, ReviewOutcome::Correct, fixed_now());
        repo.put_record(&a).await.unwrap();
        let b = scheduler.apply_outcome(&b, ReviewOutcome::Wrong, fixed_now());
        repo.put_record(&b).await.unwrap();
        let d = scheduler.apply_outcome(&d, ReviewOutcome::Correct, now);
        repo.put_record(&d).await.unwrap();

        let due = repo
            .query_due(&DueQuery::for_deck(deck_id), now)
            .await
            .unwrap();
        let ids: Vec<_> = due.iter().map(ReviewRecord::id).collect();
        assert_eq!(ids, vec![c.id(), b.id(), a.id()]);
        assert!(due.iter().all(|r| r.is_due(now)));

        let limited = repo
            .query_due(&DueQuery::for_deck(deck_id).with_limit(1), now)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id(), c.id());
    }

    #[tokio::test]
    async fn update_content_bumps_version_and_keeps_schedule() {
        let (repo, deck_id) = seeded_repo().await;
        let stored = repo
            .insert_record(new_card(deck_id, "uno", fixed_now()))
            .await
            .unwrap();
        let edited = repo
            .update_content(
                stored.id(),
                stored.version(),
                FlashcardContent::new("uno", "one", "Uno, dos, tres.").unwrap(),
                fixed_now() + Duration::minutes(1),
            )
            .await
            .unwrap();

        assert_eq!(edited.version(), 2);
        assert_eq!(edited.content().back(), "one");
        assert_eq!(edited.schedule(), stored.schedule());
        assert!(matches!(
            repo.put_record(&stored).await,
            Err(StorageError::Conflict)
        ));

        let stale = repo
            .update_content(
                stored.id(),
                stored.version(),
                FlashcardContent::new("uno", "one!", "").unwrap(),
                fixed_now() + Duration::minutes(2),
            )
            .await;
        assert!(matches!(stale, Err(StorageError::Conflict)));
        assert_eq!(repo.get_record(stored.id()).await.unwrap(), edited);
    }

    #[tokio::test]
    async fn deleting_deck_cascades() {
        let (repo, deck_id) = seeded_repo().await;
        let stored = repo
            .insert_record(new_card(deck_id, "uno", fixed_now()))
            .await
            .unwrap();

        let listing = repo.list_decks(10).await.unwrap();
        assert_eq!(listing[0].flashcard_count, 1);

        repo.delete_deck(deck_id).await.unwrap();
        assert!(repo.get_deck(deck_id).await.unwrap().is_none());
        assert!(matches!(
            repo.get_record(stored.id()).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.delete_deck(deck_id).await,
            Err(StorageError::NotFound)
        ));
    }
}
