use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_core::model::{
    ContentPatch, DeckId, FlashcardContent, FlashcardId, ReviewOutcome, ReviewRecord,
};
use review_core::scheduler::Scheduler;
use review_core::time::fixed_now;
use services::{Clock, FlashcardService, RetryPolicy, ReviewService, ReviewServiceError};
use storage::repository::{
    DeckRepository, DueQuery, InMemoryRepository, NewDeckRecord, NewReviewRecord,
    ReviewRecordRepository, StorageError,
};

/// Wrapper that can interfere with writes to the inner store.
struct MeddlingStore {
    inner: InMemoryRepository,
    /// Sneak one competing review in between the next read and write.
    interleave_once: AtomicBool,
    /// Every write sleeps this long (ms) before reaching the store.
    put_delay_ms: AtomicUsize,
    /// The next write reaches the store after 150ms, but its caller only
    /// hears back after 200ms.
    land_late_once: AtomicBool,
    /// Which read (1-based) answers with an 80ms old snapshot; 0 for none.
    stale_read: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    /// Sneak one competing content edit in after the next read.
    edit_once: AtomicBool,
}

impl MeddlingStore {
    fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            interleave_once: AtomicBool::new(false),
            put_delay_ms: AtomicUsize::new(0),
            land_late_once: AtomicBool::new(false),
            stale_read: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            edit_once: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ReviewRecordRepository for MeddlingStore {
    async fn insert_record(&self, record: NewReviewRecord) -> Result<ReviewRecord, StorageError> {
        self.inner.insert_record(record).await
    }

    async fn get_record(&self, id: FlashcardId) -> Result<ReviewRecord, StorageError> {
        let read = self.inner.get_record(id).await?;
        let nth = self.gets.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stale_read.load(Ordering::SeqCst) == nth {
            tokio::time::sleep(StdDuration::from_millis(80)).await;
        }
        if self.interleave_once.swap(false, Ordering::SeqCst) {
            let rival = Scheduler::new().apply_outcome(&read, ReviewOutcome::Wrong, fixed_now());
            self.inner.put_record(&rival).await?;
        }
        if self.edit_once.swap(false, Ordering::SeqCst) {
            let rival = read
                .content()
                .merged(ContentPatch {
                    example: Some("La luna brilla.".into()),
                    ..ContentPatch::default()
                })
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.inner
                .update_content(id, read.version(), rival, fixed_now())
                .await?;
        }
        Ok(read)
    }

    async fn put_record(&self, record: &ReviewRecord) -> Result<ReviewRecord, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.land_late_once.swap(false, Ordering::SeqCst) {
            let (inner, record) = (self.inner.clone(), record.clone());
            tokio::spawn(async move {
                tokio::time::sleep(StdDuration::from_millis(150)).await;
                inner.put_record(&record).await
            });
            tokio::time::sleep(StdDuration::from_millis(200)).await;
            return Err(StorageError::Connection("reply lost".into()));
        }
        let delay = self.put_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(StdDuration::from_millis(delay as u64)).await;
        }
        self.inner.put_record(record).await
    }

    async fn query_due(
        &self,
        query: &DueQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewRecord>, StorageError> {
        self.inner.query_due(query, now).await
    }

    async fn list_records(
        &self,
        deck_id: Option<DeckId>,
    ) -> Result<Vec<ReviewRecord>, StorageError> {
        self.inner.list_records(deck_id).await
    }

    async fn update_content(
        &self,
        id: FlashcardId,
        expected_version: u64,
        content: FlashcardContent,
        updated_at: DateTime<Utc>,
    ) -> Result<ReviewRecord, StorageError> {
        self.inner
            .update_content(id, expected_version, content, updated_at)
            .await
    }

    async fn delete_record(&self, id: FlashcardId) -> Result<(), StorageError> {
        self.inner.delete_record(id).await
    }
}

async fn setup(policy: RetryPolicy) -> (ReviewService, Arc<MeddlingStore>, FlashcardId) {
    let repo = InMemoryRepository::new();
    let deck_id = repo
        .insert_new_deck(NewDeckRecord {
            name: "Spanish".into(),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    let card = repo
        .insert_record(NewReviewRecord {
            deck_id,
            content: FlashcardContent::new("la luna", "the moon", "").unwrap(),
            schedule: Scheduler::new().seed_schedule(),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    let store = Arc::new(MeddlingStore::new(repo.clone()));
    let service = ReviewService::new(Arc::new(repo), store.clone())
        .with_clock(Clock::fixed(fixed_now()))
        .with_retry(policy);
    (service, store, card.id())
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        base_backoff: StdDuration::from_millis(1),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn losing_writer_retries_on_fresh_state() {
    let (service, store, id) = setup(fast_policy()).await;
    store.interleave_once.store(true, Ordering::SeqCst);

    let stored = service
        .apply_outcome(id, ReviewOutcome::Correct)
        .await
        .unwrap();

    // The rival's Wrong and our Correct both count.
    assert_eq!(stored.schedule().fail_count(), 1);
    assert_eq!(stored.schedule().success_count(), 1);
    assert_eq!(stored.version(), 3);
    assert_eq!(store.puts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_answers_are_all_applied() {
    let (service, store, id) = setup(RetryPolicy {
        max_attempts: 50,
        ..fast_policy()
    })
    .await;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        let outcome = if i % 2 == 0 {
            ReviewOutcome::Correct
        } else {
            ReviewOutcome::Wrong
        };
        handles.push(tokio::spawn(async move {
            service.apply_outcome(id, outcome).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.inner.get_record(id).await.unwrap();
    assert_eq!(stored.schedule().success_count(), 4);
    assert_eq!(stored.schedule().fail_count(), 4);
    assert_eq!(stored.version(), 9);
}

#[tokio::test]
async fn exhausted_retries_surface_as_unavailable() {
    let (service, store, id) = setup(RetryPolicy {
        max_attempts: 2,
        base_backoff: StdDuration::from_millis(1),
        op_timeout: StdDuration::from_millis(20),
    })
    .await;
    store.put_delay_ms.store(500, Ordering::SeqCst);

    let err = service
        .apply_outcome(id, ReviewOutcome::Correct)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::Unavailable(_)));
    assert_eq!(store.puts.load(Ordering::SeqCst), 2);

    let untouched = store.inner.get_record(id).await.unwrap();
    assert_eq!(untouched.version(), 1);
}

#[tokio::test]
async fn unknown_record_is_never_retried() {
    let (service, store, _id) = setup(fast_policy()).await;
    let err = service
        .apply_outcome(FlashcardId::new(12_345), ReviewOutcome::Wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::FlashcardNotFound(_)));
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn late_landing_write_is_counted_once() {
    let (service, store, id) = setup(RetryPolicy {
        max_attempts: 3,
        base_backoff: StdDuration::from_millis(1),
        op_timeout: StdDuration::from_millis(100),
    })
    .await;
    store.land_late_once.store(true, Ordering::SeqCst);
    // The retry reads before the late write lands and answers after it did.
    store.stale_read.store(2, Ordering::SeqCst);

    let stored = service
        .apply_outcome(id, ReviewOutcome::Correct)
        .await
        .unwrap();

    assert_eq!(stored.schedule().success_count(), 1);
    assert_eq!(stored.version(), 2);
    let current = store.inner.get_record(id).await.unwrap();
    assert_eq!(current, stored);
    assert_eq!(store.puts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_edit_is_merged_not_overwritten() {
    let (_service, store, id) = setup(fast_policy()).await;
    let decks = InMemoryRepository::new();
    let flashcards = FlashcardService::new(Clock::fixed(fixed_now()), Arc::new(decks), store.clone());
    store.edit_once.store(true, Ordering::SeqCst);

    let edited = flashcards
        .update_flashcard(
            id,
            ContentPatch {
                back: Some("the moon (noun)".into()),
                ..ContentPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.content().back(), "the moon (noun)");
    assert_eq!(edited.content().example(), "La luna brilla.");
    assert_eq!(edited.version(), 3);
    assert_eq!(store.inner.get_record(id).await.unwrap(), edited);
}
