use chrono::Duration;
use review_core::model::{DeckId, FlashcardContent, FlashcardId, ReviewOutcome, ReviewRecord};
use review_core::scheduler::Scheduler;
use review_core::time::fixed_now;
use storage::repository::{
    DeckRepository, DueQuery, NewDeckRecord, NewReviewRecord, ReviewRecordRepository,
    StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn insert_deck(repo: &SqliteRepository, name: &str) -> DeckId {
    repo.insert_new_deck(NewDeckRecord {
        name: name.to_string(),
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

async fn insert_card(repo: &SqliteRepository, deck_id: DeckId, front: &str) -> ReviewRecord {
    repo.insert_record(NewReviewRecord {
        deck_id,
        content: FlashcardContent::new(front, format!("{front} (en)"), "").unwrap(),
        schedule: Scheduler::new().seed_schedule(),
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_reviewed_record() {
    let repo = connect("memdb_roundtrip").await;
    let deck_id = insert_deck(&repo, "Spanish").await;
    let card = insert_card(&repo, deck_id, "la casa").await;

    let fetched = repo.get_record(card.id()).await.unwrap();
    assert_eq!(fetched, card);
    assert_eq!(fetched.next_review_at(), None);

    let reviewed = Scheduler::new().apply_outcome(&fetched, ReviewOutcome::Correct, fixed_now());
    let stored = repo.put_record(&reviewed).await.unwrap();
    assert_eq!(stored.version(), 2);

    let fetched = repo.get_record(card.id()).await.unwrap();
    assert_eq!(fetched, stored);
    assert_eq!(fetched.schedule().success_count(), 1);
    assert_eq!(fetched.next_review_at(), Some(fixed_now() + Duration::hours(1)));
}

#[tokio::test]
async fn sqlite_rejects_stale_version() {
    let repo = connect("memdb_stale").await;
    let deck_id = insert_deck(&repo, "Spanish").await;
    let card = insert_card(&repo, deck_id, "el libro").await;
    let scheduler = Scheduler::new();

    let winner = scheduler.apply_outcome(&card, ReviewOutcome::Wrong, fixed_now());
    let loser = scheduler.apply_outcome(&card, ReviewOutcome::Correct, fixed_now());
    repo.put_record(&winner).await.unwrap();

    assert!(matches!(
        repo.put_record(&loser).await,
        Err(StorageError::Conflict)
    ));
    let current = repo.get_record(card.id()).await.unwrap();
    assert_eq!(current.schedule().fail_count(), 1);
    assert_eq!(current.schedule().success_count(), 0);
}

#[tokio::test]
async fn sqlite_due_query_matches_presentation_order() {
    let repo = connect("memdb_due").await;
    let deck_id = insert_deck(&repo, "Spanish").await;
    let other_deck = insert_deck(&repo, "French").await;
    let scheduler = Scheduler::new();
    let now = fixed_now() + Duration::days(1);

    let fresh = insert_card(&repo, deck_id, "nuevo").await;
    let hour = insert_card(&repo, deck_id, "hora").await;
    let missed = insert_card(&repo, deck_id, "fallo").await;
    let later = insert_card(&repo, deck_id, "luego").await;
    insert_card(&repo, other_deck, "bonjour").await;

    repo.put_record(&scheduler.apply_outcome(&hour, ReviewOutcome::Correct, fixed_now()))
        .await
        .unwrap();
    repo.put_record(&scheduler.apply_outcome(&missed, ReviewOutcome::Wrong, fixed_now()))
        .await
        .unwrap();
    repo.put_record(&scheduler.apply_outcome(&later, ReviewOutcome::Correct, now))
        .await
        .unwrap();

    let due = repo
        .query_due(&DueQuery::for_deck(deck_id), now)
        .await
        .unwrap();
    let ids: Vec<FlashcardId> = due.iter().map(ReviewRecord::id).collect();
    assert_eq!(ids, vec![fresh.id(), missed.id(), hour.id()]);
    assert!(due.iter().all(|r| r.is_due(now)));

    let limited = repo
        .query_due(&DueQuery::for_deck(deck_id).with_limit(2), now)
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let everywhere = repo.query_due(&DueQuery::default(), now).await.unwrap();
    assert_eq!(everywhere.len(), 4);
}

#[tokio::test]
async fn sqlite_edit_and_cascade_delete() {
    let repo = connect("memdb_cascade").await;
    let deck_id = insert_deck(&repo, "Spanish").await;
    let card = insert_card(&repo, deck_id, "el gato").await;

    let edited = repo
        .update_content(
            card.id(),
            card.version(),
            FlashcardContent::new("el gato", "the cat", "El gato duerme.").unwrap(),
            fixed_now() + Duration::minutes(5),
        )
        .await
        .unwrap();
    assert_eq!(edited.version(), 2);
    assert_eq!(edited.content().example(), "El gato duerme.");
    assert_eq!(edited.schedule(), card.schedule());

    let stale = repo
        .update_content(
            card.id(),
            card.version(),
            FlashcardContent::new("el gato", "the kitten", "").unwrap(),
            fixed_now() + Duration::minutes(6),
        )
        .await;
    assert!(matches!(stale, Err(StorageError::Conflict)));
    let missing = repo
        .update_content(
            FlashcardId::new(9_999),
            1,
            FlashcardContent::new("x", "y", "").unwrap(),
            fixed_now(),
        )
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound)));

    let listing = repo.list_decks(10).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].flashcard_count, 1);

    repo.delete_deck(deck_id).await.unwrap();
    assert!(matches!(
        repo.get_record(card.id()).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.list_records(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_insert_into_missing_deck_is_not_found() {
    let repo = connect("memdb_missing_deck").await;
    let result = repo
        .insert_record(NewReviewRecord {
            deck_id: DeckId::new(404),
            content: FlashcardContent::new("hola", "hello", "").unwrap(),
            schedule: Scheduler::new().seed_schedule(),
            created_at: fixed_now(),
        })
        .await;
    assert!(matches!(result, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let deck_id = insert_deck(&repo, "Spanish").await;
    assert!(repo.get_deck(deck_id).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_constraint_violation_is_not_a_connection_error() {
    let repo = connect("memdb_constraint").await;
    sqlx::query("CREATE UNIQUE INDEX idx_decks_name ON decks(name)")
        .execute(repo.pool())
        .await
        .unwrap();
    insert_deck(&repo, "Spanish").await;

    let result = repo
        .insert_new_deck(NewDeckRecord {
            name: "Spanish".to_string(),
            created_at: fixed_now(),
        })
        .await;
    assert!(matches!(result, Err(StorageError::Serialization(_))));
}

#[tokio::test]
async fn sqlite_due_query_handles_fractional_seconds() {
    let repo = connect("memdb_subsecond").await;
    let deck_id = insert_deck(&repo, "Spanish").await;
    let scheduler = Scheduler::new();
    let now = fixed_now() + Duration::milliseconds(500);

    // A first correct answer schedules the card one hour after the review.
    let review_at = |due: chrono::DateTime<chrono::Utc>| due - Duration::hours(1);
    let cases = [
        ("justo", now - Duration::milliseconds(1), true),
        ("casi", now + Duration::milliseconds(1), false),
        ("exacto", now, true),
        ("entero", fixed_now(), true),
        ("micro", now - Duration::microseconds(123_456), true),
        ("pronto", fixed_now() + Duration::seconds(1), false),
    ];

    let mut expected = Vec::new();
    for (front, due, is_due) in cases {
        let card = insert_card(&repo, deck_id, front).await;
        let reviewed = scheduler.apply_outcome(&card, ReviewOutcome::Correct, review_at(due));
        let stored = repo.put_record(&reviewed).await.unwrap();
        assert_eq!(stored.next_review_at(), Some(due));
        if is_due {
            expected.push(stored);
        }
    }
    expected.sort_by_key(|r| r.next_review_at());

    let due = repo
        .query_due(&DueQuery::for_deck(deck_id), now)
        .await
        .unwrap();
    let ids: Vec<FlashcardId> = due.iter().map(ReviewRecord::id).collect();
    let want: Vec<FlashcardId> = expected.iter().map(ReviewRecord::id).collect();
    assert_eq!(ids, want);
    assert!(due.iter().all(|r| r.is_due(now)));
}
