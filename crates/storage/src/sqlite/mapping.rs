use chrono::{DateTime, Duration, Utc};
use review_core::model::{
    Deck, DeckId, FlashcardContent, FlashcardId, ReviewRecord, ReviewSchedule,
};
use sqlx::Row;
use sqlx::error::ErrorKind;
use sqlx::sqlite::SqliteRow;

use crate::repository::{DeckListing, StorageError};

/// Column list shared by every flashcard query.
pub(crate) const RECORD_COLUMNS: &str = "id, deck_id, front, back, example, success_count, \
     fail_count, interval_secs, easiness, last_reviewed_at, next_review_at, created_at, \
     updated_at, version";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map a driver error. Constraint violations are permanent data errors and
/// must not look retryable.
pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if is_constraint_violation(db.kind()) => StorageError::Serialization(e.to_string()),
        _ => StorageError::Connection(e.to_string()),
    }
}

fn is_constraint_violation(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation
    )
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn flashcard_id_from_i64(v: i64) -> Result<FlashcardId, StorageError> {
    Ok(FlashcardId::new(i64_to_u64("flashcard_id", v)?))
}

pub(crate) fn deck_id_to_i64(id: DeckId) -> Result<i64, StorageError> {
    u64_to_i64("deck_id", id.value())
}

pub(crate) fn flashcard_id_to_i64(id: FlashcardId) -> Result<i64, StorageError> {
    u64_to_i64("flashcard_id", id.value())
}

pub(crate) fn map_deck_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    Deck::new(
        deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_deck_listing_row(row: &SqliteRow) -> Result<DeckListing, StorageError> {
    Ok(DeckListing {
        deck: map_deck_row(row)?,
        flashcard_count: i64_to_u64(
            "flashcard_count",
            row.try_get::<i64, _>("flashcard_count").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_record_row(row: &SqliteRow) -> Result<ReviewRecord, StorageError> {
    let content = FlashcardContent::new(
        row.try_get::<String, _>("front").map_err(ser)?,
        row.try_get::<String, _>("back").map_err(ser)?,
        row.try_get::<String, _>("example").map_err(ser)?,
    )
    .map_err(ser)?;

    let schedule = ReviewSchedule::from_persisted(
        i64_to_u32(
            "success_count",
            row.try_get::<i64, _>("success_count").map_err(ser)?,
        )?,
        i64_to_u32("fail_count", row.try_get::<i64, _>("fail_count").map_err(ser)?)?,
        Duration::seconds(row.try_get::<i64, _>("interval_secs").map_err(ser)?),
        row.try_get::<f64, _>("easiness").map_err(ser)?,
        row.try_get::<Option<DateTime<Utc>>, _>("last_reviewed_at")
            .map_err(ser)?,
    )
    .map_err(ser)?;

    ReviewRecord::from_persisted(
        flashcard_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        content,
        schedule,
        row.try_get("next_review_at").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
        i64_to_u64("version", row.try_get::<i64, _>("version").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_record_rows(rows: &[SqliteRow]) -> Result<Vec<ReviewRecord>, StorageError> {
    rows.iter().map(map_record_row).collect()
}
