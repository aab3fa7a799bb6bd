use chrono::{DateTime, Utc};
use log::debug;
use review_core::model::{DeckId, FlashcardContent, FlashcardId, ReviewRecord};

use super::SqliteRepository;
use super::mapping::{
    RECORD_COLUMNS, conn, deck_id_to_i64, flashcard_id_from_i64, flashcard_id_to_i64,
    map_record_row, map_record_rows, u64_to_i64,
};
use crate::repository::{DueQuery, NewReviewRecord, ReviewRecordRepository, StorageError};

fn is_fk_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

impl SqliteRepository {
    /// Explain why a versioned write touched no row.
    async fn missing_or_conflict(&self, id: i64) -> Result<StorageError, StorageError> {
        let exists = sqlx::query("SELECT 1 FROM flashcards WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(if exists.is_some() {
            StorageError::Conflict
        } else {
            StorageError::NotFound
        })
    }
}

#[async_trait::async_trait]
impl ReviewRecordRepository for SqliteRepository {
    async fn insert_record(&self, record: NewReviewRecord) -> Result<ReviewRecord, StorageError> {
        let schedule = &record.schedule;
        let res = sqlx::query(
            r"
            INSERT INTO flashcards (
                deck_id, front, back, example, success_count, fail_count,
                interval_secs, easiness, last_reviewed_at, next_review_at,
                created_at, updated_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, 1)
            ",
        )
        .bind(deck_id_to_i64(record.deck_id)?)
        .bind(record.content.front())
        .bind(record.content.back())
        .bind(record.content.example())
        .bind(i64::from(schedule.success_count()))
        .bind(i64::from(schedule.fail_count()))
        .bind(schedule.interval().num_seconds())
        .bind(schedule.easiness())
        .bind(schedule.last_reviewed_at())
        .bind(schedule.next_review_at())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e) {
                StorageError::NotFound
            } else {
                conn(e)
            }
        })?;

        let id = flashcard_id_from_i64(res.last_insert_rowid())?;
        debug!("inserted flashcard {id} in deck {}", record.deck_id);
        Ok(ReviewRecord::new(
            id,
            record.deck_id,
            record.content,
            record.schedule,
            record.created_at,
        ))
    }

    async fn get_record(&self, id: FlashcardId) -> Result<ReviewRecord, StorageError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM flashcards WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(flashcard_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_record_row(&row)
    }

    async fn put_record(&self, record: &ReviewRecord) -> Result<ReviewRecord, StorageError> {
        let id = flashcard_id_to_i64(record.id())?;
        let expected = u64_to_i64("version", record.version())?;
        let schedule = record.schedule();

        let res = sqlx::query(
            r"
            UPDATE flashcards SET
                front = ?1,
                back = ?2,
                example = ?3,
                success_count = ?4,
                fail_count = ?5,
                interval_secs = ?6,
                easiness = ?7,
                last_reviewed_at = ?8,
                next_review_at = ?9,
                updated_at = ?10,
                version = version + 1
            WHERE id = ?11 AND version = ?12
            ",
        )
        .bind(record.content().front())
        .bind(record.content().back())
        .bind(record.content().example())
        .bind(i64::from(schedule.success_count()))
        .bind(i64::from(schedule.fail_count()))
        .bind(schedule.interval().num_seconds())
        .bind(schedule.easiness())
        .bind(schedule.last_reviewed_at())
        .bind(schedule.next_review_at())
        .bind(record.updated_at())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(self.missing_or_conflict(id).await?);
        }

        let stored = record.clone().with_version(record.version() + 1);
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
        let deck = query.deck_id.map(deck_id_to_i64).transpose()?;
        // A negative LIMIT means no limit in SQLite.
        let limit = query.limit.map_or(-1, i64::from);

        let sql = format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM flashcards
            WHERE (?1 IS NULL OR deck_id = ?1)
              AND (next_review_at IS NULL OR next_review_at <= ?2)
            ORDER BY
                CASE WHEN last_reviewed_at IS NULL THEN 0 ELSE 1 END,
                next_review_at ASC,
                created_at ASC,
                id ASC
            LIMIT ?3
            "
        );
        let rows = sqlx::query(&sql)
            .bind(deck)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        map_record_rows(&rows)
    }

    async fn list_records(
        &self,
        deck_id: Option<DeckId>,
    ) -> Result<Vec<ReviewRecord>, StorageError> {
        let deck = deck_id.map(deck_id_to_i64).transpose()?;
        let sql = format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM flashcards
            WHERE (?1 IS NULL OR deck_id = ?1)
            ORDER BY created_at ASC, id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(deck)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        map_record_rows(&rows)
    }

    async fn update_content(
        &self,
        id: FlashcardId,
        expected_version: u64,
        content: FlashcardContent,
        updated_at: DateTime<Utc>,
    ) -> Result<ReviewRecord, StorageError> {
        let id_value = flashcard_id_to_i64(id)?;
        let sql = format!(
            r"
            UPDATE flashcards SET
                front = ?1,
                back = ?2,
                example = ?3,
                updated_at = ?4,
                version = version + 1
            WHERE id = ?5 AND version = ?6
            RETURNING {RECORD_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(content.front())
            .bind(content.back())
            .bind(content.example())
            .bind(updated_at)
            .bind(id_value)
            .bind(u64_to_i64("version", expected_version)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                debug!("updated content of flashcard {id}");
                map_record_row(&row)
            }
            None => Err(self.missing_or_conflict(id_value).await?),
        }
    }

    async fn delete_record(&self, id: FlashcardId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(flashcard_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        debug!("deleted flashcard {id}");
        Ok(())
    }
}
