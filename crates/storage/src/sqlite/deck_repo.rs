use log::debug;
use review_core::model::{Deck, DeckId};

use super::SqliteRepository;
use super::mapping::{conn, deck_id_from_i64, deck_id_to_i64, map_deck_listing_row, map_deck_row};
use crate::repository::{DeckListing, DeckRepository, NewDeckRecord, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO decks (name, created_at)
            VALUES (?1, ?2)
            ",
        )
        .bind(deck.name)
        .bind(deck.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = deck_id_from_i64(res.last_insert_rowid())?;
        debug!("inserted deck {id}");
        Ok(id)
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, created_at
            FROM decks WHERE id = ?1
            ",
        )
        .bind(deck_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_deck_row).transpose()
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<DeckListing>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT d.id, d.name, d.created_at, COUNT(f.id) AS flashcard_count
            FROM decks d
            LEFT JOIN flashcards f ON f.deck_id = d.id
            GROUP BY d.id
            ORDER BY d.id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_deck_listing_row).collect()
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1")
            .bind(deck_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        debug!("deleted deck {id}");
        Ok(())
    }
}
