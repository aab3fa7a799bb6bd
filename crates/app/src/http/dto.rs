//! Wire shapes of the JSON API.
//!
//! Field names are camelCase, timestamps RFC 3339 in UTC, intervals in
//! seconds. Successful payloads are wrapped as `{"data": ...}`.

use chrono::{DateTime, SecondsFormat, Utc};
use review_core::model::{ContentPatch, Deck, ReviewRecord};
use serde::{Deserialize, Serialize};
use storage::repository::DeckListing;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDto {
    pub id: u64,
    pub name: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flashcard_count: Option<u64>,
}

impl From<&Deck> for DeckDto {
    fn from(deck: &Deck) -> Self {
        Self {
            id: deck.id().value(),
            name: deck.name().to_string(),
            created_at: timestamp(deck.created_at()),
            flashcard_count: None,
        }
    }
}

impl From<&DeckListing> for DeckDto {
    fn from(listing: &DeckListing) -> Self {
        Self {
            flashcard_count: Some(listing.flashcard_count),
            ..Self::from(&listing.deck)
        }
    }
}

/// A flashcard together with its review record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDto {
    pub id: u64,
    pub deck_id: u64,
    pub front: String,
    pub back: String,
    pub example: String,
    pub success_count: u32,
    pub fail_count: u32,
    /// Seconds.
    pub interval: i64,
    pub easiness: f64,
    pub last_reviewed_at: Option<String>,
    pub next_review_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
}

impl From<&ReviewRecord> for FlashcardDto {
    fn from(record: &ReviewRecord) -> Self {
        let content = record.content();
        let schedule = record.schedule();
        Self {
            id: record.id().value(),
            deck_id: record.deck_id().value(),
            front: content.front().to_string(),
            back: content.back().to_string(),
            example: content.example().to_string(),
            success_count: schedule.success_count(),
            fail_count: schedule.fail_count(),
            interval: schedule.interval().num_seconds(),
            easiness: schedule.easiness(),
            last_reviewed_at: schedule.last_reviewed_at().map(timestamp),
            next_review_at: schedule.next_review_at().map(timestamp),
            created_at: timestamp(record.created_at()),
            updated_at: timestamp(record.updated_at()),
            version: record.version(),
        }
    }
}

pub fn flashcards(records: &[ReviewRecord]) -> Vec<FlashcardDto> {
    records.iter().map(FlashcardDto::from).collect()
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlashcardRequest {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub example: String,
    pub deck_id: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFlashcardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
    pub example: Option<String>,
}

impl From<UpdateFlashcardRequest> for ContentPatch {
    fn from(req: UpdateFlashcardRequest) -> Self {
        Self {
            front: req.front,
            back: req.back,
            example: req.example,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDecksQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFlashcardsQuery {
    pub deck_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DueQuery {
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::model::{DeckId, FlashcardContent, FlashcardId};
    use review_core::scheduler::Scheduler;
    use review_core::time::fixed_now;

    #[test]
    fn flashcard_serializes_camel_case_with_seconds() {
        let record = ReviewRecord::new(
            FlashcardId::new(3),
            DeckId::new(1),
            FlashcardContent::new("el gato", "the cat", "El gato duerme.").unwrap(),
            Scheduler::new().seed_schedule(),
            fixed_now(),
        );
        let json = serde_json::to_value(Envelope::new(FlashcardDto::from(&record))).unwrap();
        let data = &json["data"];
        assert_eq!(data["deckId"], 1);
        assert_eq!(data["interval"], 3600);
        assert_eq!(data["successCount"], 0);
        assert_eq!(data["createdAt"], "2023-11-14T22:13:20Z");
        assert!(data["nextReviewAt"].is_null());
    }

    #[test]
    fn update_request_rejects_unknown_fields() {
        let parsed: Result<UpdateFlashcardRequest, _> =
            serde_json::from_str(r#"{"front":"x","interval":5}"#);
        assert!(parsed.is_err());
    }
}
