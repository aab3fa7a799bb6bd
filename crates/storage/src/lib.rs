#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    DeckListing, DeckRepository, DueQuery, InMemoryRepository, NewDeckRecord, NewReviewRecord,
    ReviewRecordRepository, Storage, StorageError,
};
