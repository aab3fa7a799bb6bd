use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::DeckId;

/// Longest deck name accepted, in characters.
pub const MAX_DECK_NAME_CHARS: usize = 120;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,

    #[error("deck name exceeds {max} characters")]
    NameTooLong { max: usize },
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// A named collection of flashcards. The deck owns every review record in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a new Deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if name is empty or whitespace-only,
    /// `DeckError::NameTooLong` if it exceeds [`MAX_DECK_NAME_CHARS`].
    pub fn new(
        id: DeckId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let name = validate_deck_name(&name.into())?;
        Ok(Self {
            id,
            name,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Trim and check a deck name before it reaches storage.
///
/// # Errors
///
/// Same as [`Deck::new`].
pub fn validate_deck_name(raw: &str) -> Result<String, DeckError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DeckError::EmptyName);
    }
    if name.chars().count() > MAX_DECK_NAME_CHARS {
        return Err(DeckError::NameTooLong {
            max: MAX_DECK_NAME_CHARS,
        });
    }
    Ok(name.to_owned())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn deck_new_rejects_empty_name() {
        let err = Deck::new(DeckId::new(1), "   ", fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }

    #[test]
    fn deck_trims_name() {
        let deck = Deck::new(DeckId::new(1), "  Spanish A2  ", fixed_now()).unwrap();
        assert_eq!(deck.name(), "Spanish A2");
        assert_eq!(deck.id(), DeckId::new(1));
    }

    #[test]
    fn deck_rejects_overlong_name() {
        let name = "x".repeat(MAX_DECK_NAME_CHARS + 1);
        let err = Deck::new(DeckId::new(1), name, fixed_now()).unwrap_err();
        assert!(matches!(err, DeckError::NameTooLong { .. }));
    }
}
