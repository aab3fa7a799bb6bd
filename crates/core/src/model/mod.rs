mod content;
mod deck;
mod ids;
mod record;
mod review;
pub mod session;

pub use content::{ContentError, ContentPatch, FlashcardContent, MAX_FIELD_CHARS};
pub use deck::{Deck, DeckError, MAX_DECK_NAME_CHARS, validate_deck_name};
pub use ids::{DeckId, FlashcardId, ParseIdError};
pub use record::{RecordError, ReviewRecord, ReviewSchedule};
pub use review::{ReviewError, ReviewOutcome};
pub use session::{
    ReviewSession, SessionError, SessionId, SessionPhase, SessionState, SessionSummary,
};
