#![forbid(unsafe_code)]

pub mod app_services;
pub mod deck_service;
pub mod error;
pub mod flashcard_service;
pub mod retry;
pub mod review_service;
pub mod sessions;

pub use review_core::Clock;

pub use app_services::AppServices;
pub use deck_service::DeckService;
pub use error::{
    AppServicesError, CoordinatorError, DeckServiceError, FlashcardServiceError,
    ReviewServiceError,
};
pub use flashcard_service::FlashcardService;
pub use retry::RetryPolicy;
pub use review_service::ReviewService;
pub use sessions::{ReviewCoordinator, SessionAnswerResult, SessionProgress};
