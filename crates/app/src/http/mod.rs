//! JSON API over the review services.

use std::fmt::Display;
use std::str::FromStr;

use axum::Json;
use axum::Router;
use axum::routing::{get, put};
use services::AppServices;
use tower_http::cors::{Any, CorsLayer};

mod decks;
mod dto;
mod error;
mod flashcards;

use dto::{Envelope, HealthDto};
use error::ApiError;

/// Build the API router. Every handler shares one `AppServices`.
pub fn router(services: AppServices) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/decks", get(decks::list_decks).post(decks::create_deck))
        .route(
            "/decks/{deck_id}",
            get(decks::get_deck).delete(decks::delete_deck),
        )
        .route(
            "/flashcards",
            get(flashcards::list_flashcards).post(flashcards::create_flashcard),
        )
        .route("/flashcards/due", get(flashcards::due_flashcards_all))
        .route("/flashcards/due/{deck_id}", get(flashcards::due_flashcards))
        .route(
            "/flashcards/mark-correct/{id}",
            put(flashcards::mark_correct),
        )
        .route("/flashcards/mark-wrong/{id}", put(flashcards::mark_wrong))
        .route(
            "/flashcards/{id}",
            get(flashcards::get_flashcard)
                .put(flashcards::update_flashcard)
                .delete(flashcards::delete_flashcard),
        )
        .layer(cors)
        .with_state(services)
}

async fn health() -> Json<Envelope<HealthDto>> {
    Json(Envelope::new(HealthDto { status: "ok" }))
}

fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::Validation(format!("{e}: {raw:?}")))
}
