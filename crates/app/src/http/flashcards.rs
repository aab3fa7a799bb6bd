use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use review_core::model::{DeckId, FlashcardContent, FlashcardId, ReviewOutcome};
use services::AppServices;

use super::dto::{
    self, CreateFlashcardRequest, DueQuery, Envelope, FlashcardDto, ListFlashcardsQuery,
    UpdateFlashcardRequest,
};
use super::error::ApiError;
use super::parse_id;

type FlashcardResponse = Result<Json<Envelope<FlashcardDto>>, ApiError>;
type FlashcardListResponse = Result<Json<Envelope<Vec<FlashcardDto>>>, ApiError>;

pub async fn list_flashcards(
    State(services): State<AppServices>,
    query: Result<Query<ListFlashcardsQuery>, QueryRejection>,
) -> FlashcardListResponse {
    let Query(query) = query?;
    let records = services
        .flashcards()
        .list_flashcards(query.deck_id.map(DeckId::new))
        .await?;
    Ok(Json(Envelope::new(dto::flashcards(&records))))
}

pub async fn create_flashcard(
    State(services): State<AppServices>,
    body: Result<Json<CreateFlashcardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<FlashcardDto>>), ApiError> {
    let Json(body) = body?;
    let content = FlashcardContent::new(body.front, body.back, body.example)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let record = services
        .flashcards()
        .create_flashcard(DeckId::new(body.deck_id), content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(FlashcardDto::from(&record))),
    ))
}

pub async fn get_flashcard(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> FlashcardResponse {
    let id: FlashcardId = parse_id(&raw)?;
    let record = services.flashcards().get_flashcard(id).await?;
    Ok(Json(Envelope::new(FlashcardDto::from(&record))))
}

pub async fn update_flashcard(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
    body: Result<Json<UpdateFlashcardRequest>, JsonRejection>,
) -> FlashcardResponse {
    let id: FlashcardId = parse_id(&raw)?;
    let Json(body) = body?;
    let record = services
        .flashcards()
        .update_flashcard(id, body.into())
        .await?;
    Ok(Json(Envelope::new(FlashcardDto::from(&record))))
}

pub async fn delete_flashcard(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: FlashcardId = parse_id(&raw)?;
    services.flashcards().delete_flashcard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn due_flashcards(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
    query: Result<Query<DueQuery>, QueryRejection>,
) -> FlashcardListResponse {
    let deck_id: DeckId = parse_id(&raw)?;
    let Query(query) = query?;
    let records = services.reviews().due_records(deck_id, query.limit).await?;
    Ok(Json(Envelope::new(dto::flashcards(&records))))
}

pub async fn due_flashcards_all(
    State(services): State<AppServices>,
    query: Result<Query<DueQuery>, QueryRejection>,
) -> FlashcardListResponse {
    let Query(query) = query?;
    let records = services.reviews().due_records_all(query.limit).await?;
    Ok(Json(Envelope::new(dto::flashcards(&records))))
}

pub async fn mark_correct(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> FlashcardResponse {
    mark(&services, &raw, ReviewOutcome::Correct).await
}

pub async fn mark_wrong(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> FlashcardResponse {
    mark(&services, &raw, ReviewOutcome::Wrong).await
}

async fn mark(services: &AppServices, raw: &str, outcome: ReviewOutcome) -> FlashcardResponse {
    let id: FlashcardId = parse_id(raw)?;
    let record = services.reviews().apply_outcome(id, outcome).await?;
    Ok(Json(Envelope::new(FlashcardDto::from(&record))))
}
