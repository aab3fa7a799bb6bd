use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use review_core::model::DeckId;
use services::AppServices;

use super::dto::{CreateDeckRequest, DeckDto, Envelope, ListDecksQuery};
use super::error::ApiError;
use super::parse_id;

const DEFAULT_DECK_PAGE: u32 = 100;

pub async fn list_decks(
    State(services): State<AppServices>,
    query: Result<Query<ListDecksQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<DeckDto>>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_DECK_PAGE);
    if limit == 0 {
        return Err(ApiError::Validation("limit must be at least 1".into()));
    }
    let listings = services.decks().list_decks(limit).await?;
    Ok(Json(Envelope::new(
        listings.iter().map(DeckDto::from).collect(),
    )))
}

pub async fn create_deck(
    State(services): State<AppServices>,
    body: Result<Json<CreateDeckRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<DeckDto>>), ApiError> {
    let Json(body) = body?;
    let deck = services.decks().create_deck(&body.name).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(DeckDto::from(&deck)))))
}

pub async fn get_deck(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> Result<Json<Envelope<DeckDto>>, ApiError> {
    let deck_id: DeckId = parse_id(&raw)?;
    let deck = services.decks().get_deck(deck_id).await?;
    Ok(Json(Envelope::new(DeckDto::from(&deck))))
}

pub async fn delete_deck(
    State(services): State<AppServices>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deck_id: DeckId = parse_id(&raw)?;
    services.decks().delete_deck(deck_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
