use std::error::Error;

use log::info;
use review_core::model::{Deck, FlashcardContent};
use services::AppServices;

const DEMO_DECK_NAME: &str = "Spanish basics";

const DEMO_CARDS: &[(&str, &str, &str)] = &[
    ("el perro", "the dog", "El perro duerme en el sofá."),
    ("la casa", "the house", "Mi casa es tu casa."),
    ("el agua", "the water", "¿Me das un vaso de agua?"),
    ("la manzana", "the apple", "Como una manzana cada día."),
    ("el libro", "the book", "Estoy leyendo un libro nuevo."),
    ("la ventana", "the window", "Abre la ventana, por favor."),
    ("el tren", "the train", "El tren sale a las ocho."),
    ("la playa", "the beach", ""),
];

/// Create the demo deck unless a deck with the same name already exists.
///
/// Returns the deck and whether it was created by this call.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub async fn seed_demo_deck(services: &AppServices) -> Result<(Deck, bool), Box<dyn Error>> {
    let existing = services.decks().list_decks(u32::MAX).await?;
    if let Some(listing) = existing
        .into_iter()
        .find(|listing| listing.deck.name() == DEMO_DECK_NAME)
    {
        info!("demo deck already present as deck {}", listing.deck.id());
        return Ok((listing.deck, false));
    }

    let deck = services.decks().create_deck(DEMO_DECK_NAME).await?;
    let flashcards = services.flashcards();
    for (front, back, example) in DEMO_CARDS {
        let content = FlashcardContent::new(*front, *back, *example)?;
        flashcards.create_flashcard(deck.id(), content).await?;
    }
    info!("seeded deck {} with {} flashcards", deck.id(), DEMO_CARDS.len());
    Ok((deck, true))
}
