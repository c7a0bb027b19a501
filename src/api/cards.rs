//! Purpose: Flashcard records, the payload shape the bundled widget consumes.
//! Exports: `Flashcard`, `FLASHCARDS_WIDGET`, `CARDS_FIELD`, `example_cards`, `parse_cards`.
//! Role: Consumer-side schema; the codec itself never looks inside payloads.
//! Invariants: Serialized keys are `Q`, `A`, `T`, and optional `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

pub const FLASHCARDS_WIDGET: &str = "flashcards";
pub const CARDS_FIELD: &str = "cards";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Flashcard {
    #[serde(rename = "Q")]
    pub question: String,
    #[serde(rename = "A")]
    pub answer: String,
    #[serde(rename = "T")]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Flashcard {
    pub fn new(question: &str, answer: &str, topic: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
            topic: topic.to_string(),
            id: None,
        }
    }
}

pub fn example_cards() -> Vec<Flashcard> {
    vec![
        Flashcard::new("Qual é a capital do Brasil?", "Brasília", "Geografia"),
        Flashcard::new("Quem escreveu Dom Casmurro?", "Machado de Assis", "Literatura"),
        Flashcard::new("Qual é a fórmula da água?", "H₂O", "Química"),
    ]
}

/// Validate a decoded payload as a non-empty list of flashcards.
pub fn parse_cards(value: Value) -> Result<Vec<Flashcard>, Error> {
    if !value.is_array() {
        return Err(Error::new(ErrorKind::NoValidCandidate)
            .with_message("flashcard payload must be a JSON array"));
    }
    let cards: Vec<Flashcard> = serde_json::from_value(value).map_err(|err| {
        Error::new(ErrorKind::NoValidCandidate)
            .with_message("flashcard records need string Q, A and T fields")
            .with_source(err)
    })?;
    if cards.is_empty() {
        return Err(Error::new(ErrorKind::NoValidCandidate)
            .with_message("no flashcards received")
            .with_hint("Check the data parameter or the host's cards message."));
    }
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_use_single_letter_keys() {
        let value = serde_json::to_value(&example_cards()[0]).unwrap();
        assert_eq!(
            value,
            json!({"Q": "Qual é a capital do Brasil?", "A": "Brasília", "T": "Geografia"})
        );
    }

    #[test]
    fn parse_accepts_optional_id() {
        let cards = parse_cards(json!([{"Q": "q", "A": "a", "T": "t", "id": "c1"}])).unwrap();
        assert_eq!(cards[0].id.as_deref(), Some("c1"));
    }

    #[test]
    fn parse_rejects_wrong_shapes() {
        assert!(parse_cards(json!({"Q": "q"})).is_err());
        assert!(parse_cards(json!([{"Q": "q", "A": 1, "T": "t"}])).is_err());
        let err = parse_cards(json!([])).unwrap_err();
        assert_eq!(err.message(), Some("no flashcards received"));
    }
}
