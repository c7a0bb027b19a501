//! Purpose: Widget presentation config carried in the `config` URL parameter.
//! Exports: `WidgetConfig`, `Theme`, `decode_config`.
//! Role: Optional side-channel next to the data token; never blocks loading.
//! Invariants: Unknown keys are ignored; missing keys keep their defaults.
//! Invariants: A config that fails to decode yields an error the caller may ignore.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Codec;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    pub title: String,
    pub theme: Theme,
    pub shuffle_cards: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            title: "Flashcards".to_string(),
            theme: Theme::Auto,
            shuffle_cards: true,
        }
    }
}

impl WidgetConfig {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        if !value.is_object() {
            return Err(Error::new(ErrorKind::NoValidCandidate)
                .with_message("widget config must be a JSON object"));
        }
        serde_json::from_value(value).map_err(|err| {
            Error::new(ErrorKind::NoValidCandidate)
                .with_message("widget config has unexpected field types")
                .with_source(err)
        })
    }
}

/// The `config` value may be base64 or percent-encoded JSON, like the data token.
pub fn decode_config(codec: &Codec, raw: &str) -> Result<WidgetConfig, Error> {
    WidgetConfig::from_value(codec.decode(raw)?)
}
