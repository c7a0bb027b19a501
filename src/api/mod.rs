//! Purpose: Public surface for widget hosts and pages built on the codec.
//! Exports: URL parameter reading, widget config, flashcard records, embed links,
//! remote fetch, and the transport fallback channel, plus the shared error type.
//! Role: Everything a widget page or an embedding tool needs; the CLI uses only this and `core`.
//! Invariants: Nothing here re-implements decoding; every payload goes through `core::Codec`.

pub mod cards;
pub mod channel;
pub mod config;
pub mod embed;
pub mod params;
pub mod remote;

pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::{Codec, CodecConfig};
pub use cards::{CARDS_FIELD, FLASHCARDS_WIDGET, Flashcard, example_cards, parse_cards};
pub use channel::{
    CancelHandle, ChannelState, DataSource, FallbackChannel, HostEnd, HostLink, Resolution,
    load_widget_data,
};
pub use config::{Theme, WidgetConfig, decode_config};
pub use embed::{EmbedLink, build_embed, iframe_snippet, widget_url};
pub use params::{DataParam, WidgetParams};
pub use remote::{RemoteSource, fetch_json};
