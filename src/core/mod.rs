//! Purpose: The transport codec: payload → token → (lossy transport) → payload.
//! Exports: `Codec`, `CodecConfig`, plus free functions using the default config.
//! Role: Pure, synchronous core shared by the library API and the CLI.
//! Invariants: No shared mutable state; every call is independent and thread-safe.
//! Invariants: `decode_strict(encode(v)) == v` for every JSON-serializable `v`.
pub mod bytes;
pub mod classify;
pub mod error;
pub mod mojibake;
pub mod select;
pub mod token;

use serde::Serialize;
use serde_json::Value;

use classify::{Strategy, classify_with};
use error::Error;
use select::Explanation;

/// Bare inputs must be longer than this to be read as base64.
pub const DEFAULT_MIN_BARE_LEN: usize = 16;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodecConfig {
    pub prefix: String,
    pub min_bare_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            prefix: token::TOKEN_PREFIX.to_string(),
            min_bare_len: DEFAULT_MIN_BARE_LEN,
        }
    }
}

/// Stateless codec service; cheap to clone and safe to share across threads.
#[derive(Clone, Debug, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn encode<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, Error> {
        token::encode_with_prefix(payload, &self.config.prefix)
    }

    /// Token without the prefix marker; still decodable as bare base64.
    pub fn encode_bare<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, Error> {
        token::encode_with_prefix(payload, "")
    }

    pub fn classify(&self, raw: &str) -> Strategy {
        classify_with(raw, &self.config.prefix, self.config.min_bare_len).strategy
    }

    pub fn decode(&self, raw: &str) -> Result<Value, Error> {
        select::decode_with(raw, &self.config.prefix, self.config.min_bare_len)
    }

    pub fn explain(&self, raw: &str) -> Result<Explanation, Error> {
        select::explain_with(raw, &self.config.prefix, self.config.min_bare_len)
    }

    pub fn decode_strict(&self, token: &str) -> Result<Value, Error> {
        select::decode_strict_with(token, &self.config.prefix)
    }

    pub fn decode_strict_robust(&self, raw: &str) -> Result<Value, Error> {
        select::decode_strict_robust_with(raw, &self.config.prefix)
    }

    /// URL parameter path: strict decode over transport manglings, then the tolerant decoder.
    pub fn decode_param(&self, raw: &str) -> Result<Value, Error> {
        self.decode_strict_robust(raw).or_else(|strict_err| {
            tracing::debug!(error = %strict_err, "strict decode failed; trying tolerant decode");
            self.decode(raw)
        })
    }
}

pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, Error> {
    Codec::default().encode(payload)
}

pub fn classify(raw: &str) -> Strategy {
    Codec::default().classify(raw)
}

pub fn decode(raw: &str) -> Result<Value, Error> {
    Codec::default().decode(raw)
}

pub fn decode_strict(token: &str) -> Result<Value, Error> {
    Codec::default().decode_strict(token)
}

pub fn decode_strict_robust(raw: &str) -> Result<Value, Error> {
    Codec::default().decode_strict_robust(raw)
}
