//! Purpose: Turn a serializable payload into a URL-safe base64 token.
//! Exports: `TOKEN_PREFIX`, `encode_with_prefix`.
//! Role: Producer side of the codec; used by link builders and the CLI.
//! Invariants: Output is deterministic for a given payload and prefix.
//! Invariants: Token bodies use only `A-Z a-z 0-9 - _` plus trailing `=`.

use serde::Serialize;

use crate::core::bytes::{bytes_to_base64, text_to_bytes, to_url_safe};
use crate::core::error::{Error, ErrorKind};

pub const TOKEN_PREFIX: &str = "b64_";

pub fn encode_with_prefix<T>(payload: &T, prefix: &str) -> Result<String, Error>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(payload).map_err(|err| {
        Error::new(ErrorKind::NotSerializable)
            .with_message("payload cannot be represented as JSON")
            .with_source(err)
    })?;
    let body = to_url_safe(&bytes_to_base64(&text_to_bytes(&json)));
    Ok(format!("{prefix}{body}"))
}
