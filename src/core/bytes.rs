//! Purpose: Convert between text, UTF-8 bytes, and base64 text.
//! Exports: `text_to_bytes`, `bytes_to_text`, `latin1_to_text`, `bytes_to_base64`,
//! `to_url_safe`, `normalize_base64`, `base64_to_bytes`, `is_base64_char`.
//! Role: Leaf conversions used by the token encoder and the candidate selector.
//! Invariants: Functions are pure; no allocation beyond the returned value.
//! Invariants: `normalize_base64` output length is always a multiple of 4.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::core::error::{Error, ErrorKind};

// Browsers' atob() tolerates non-zero trailing bits; tokens from third-party
// generators rely on that, so the decoder does too.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode UTF-8. With `lenient`, invalid sequences become U+FFFD instead of failing.
pub fn bytes_to_text(bytes: &[u8], lenient: bool) -> Result<String, Error> {
    if lenient {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    String::from_utf8(bytes.to_vec()).map_err(|err| {
        Error::new(ErrorKind::NoValidCandidate)
            .with_message("decoded bytes are not valid utf-8")
            .with_source(err)
    })
}

/// Read each byte as one Latin-1 code point.
pub fn latin1_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Standard alphabet with padding; `+` and `/` are left for `to_url_safe`.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    LENIENT_STANDARD.encode(bytes)
}

pub fn to_url_safe(base64: &str) -> String {
    base64
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

pub fn is_base64_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '+' | '/' | '-' | '_')
}

/// Map the URL-safe alphabet back to the standard one and pad to a multiple of 4.
pub fn normalize_base64(input: &str) -> Result<String, Error> {
    let mut out = to_standard_alphabet(input);

    let body = out.trim_end_matches('=');
    if let Some(bad) = body.chars().find(|&ch| !is_base64_char(ch)) {
        return Err(Error::new(ErrorKind::InvalidBase64)
            .with_message(format!("unexpected character {bad:?} in base64 input")));
    }

    while out.len() % 4 != 0 {
        out.push('=');
    }
    Ok(out)
}

pub fn base64_to_bytes(input: &str) -> Result<Vec<u8>, Error> {
    LENIENT_STANDARD.decode(input).map_err(|err| {
        Error::new(ErrorKind::InvalidBase64)
            .with_message("base64 decode failed")
            .with_source(err)
    })
}

fn to_standard_alphabet(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}
