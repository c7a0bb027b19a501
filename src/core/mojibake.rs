//! Purpose: Detect and undo UTF-8 text that was decoded as a single-byte charset.
//! Exports: `looks_corrupted`, `reinterpret_as_utf8`, `correct`, `fix_value`, `corruption_score`.
//! Role: Supplies repaired candidates and the scoring heuristic to the selector.
//! Invariants: All functions are total; unrepairable input comes back unchanged or lossy.
//! Notes: The replacement table covers Portuguese accents and cedilla only.

use serde_json::Value;

const REPLACEMENT_CHAR: char = '\u{fffd}';

// UTF-8 bytes of each accented letter, read back through Windows-1252.
const KNOWN_BROKEN: [(&str, &str); 14] = [
    ("\u{c3}\u{a1}", "á"),
    ("\u{c3}\u{a9}", "é"),
    ("\u{c3}\u{ad}", "í"),
    ("\u{c3}\u{b3}", "ó"),
    ("\u{c3}\u{ba}", "ú"),
    ("\u{c3}\u{a3}", "ã"),
    ("\u{c3}\u{b5}", "õ"),
    ("\u{c3}\u{a2}", "â"),
    ("\u{c3}\u{aa}", "ê"),
    ("\u{c3}\u{b4}", "ô"),
    ("\u{c3}\u{a7}", "ç"),
    ("\u{c3}\u{2021}", "Ç"),
    ("\u{c3}\u{20ac}", "À"),
    ("\u{c3}\u{192}", "Ã"),
];

/// True when `text` carries `Ã?`/`Â?` pairs or replacement characters.
pub fn looks_corrupted(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            REPLACEMENT_CHAR => return true,
            'Ã' | 'Â' => {
                if chars.peek().is_some_and(|next| *next != '\n') {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Lower is better: one point per `Ã`, `Â`, and U+FFFD.
pub fn corruption_score(text: &str) -> usize {
    text.chars()
        .filter(|&ch| matches!(ch, 'Ã' | 'Â' | REPLACEMENT_CHAR))
        .count()
}

/// Treat each code point as a Latin-1 byte (low 8 bits) and decode those bytes as UTF-8.
pub fn reinterpret_as_utf8(text: &str) -> String {
    let bytes: Vec<u8> = text.chars().map(|ch| (u32::from(ch) & 0xff) as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn correct(text: &str) -> String {
    let mut result = text.to_string();
    for (broken, fixed) in KNOWN_BROKEN {
        if result.contains(broken) {
            result = result.replace(broken, fixed);
        }
    }
    result
}

/// Apply `correct` to every string value in a JSON tree. Object keys are kept as-is.
pub fn fix_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(correct(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(fix_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, fix_value(item)))
                .collect(),
        ),
        other => other,
    }
}
