//! Purpose: Guess how a raw URL parameter was produced before decoding it.
//! Exports: `Strategy`, `Classified`, `classify_with`, `repair_spaces`.
//! Role: First stage of the multi-candidate decoder.
//! Invariants: Rules apply in a fixed order: prefix, bare base64, `%25`, `%`, plain.
//! Invariants: Heuristic only; short inputs can land on the wrong strategy.

use std::borrow::Cow;

use crate::core::bytes::is_base64_char;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    PrefixedBase64,
    BareBase64,
    PercentEncodedJson,
    DoublePercentEncodedJson,
    PlainJson,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PrefixedBase64 => "prefixed-base64",
            Strategy::BareBase64 => "bare-base64",
            Strategy::PercentEncodedJson => "percent-encoded-json",
            Strategy::DoublePercentEncodedJson => "double-percent-encoded-json",
            Strategy::PlainJson => "plain-json",
        }
    }

    pub fn is_base64(self) -> bool {
        matches!(self, Strategy::PrefixedBase64 | Strategy::BareBase64)
    }
}

/// A strategy plus the input it applies to (prefix stripped, spaces repaired).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classified<'a> {
    pub strategy: Strategy,
    pub body: Cow<'a, str>,
}

pub fn classify_with<'a>(raw: &'a str, prefix: &str, min_bare_len: usize) -> Classified<'a> {
    let repaired = repair_spaces(raw);

    if !prefix.is_empty() {
        if let Some(rest) = repaired.strip_prefix(prefix) {
            let body = match &repaired {
                Cow::Borrowed(_) => Cow::Borrowed(&raw[prefix.len()..]),
                Cow::Owned(_) => Cow::Owned(rest.to_string()),
            };
            return Classified {
                strategy: Strategy::PrefixedBase64,
                body,
            };
        }
    }

    if looks_like_bare_base64(&repaired) && repaired.chars().count() > min_bare_len {
        return Classified {
            strategy: Strategy::BareBase64,
            body: repaired,
        };
    }

    // Percent strategies decode the input as received, not the space-repaired copy.
    let strategy = if raw.contains("%25") {
        Strategy::DoublePercentEncodedJson
    } else if raw.contains('%') {
        Strategy::PercentEncodedJson
    } else {
        Strategy::PlainJson
    };
    Classified {
        strategy,
        body: Cow::Borrowed(raw),
    }
}

/// Undo `+` → space substitution when the input otherwise looks like base64.
pub fn repair_spaces(raw: &str) -> Cow<'_, str> {
    let body = raw.trim_end_matches('=');
    let has_space = body.contains(' ');
    if has_space && body.chars().all(|ch| ch == ' ' || is_base64_char(ch)) {
        return Cow::Owned(raw.replace(' ', "+"));
    }
    Cow::Borrowed(raw)
}

fn looks_like_bare_base64(input: &str) -> bool {
    let body = input.trim_end_matches('=');
    !body.is_empty() && body.chars().all(is_base64_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "b64_";
    const MIN: usize = 16;

    fn strategy(raw: &str) -> Strategy {
        classify_with(raw, PREFIX, MIN).strategy
    }

    #[test]
    fn prefix_wins_and_is_stripped() {
        let classified = classify_with("b64_W3sifQ", PREFIX, MIN);
        assert_eq!(classified.strategy, Strategy::PrefixedBase64);
        assert_eq!(classified.body, "W3sifQ");
    }

    #[test]
    fn long_digit_run_is_bare_base64_but_short_one_is_json() {
        assert_eq!(strategy("1234567890123456789"), Strategy::BareBase64);
        assert_eq!(strategy("5"), Strategy::PlainJson);
        assert_eq!(strategy("1234567890123456"), Strategy::PlainJson);
    }

    #[test]
    fn percent_markers_pick_decode_depth() {
        assert_eq!(strategy("%5B%7B%22Q%22%3A1%7D%5D"), Strategy::PercentEncodedJson);
        assert_eq!(
            strategy("%255B%257B%2522Q%2522%253A1%257D%255D"),
            Strategy::DoublePercentEncodedJson
        );
    }

    #[test]
    fn json_punctuation_is_plain() {
        assert_eq!(strategy(r#"[{"Q":"a","A":"b","T":"c"}]"#), Strategy::PlainJson);
    }

    #[test]
    fn spaces_from_plus_substitution_are_repaired() {
        let classified = classify_with("b64_W3si USI6 Ik=", PREFIX, MIN);
        assert_eq!(classified.strategy, Strategy::PrefixedBase64);
        assert_eq!(classified.body, "W3si+USI6+Ik=");

        let bare = classify_with("eyJhIjoi w6EifQ abcdefgh==", PREFIX, MIN);
        assert_eq!(bare.strategy, Strategy::BareBase64);
        assert_eq!(bare.body, "eyJhIjoi+w6EifQ+abcdefgh==");
    }

    #[test]
    fn spaces_inside_json_are_left_alone() {
        assert_eq!(repair_spaces(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert!(matches!(repair_spaces("abc"), Cow::Borrowed("abc")));
    }

    #[test]
    fn empty_prefix_disables_prefix_rule() {
        let classified = classify_with("b64_abcdefghijklmnop", "", MIN);
        assert_eq!(classified.strategy, Strategy::BareBase64);
    }
}
