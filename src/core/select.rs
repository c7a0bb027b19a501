//! Purpose: Decode raw URL parameters back into JSON values.
//! Exports: `Candidate`, `CandidateSource`, `Explanation`, `decode_with`, `explain_with`,
//! `decode_strict_with`, `decode_strict_robust_with`, `percent_decode`.
//! Role: Receiving side of the codec; tolerant path for unknown producers, strict path for ours.
//! Invariants: The tolerant path returns the least-corrupted candidate that parses, not the first.
//! Invariants: Candidates live only for one call; nothing is cached between calls.
//! Invariants: Never panics on untrusted input; failures carry the strategy that was tried.

use serde_json::Value;

use crate::core::bytes::{base64_to_bytes, bytes_to_text, latin1_to_text, normalize_base64};
use crate::core::classify::{Strategy, classify_with};
use crate::core::error::{Error, ErrorKind};
use crate::core::mojibake::{correct, corruption_score, looks_corrupted, reinterpret_as_utf8};
use crate::json::parse;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CandidateSource {
    Utf8,
    Latin1,
    Utf8Reinterpreted,
    Utf8Corrected,
    Latin1Reinterpreted,
    Latin1Corrected,
    DoublePercentDecoded,
    PercentDecoded,
    Raw,
}

impl CandidateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateSource::Utf8 => "utf8",
            CandidateSource::Latin1 => "latin1",
            CandidateSource::Utf8Reinterpreted => "utf8-reinterpreted",
            CandidateSource::Utf8Corrected => "utf8-corrected",
            CandidateSource::Latin1Reinterpreted => "latin1-reinterpreted",
            CandidateSource::Latin1Corrected => "latin1-corrected",
            CandidateSource::DoublePercentDecoded => "double-percent-decoded",
            CandidateSource::PercentDecoded => "percent-decoded",
            CandidateSource::Raw => "raw",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub source: CandidateSource,
    pub score: usize,
}

impl Candidate {
    fn new(text: String, source: CandidateSource) -> Self {
        let score = corruption_score(&text);
        Self {
            text,
            source,
            score,
        }
    }
}

/// What the tolerant decoder saw and tried, in the order it tried it.
#[derive(Clone, Debug, PartialEq)]
pub struct Explanation {
    pub strategy: Strategy,
    pub attempts: Vec<(Candidate, bool)>,
    pub value: Option<Value>,
}

pub fn decode_with(raw: &str, prefix: &str, min_bare_len: usize) -> Result<Value, Error> {
    let (strategy, candidates) = ranked_candidates(raw, prefix, min_bare_len)?;
    let total = candidates.len();
    for candidate in candidates {
        match parse::from_str::<Value>(&candidate.text) {
            Ok(value) => {
                tracing::debug!(
                    strategy = strategy.as_str(),
                    source = candidate.source.as_str(),
                    score = candidate.score,
                    "decode candidate accepted"
                );
                return Ok(value);
            }
            Err(err) => {
                tracing::debug!(
                    strategy = strategy.as_str(),
                    source = candidate.source.as_str(),
                    score = candidate.score,
                    hint = %parse::hint_for_error(&err, "decode.candidate"),
                    "decode candidate rejected"
                );
            }
        }
    }
    Err(Error::new(ErrorKind::NoValidCandidate)
        .with_message(format!("none of {total} decode candidates parsed as JSON"))
        .with_strategy(strategy.as_str()))
}

pub fn explain_with(raw: &str, prefix: &str, min_bare_len: usize) -> Result<Explanation, Error> {
    let (strategy, candidates) = ranked_candidates(raw, prefix, min_bare_len)?;
    let mut value = None;
    let mut attempts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let parsed = if value.is_none() {
            parse::from_str::<Value>(&candidate.text).ok()
        } else {
            None
        };
        let parses = parsed.is_some();
        if parses {
            value = parsed;
        }
        attempts.push((candidate, parses));
    }
    Ok(Explanation {
        strategy,
        attempts,
        value,
    })
}

/// Unambiguous path for tokens produced by this codec's own encoder.
pub fn decode_strict_with(token: &str, prefix: &str) -> Result<Value, Error> {
    let body = match prefix {
        "" => token,
        prefix => token.strip_prefix(prefix).unwrap_or(token),
    };
    let normalized = normalize_base64(body)?;
    let bytes = base64_to_bytes(&normalized)?;
    let text = bytes_to_text(&bytes, false)?;
    parse::from_str::<Value>(&text).map_err(|err| {
        Error::new(ErrorKind::NoValidCandidate)
            .with_message("token payload is not valid JSON")
            .with_hint(parse::hint_for_error(&err, "decode.strict"))
            .with_source(err)
    })
}

/// Strict decode retried over the usual transport manglings of one token.
pub fn decode_strict_robust_with(raw: &str, prefix: &str) -> Result<Value, Error> {
    let mut attempts = vec![raw.to_string()];
    if raw.contains('%') {
        if let Some(once) = percent_decode(raw) {
            attempts.push(once);
        }
    }
    if raw.contains("%25") {
        if let Some(twice) = percent_decode(raw).and_then(|once| percent_decode(&once)) {
            attempts.push(twice);
        }
    }
    if raw.contains(' ') {
        attempts.push(raw.replace(' ', "+"));
    }

    let mut last_err = None;
    for attempt in &attempts {
        match decode_strict_with(attempt, prefix) {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(error = %err, "strict decode attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::new(ErrorKind::NoValidCandidate)))
}

/// `decodeURIComponent` equivalent; `None` when the result is not UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    urlencoding::decode(input).ok().map(|text| text.into_owned())
}

fn ranked_candidates(
    raw: &str,
    prefix: &str,
    min_bare_len: usize,
) -> Result<(Strategy, Vec<Candidate>), Error> {
    let classified = classify_with(raw, prefix, min_bare_len);
    let strategy = classified.strategy;

    let mut candidates = if strategy.is_base64() {
        let normalized =
            normalize_base64(&classified.body).map_err(|err| err.with_strategy(strategy.as_str()))?;
        let bytes =
            base64_to_bytes(&normalized).map_err(|err| err.with_strategy(strategy.as_str()))?;
        byte_candidates(&bytes)
    } else {
        text_candidates(&classified.body, strategy)
    };

    // Stable: equal scores keep generation order.
    candidates.sort_by_key(|candidate| candidate.score);
    Ok((strategy, candidates))
}

fn byte_candidates(bytes: &[u8]) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(6);
    let utf8 = String::from_utf8_lossy(bytes).into_owned();
    let latin1 = latin1_to_text(bytes);

    let utf8_repairs = repairs_for(&utf8);
    let latin1_repairs = repairs_for(&latin1);

    push_unique(&mut candidates, Candidate::new(utf8, CandidateSource::Utf8));
    push_unique(&mut candidates, Candidate::new(latin1, CandidateSource::Latin1));
    if let Some((reinterpreted, corrected)) = utf8_repairs {
        push_unique(
            &mut candidates,
            Candidate::new(reinterpreted, CandidateSource::Utf8Reinterpreted),
        );
        push_unique(
            &mut candidates,
            Candidate::new(corrected, CandidateSource::Utf8Corrected),
        );
    }
    if let Some((reinterpreted, corrected)) = latin1_repairs {
        push_unique(
            &mut candidates,
            Candidate::new(reinterpreted, CandidateSource::Latin1Reinterpreted),
        );
        push_unique(
            &mut candidates,
            Candidate::new(corrected, CandidateSource::Latin1Corrected),
        );
    }
    candidates
}

fn repairs_for(text: &str) -> Option<(String, String)> {
    looks_corrupted(text).then(|| (reinterpret_as_utf8(text), correct(text)))
}

fn text_candidates(body: &str, strategy: Strategy) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(3);
    let once = match strategy {
        Strategy::PercentEncodedJson | Strategy::DoublePercentEncodedJson => percent_decode(body),
        _ => None,
    };
    if strategy == Strategy::DoublePercentEncodedJson {
        if let Some(twice) = once.as_deref().and_then(percent_decode) {
            push_unique(
                &mut candidates,
                Candidate::new(twice, CandidateSource::DoublePercentDecoded),
            );
        }
    }
    if let Some(once) = once {
        push_unique(
            &mut candidates,
            Candidate::new(once, CandidateSource::PercentDecoded),
        );
    }
    push_unique(
        &mut candidates,
        Candidate::new(body.to_string(), CandidateSource::Raw),
    );
    candidates
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if candidates.iter().all(|existing| existing.text != candidate.text) {
        candidates.push(candidate);
    }
}
