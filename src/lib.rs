//! Purpose: Library crate behind the `framepass` CLI: a tolerant JSON-in-URL transport codec.
//! Exports: `core` (codec, errors), `api` (widget-facing surface), `notice`.
//! Role: Encode JSON payloads into URL tokens and read them back after lossy transport.
//! Invariants: The codec is pure and synchronous; only `api::channel` is async.
//! Invariants: Every JSON parse goes through the internal `json` module.
pub mod api;
pub mod core;
pub(crate) mod json;
pub mod notice;
