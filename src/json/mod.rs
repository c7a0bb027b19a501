//! Purpose: Internal JSON parsing boundary shared by every decode path.
//! Exports: `parse` module with decode helpers used by the codec, config, and remote fetch.
//! Role: Single seam for parser details so callsites avoid ad hoc decode logic.
//! Invariants: Candidate parsing goes through this module, never `serde_json` directly.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
