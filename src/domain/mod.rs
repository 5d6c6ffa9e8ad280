//! Shared data model layer (structs/constants only).
//!
//! ## Files
//! - `models.rs` — validation result and its nested info records.
//! - `rulebook.rs` — caller-supplied competition thresholds.
//! - `constants.rs` — file sets, key alias tables, tolerances.
//!
//! Domain types are data-only: no filesystem side effects.
//! Changes here alter `inspect --json` output; keep
//! `docs/contracts/validation-result.schema.json` in sync.

pub mod constants;
pub mod models;
pub mod rulebook;
