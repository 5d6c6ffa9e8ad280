//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `index.rs` — build-index / refresh-index.
//! - `inspect.rs` — inspect / inspect-batch.
//! - `steer.rs` — gen-steer sidecar generation.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - A FAIL verdict is data, not an error: exit status stays 0.

pub mod index;
pub mod inspect;
pub mod steer;

pub use index::handle_index_commands;
pub use inspect::handle_inspect_commands;
pub use steer::handle_steer_command;
