//! Service layer containing the inspection engine and its side-effect helpers.
//!
//! ## Service map
//! - `validator/` — orchestrates one inspection into a `ValidationResult`.
//! - `anti_cheat.rs` — AC0xx advisory diagnostics registry.
//! - `fingerprint.rs` — physics fingerprints and exact/best-match selection.
//! - `reference_index.rs` — reference spec + fingerprint documents (build/save/load).
//! - `steering.rs` — kingpin geometry solver and steering angle resolution.
//! - `ini_diff.rs` — structured INI change classification.
//! - `extension.rs` — `extension/` file classification.
//! - `textures.rs` — PNG/JPEG header dimension probes.
//! - `hashing.rs` — SHA1 content identity and relative paths.
//! - `external.rs` — timeout-bounded external measurement commands.
//! - `policy.rs` — rulebook presets and TOML loading.
//! - `storage.rs` — index/sidecar writes and the inspection history log.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Parsers report missing files as `InspectError::NotFound`; services turn
//!   that into "unavailable", never into a fatal error.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod anti_cheat;
pub mod extension;
pub mod external;
pub mod fingerprint;
pub mod hashing;
pub mod ini_diff;
pub mod output;
pub mod policy;
pub mod reference_index;
pub mod steering;
pub mod storage;
pub mod textures;
pub mod validator;
