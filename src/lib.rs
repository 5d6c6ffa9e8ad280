//! Vehicle-physics submission inspector.
//!
//! The engine decides whether a submitted car folder is physics-identical to
//! an approved reference, enforces a caller-supplied rulebook and attaches
//! advisory anti-cheat diagnostics. Everything ends up in one
//! [`domain::models::ValidationResult`].
//!
//! ```no_run
//! use car_inspector::domain::rulebook::RulebookConfig;
//! use car_inspector::services::reference_index::ReferenceIndex;
//! use car_inspector::services::validator;
//! use std::path::Path;
//!
//! let index = ReferenceIndex::load(Path::new("reference_index.json"))?;
//! let result = validator::validate(Path::new("cars/efvd_e92"), &index, &RulebookConfig::competition());
//! println!("{}", result.verdict());
//! # Ok::<(), car_inspector::error::InspectError>(())
//! ```

pub mod domain;
pub mod error;
pub mod ini;
pub mod lut;
pub mod services;
