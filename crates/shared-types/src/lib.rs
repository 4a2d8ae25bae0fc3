//! # Shared Types Crate
//!
//! Domain entities shared by the control plane crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `System`, `Instance` and `PatchOperation`
//!   are defined once here and used by every crate.
//! - **Wire Compatibility**: every type round-trips through `serde_json`
//!   using the field names of the HTTP layer.

pub mod entities;
pub mod errors;
pub mod patch;
pub mod query;

pub use entities::*;
pub use errors::*;
pub use patch::{PatchKind, PatchOperation};
pub use query::SearchParams;
