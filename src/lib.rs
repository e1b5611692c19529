//! # Persona Engine
//!
//! Versioned five-layer persona specifications and a deterministic decision
//! engine that evaluates queries against them.
//!
//! A persona spec describes an agent through five layers (identity,
//! cognitive heuristics, value hierarchy, communication patterns, memory
//! anchors) plus ordered safety boundaries.  Legacy single-description specs
//! are migrated into the layered model; every decision comes back as a
//! structured, auditable record.

pub mod cli;
pub mod consistency;
pub mod decision;
pub mod migration;
pub mod spec;
pub mod store;

// Re-exports
pub use decision::{decide, DecisionConfig, DecisionEngine, QueryContext, StructuredDecisionOutput};
pub use migration::{migrate, validate_migration, MigrationResult};
pub use spec::{
    bump_patch, is_current_schema, validate, PersonaSpec, PersonaSpecV1, PersonaSpecV2, SpecError,
};
pub use store::{InMemorySpecStore, SpecStore, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
