//! Spec model: the versioned five-layer persona specification.
//!
//! # Architecture
//!
//! ```text
//! PersonaSpec (tagged by schema_version)
//!   ├─ V1: PersonaSpecV1   single free-text description (legacy)
//!   └─ V2: PersonaSpecV2   identity · heuristics · values · communication · memory
//!                          + ordered safety boundaries
//!   ↓  validate()          every broken invariant, at once
//!   ↓  bump_patch()/revise()   new immutable version, CAS against the store head
//! ```

pub mod error;
pub mod legacy;
pub mod model;
pub mod validation;
pub mod version;

// Re-exports
pub use error::{SpecError, Violation};
pub use legacy::{PersonaSpec, PersonaSpecV1};
pub use model::{
    Channel, CognitiveHeuristic, CommunicationPatterns, ConflictResolution, IdentityFrame, Layer,
    MemoryAnchor, PersonaSpecV2, ResponseTemplate, SafetyBoundary, SafetyOutcome,
    TriggerCondition, ValueConflictRule, ValueHierarchy, ValueItem,
};
pub use validation::{
    is_current_schema, validate, validate_document, validate_legacy, ValidationResult,
};
pub use version::{
    bump_patch, bump_patch_at, ensure_head, SchemaVersion, SemanticVersion, VersionToken,
};
