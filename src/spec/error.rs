//! Spec model errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::version::SemanticVersion;

/// One broken invariant, addressed by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Field path, e.g. `identity.core_traits[2]`.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Errors raised by validation, migration checks, versioning, and the
/// document boundary.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec breaks one or more invariants. Every violation is listed.
    #[error("Schema violation ({} problem(s)): {}", .violations.len(), join(.violations))]
    SchemaViolation { violations: Vec<Violation> },

    /// Legacy content could not be traced into the migrated spec.
    #[error("Migration incomplete, dropped field(s): {}", .fields.join(", "))]
    MigrationIncomplete { fields: Vec<String> },

    /// The caller's version is not the current head for this spec.
    #[error("Version conflict on '{spec_id}': caller assumed {assumed}, head is {head}")]
    ImmutableVersionConflict {
        spec_id: String,
        assumed: SemanticVersion,
        head: SemanticVersion,
    },

    /// The patch number cannot be incremented any further.
    #[error("Version exhausted on '{spec_id}': no patch version after {version}")]
    VersionExhausted {
        spec_id: String,
        version: SemanticVersion,
    },

    /// The document's schema-version marker is missing or unrecognised.
    #[error("Unknown schema version marker: {0}")]
    UnknownSchema(String),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SpecError {
    /// Violations carried by a `SchemaViolation`, empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            SpecError::SchemaViolation { violations } => violations,
            _ => &[],
        }
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_lists_every_problem() {
        let err = SpecError::SchemaViolation {
            violations: vec![
                Violation::new("identity.name", "must not be empty"),
                Violation::new("values.values", "weights must be unique"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 problem(s)"));
        assert!(msg.contains("identity.name: must not be empty"));
        assert!(msg.contains("values.values: weights must be unique"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_version_conflict_message() {
        let err = SpecError::ImmutableVersionConflict {
            spec_id: "p-1".into(),
            assumed: SemanticVersion::new(1, 0, 2),
            head: SemanticVersion::new(1, 0, 3),
        };
        assert_eq!(
            err.to_string(),
            "Version conflict on 'p-1': caller assumed 1.0.2, head is 1.0.3"
        );
        assert!(err.violations().is_empty());
    }
}
