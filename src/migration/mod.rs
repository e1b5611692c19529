//! Migration engine: legacy (v1) specs into the five-layer (v2) model.
//!
//! The mapping is deterministic:
//!
//! | v1 field         | v2 home                                        | kind     |
//! |------------------|------------------------------------------------|----------|
//! | `spec_id`, `owner_id`, `name`, `created_at` | same / `identity.name` | copied   |
//! | `tone`           | `communication.tone`                           | copied   |
//! | `description`    | 1st sentence → `identity.self_description`, `identity.role` | inferred |
//! |                  | later sentences → `identity.core_traits`       | inferred |
//! | `specialization` | `values.values` via [`specialization`] table   | inferred |
//!
//! Layers with no v1 analogue (heuristics, conflict rules, templates, memory
//! anchors, safety boundaries) are left empty and listed for manual
//! completion.  Nothing is invented from free text.

pub mod specialization;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::spec::error::{SpecError, Violation};
use crate::spec::legacy::{PersonaSpec, PersonaSpecV1};
use crate::spec::model::{
    CommunicationPatterns, IdentityFrame, PersonaSpecV2, ValueHierarchy,
};
use crate::spec::validation::{self, ValidationResult};
use crate::spec::version::{SchemaVersion, SemanticVersion};

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").unwrap());

static ROLE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:i am|i'm|is|as)\s+(?:an?|the)\s+([\w\- ]+?)(?:\s+(?:who|that|with|and|for|in|at|to)\b|[,;:]|$)",
    )
    .unwrap()
});

/// Where one v2 field came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// v2 field path.
    pub target: String,
    /// v1 field (or lookup) it was derived from.
    pub source: String,
}

impl FieldMapping {
    fn new(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            source: source.to_string(),
        }
    }
}

/// Outcome of [`migrate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationResult {
    /// The produced (or, for v2 input, unchanged) spec.
    pub spec: PersonaSpecV2,
    /// False when the input was already v2.
    pub migrated: bool,
    /// Fields copied verbatim.
    pub copied: Vec<FieldMapping>,
    /// Fields derived heuristically.
    pub inferred: Vec<FieldMapping>,
    /// v2 fields with no v1 analogue, left for manual completion.
    pub empty_fields: Vec<String>,
    /// v1 fields that could not be traced into the result.
    pub incomplete_fields: Vec<String>,
}

impl MigrationResult {
    fn unchanged(spec: PersonaSpecV2) -> Self {
        Self {
            spec,
            migrated: false,
            copied: Vec::new(),
            inferred: Vec::new(),
            empty_fields: Vec::new(),
            incomplete_fields: Vec::new(),
        }
    }

    /// True when no legacy content was lost.
    pub fn is_complete(&self) -> bool {
        self.incomplete_fields.is_empty()
    }
}

/// Migrate a document to v2, stamping the current time.
pub fn migrate(spec: &PersonaSpec) -> Result<MigrationResult, SpecError> {
    migrate_at(spec, Utc::now())
}

/// [`migrate`] with an explicit clock.
///
/// A v2 document is returned unchanged.  A v1 document must pass
/// [`validation::validate_legacy`]; the produced spec always passes
/// [`validation::validate`].  Any legacy content the mapping failed to carry
/// over is reported in [`MigrationResult::incomplete_fields`] rather than
/// dropped silently.
pub fn migrate_at(spec: &PersonaSpec, now: DateTime<Utc>) -> Result<MigrationResult, SpecError> {
    let legacy = match spec {
        PersonaSpec::V2(current) if validation::is_current_schema(spec) => {
            log::debug!("spec '{}' already v2, not migrating", current.spec_id);
            return Ok(MigrationResult::unchanged(current.clone()));
        }
        PersonaSpec::V2(current) => {
            log::warn!(
                "spec '{}' has the five-layer shape but marker {}",
                current.spec_id,
                current.schema_version
            );
            return Err(SpecError::SchemaViolation {
                violations: vec![Violation::new("schema_version", "must be v2")],
            });
        }
        PersonaSpec::V1(legacy) => legacy,
    };
    validation::validate_legacy(legacy)?;

    let mut copied = vec![
        FieldMapping::new("spec_id", "spec_id"),
        FieldMapping::new("owner_id", "owner_id"),
        FieldMapping::new("identity.name", "name"),
        FieldMapping::new("created_at", "created_at"),
    ];
    let mut inferred = Vec::new();
    let mut empty_fields = Vec::new();

    // --- Identity ---
    let sentences = split_sentences(&legacy.description);
    let profile = specialization::profile_for(legacy.specialization.as_deref());
    let (first, rest) = match sentences.split_first() {
        Some((first, rest)) => (first.clone(), rest.to_vec()),
        None => (legacy.description.trim().to_string(), Vec::new()),
    };

    let role = match extract_role(&first) {
        Some(role) => role,
        None => match legacy.specialization.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => first.clone(),
        },
    };
    inferred.push(FieldMapping::new("identity.role", "description"));
    inferred.push(FieldMapping::new("identity.self_description", "description"));

    let core_traits = if rest.is_empty() {
        inferred.push(FieldMapping::new(
            "identity.core_traits",
            &format!("specialization_table:{}", profile.key),
        ));
        profile.traits.iter().map(|t| t.to_string()).collect()
    } else {
        inferred.push(FieldMapping::new("identity.core_traits", "description"));
        rest
    };

    let identity = IdentityFrame {
        name: legacy.name.trim().to_string(),
        role,
        core_traits,
        self_description: first,
    };

    // --- Values ---
    inferred.push(FieldMapping::new(
        "values.values",
        &format!("specialization_table:{}", profile.key),
    ));
    let values = ValueHierarchy {
        values: profile.value_items(),
        conflict_rules: Vec::new(),
    };
    empty_fields.push("values.conflict_rules".to_string());

    // --- Communication ---
    let tone = legacy.tone_descriptors();
    if tone.is_empty() {
        empty_fields.push("communication.tone".to_string());
    } else {
        copied.push(FieldMapping::new("communication.tone", "tone"));
    }
    empty_fields.push("communication.templates".to_string());

    // --- No analogue ---
    empty_fields.push("heuristics".to_string());
    empty_fields.push("memory_anchors".to_string());
    empty_fields.push("safety_boundaries".to_string());

    let base_version = legacy.version.unwrap_or(SemanticVersion::INITIAL);
    if legacy.version.is_some() {
        copied.push(FieldMapping::new("previous_version", "version"));
    }

    let v2 = PersonaSpecV2 {
        spec_id: legacy.spec_id.clone(),
        owner_id: legacy.owner_id.clone(),
        schema_version: SchemaVersion::V2,
        version: base_version.successor(&legacy.spec_id)?,
        previous_version: Some(base_version),
        created_at: legacy.created_at,
        updated_at: now.max(legacy.updated_at),
        identity,
        heuristics: Vec::new(),
        values,
        communication: CommunicationPatterns {
            tone,
            templates: Vec::new(),
        },
        memory_anchors: Vec::new(),
        safety_boundaries: Vec::new(),
    };
    validation::validate(&v2)?;

    let incomplete_fields = match validate_migration(legacy, &v2) {
        Ok(()) => Vec::new(),
        Err(SpecError::MigrationIncomplete { fields }) => fields,
        Err(other) => return Err(other),
    };
    if incomplete_fields.is_empty() {
        log::info!(
            "migrated '{}' v1 -> {} ({} inferred, {} left empty)",
            v2.spec_id,
            v2.version,
            inferred.len(),
            empty_fields.len()
        );
    } else {
        log::warn!(
            "migrated '{}' with dropped field(s): {}",
            v2.spec_id,
            incomplete_fields.join(", ")
        );
    }

    Ok(MigrationResult {
        spec: v2,
        migrated: true,
        copied,
        inferred,
        empty_fields,
        incomplete_fields,
    })
}

/// Check that every non-empty v1 field is traceable to a non-empty v2 field.
///
/// Fails with [`SpecError::MigrationIncomplete`] naming every dropped field.
pub fn validate_migration(v1: &PersonaSpecV1, v2: &PersonaSpecV2) -> ValidationResult {
    let mut dropped = Vec::new();

    if !v1.spec_id.trim().is_empty() && v2.spec_id != v1.spec_id {
        dropped.push("spec_id".to_string());
    }
    if !v1.owner_id.trim().is_empty() && v2.owner_id != v1.owner_id {
        dropped.push("owner_id".to_string());
    }
    if !v1.name.trim().is_empty() && normalize(&v2.identity.name) != normalize(&v1.name) {
        dropped.push("name".to_string());
    }

    // Every sentence must survive as the self-description or as a trait.
    let carried: Vec<String> = std::iter::once(&v2.identity.self_description)
        .chain(v2.identity.core_traits.iter())
        .map(|s| normalize(s))
        .collect();
    for sentence in split_sentences(&v1.description) {
        if !carried.contains(&normalize(&sentence)) {
            dropped.push("description".to_string());
            break;
        }
    }

    let has_specialization = v1
        .specialization
        .as_deref()
        .map_or(false, |s| !s.trim().is_empty());
    if has_specialization && v2.values.values.is_empty() {
        dropped.push("specialization".to_string());
    }

    let tone: Vec<String> = v2.communication.tone.iter().map(|t| normalize(t)).collect();
    if v1
        .tone_descriptors()
        .iter()
        .any(|t| !tone.contains(&normalize(t)))
    {
        dropped.push("tone".to_string());
    }

    if dropped.is_empty() {
        Ok(())
    } else {
        Err(SpecError::MigrationIncomplete { fields: dropped })
    }
}

/// Split free text into trimmed sentences without terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_BREAK
        .split(text)
        .map(|s| s.trim().trim_end_matches(|c: char| matches!(c, '.' | '!' | '?')))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// The noun phrase after "I am a", "is an", "as the", ... if present.
fn extract_role(sentence: &str) -> Option<String> {
    ROLE_PHRASE
        .captures(sentence)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|r| !r.is_empty())
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::tests::{fixed_time, sample_spec};
    use crate::spec::validation::validate;

    fn legacy() -> PersonaSpecV1 {
        PersonaSpecV1::new(
            "legacy-1",
            "tenant-a",
            "Mara",
            "I am a career coach who helps mid-career engineers. Pragmatic and direct. \
             Believes small experiments beat big plans!",
            fixed_time(),
        )
        .with_specialization("Coaching")
        .with_tone("warm, concise")
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("First one. Second!  Third?\nFourth"),
            vec!["First one", "Second", "Third", "Fourth"]
        );
        assert_eq!(split_sentences("Version 2.5 is out."), vec!["Version 2.5 is out"]);
        assert!(split_sentences("  ").is_empty());
    }

    #[test]
    fn test_extract_role() {
        assert_eq!(
            extract_role("I am a career coach who helps engineers").as_deref(),
            Some("career coach")
        );
        assert_eq!(
            extract_role("Sam is an experienced tax advisor").as_deref(),
            Some("experienced tax advisor")
        );
        assert_eq!(extract_role("Helping people since 2010"), None);
    }

    #[test]
    fn test_migrate_maps_description_and_specialization() {
        let result = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        assert!(result.migrated);
        assert!(result.is_complete());

        let spec = &result.spec;
        assert_eq!(spec.schema_version, SchemaVersion::V2);
        assert_eq!(spec.identity.role, "career coach");
        assert_eq!(
            spec.identity.self_description,
            "I am a career coach who helps mid-career engineers"
        );
        assert_eq!(
            spec.identity.core_traits,
            vec!["Pragmatic and direct", "Believes small experiments beat big plans"]
        );
        assert_eq!(spec.values.values[0].name, "growth");
        assert_eq!(spec.communication.tone, vec!["warm", "concise"]);
        assert!(validate(spec).is_ok());
    }

    #[test]
    fn test_no_analogue_fields_left_empty() {
        let result = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        let spec = &result.spec;
        assert!(spec.heuristics.is_empty());
        assert!(spec.memory_anchors.is_empty());
        assert!(spec.safety_boundaries.is_empty());
        assert!(spec.communication.templates.is_empty());
        assert!(spec.values.conflict_rules.is_empty());
        for field in [
            "heuristics",
            "memory_anchors",
            "safety_boundaries",
            "communication.templates",
            "values.conflict_rules",
        ] {
            assert!(result.empty_fields.iter().any(|f| f == field), "{field}");
        }
    }

    #[test]
    fn test_provenance_lists() {
        let result = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        let copied: Vec<&str> = result.copied.iter().map(|m| m.target.as_str()).collect();
        assert!(copied.contains(&"identity.name"));
        assert!(copied.contains(&"communication.tone"));
        let inferred: Vec<(&str, &str)> = result
            .inferred
            .iter()
            .map(|m| (m.target.as_str(), m.source.as_str()))
            .collect();
        assert!(inferred.contains(&("identity.core_traits", "description")));
        assert!(inferred.contains(&("values.values", "specialization_table:coaching")));
    }

    #[test]
    fn test_single_sentence_uses_table_traits() {
        let v1 = PersonaSpecV1::new("l2", "t", "Ravi", "Helping households budget.", fixed_time())
            .with_specialization("finance");
        let result = migrate_at(&PersonaSpec::V1(v1), fixed_time()).unwrap();
        assert_eq!(result.spec.identity.core_traits, vec!["careful", "numerate"]);
        // No role phrase, so the specialization names the role.
        assert_eq!(result.spec.identity.role, "finance");
        assert!(result
            .inferred
            .iter()
            .any(|m| m.source == "specialization_table:finance"));
        assert!(result.is_complete());
    }

    #[test]
    fn test_absent_specialization_gets_generic_values() {
        let v1 = PersonaSpecV1::new("l3", "t", "Ana", "A friendly guide. Curious.", fixed_time());
        let result = migrate_at(&PersonaSpec::V1(v1), fixed_time()).unwrap();
        let names: Vec<&str> = result.spec.values.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["honesty", "helpfulness", "respect", "clarity"]);
        assert_eq!(result.spec.identity.role, "A friendly guide");
        assert!(result.empty_fields.iter().any(|f| f == "communication.tone"));
    }

    #[test]
    fn test_version_lineage() {
        let mut v1 = legacy();
        v1.version = Some(SemanticVersion::new(1, 3, 4));
        let result = migrate_at(&PersonaSpec::V1(v1), fixed_time()).unwrap();
        assert_eq!(result.spec.version, SemanticVersion::new(1, 3, 5));
        assert_eq!(result.spec.previous_version, Some(SemanticVersion::new(1, 3, 4)));
    }

    #[test]
    fn test_exhausted_legacy_version_is_an_error() {
        let mut v1 = legacy();
        v1.version = Some(SemanticVersion::new(1, 0, u32::MAX));
        match migrate_at(&PersonaSpec::V1(v1), fixed_time()) {
            Err(SpecError::VersionExhausted { spec_id, version }) => {
                assert_eq!(spec_id, "legacy-1");
                assert_eq!(version.patch, u32::MAX);
            }
            other => panic!("expected VersionExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_five_layer_shape_with_v1_marker_is_rejected() {
        let mut spec = sample_spec();
        spec.schema_version = SchemaVersion::V1;
        let doc = PersonaSpec::V2(spec);
        assert!(!validation::is_current_schema(&doc));
        let err = migrate_at(&doc, fixed_time()).unwrap_err();
        assert_eq!(err.violations(), &[Violation::new("schema_version", "must be v2")]);
    }

    #[test]
    fn test_control_character_in_tone_names_legacy_field() {
        let v1 = legacy().with_tone("warm, lou\u{7}d");
        let err = migrate_at(&PersonaSpec::V1(v1), fixed_time()).unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["tone[1]"]);
    }

    #[test]
    fn test_migrating_v2_is_a_no_op() {
        let spec = sample_spec();
        let result = migrate(&PersonaSpec::V2(spec.clone())).unwrap();
        assert!(!result.migrated);
        assert_eq!(result.spec, spec);
        assert!(result.copied.is_empty() && result.inferred.is_empty());

        let once = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        let twice = migrate_at(&PersonaSpec::V2(once.spec.clone()), fixed_time()).unwrap();
        assert_eq!(once.spec, twice.spec);
    }

    #[test]
    fn test_migration_is_deterministic() {
        let a = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        let b = migrate_at(&PersonaSpec::V1(legacy()), fixed_time()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_legacy_rejected() {
        let v1 = PersonaSpecV1::new("l4", "t", " ", "Something.", fixed_time());
        assert!(matches!(
            migrate(&PersonaSpec::V1(v1)),
            Err(SpecError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_round_trip_never_incomplete() {
        let docs = [
            legacy(),
            PersonaSpecV1::new("a", "t", "A", "Short.", fixed_time()),
            PersonaSpecV1::new("b", "t", "B", "I'm the night-shift nurse. Calm.\nKind.", fixed_time())
                .with_specialization("health")
                .with_tone("soft"),
            PersonaSpecV1::new("c", "t", "C", "Teaches maths! Loves puzzles? Yes.", fixed_time())
                .with_specialization("unknown-field"),
        ];
        for v1 in docs {
            let result = migrate_at(&PersonaSpec::V1(v1.clone()), fixed_time()).unwrap();
            assert!(validate_migration(&v1, &result.spec).is_ok(), "{}", v1.spec_id);
            assert!(result.is_complete());
        }
    }

    #[test]
    fn test_validate_migration_names_every_dropped_field() {
        let v1 = legacy();
        let mut v2 = migrate_at(&PersonaSpec::V1(v1.clone()), fixed_time()).unwrap().spec;
        v2.identity.core_traits.pop();
        v2.communication.tone.clear();
        v2.values.values.clear();

        match validate_migration(&v1, &v2) {
            Err(SpecError::MigrationIncomplete { fields }) => {
                assert_eq!(fields, vec!["description", "specialization", "tone"]);
            }
            other => panic!("expected MigrationIncomplete, got {other:?}"),
        }
    }
}
