//! Structural validation for persona specs.
//!
//! Unlike the fail-fast checks elsewhere in the crate, validation here walks
//! the whole spec and reports every broken invariant in one
//! [`SpecError::SchemaViolation`], so a caller can fix everything in one
//! round-trip.

use std::collections::HashSet;

use super::error::{SpecError, Violation};
use super::legacy::{PersonaSpec, PersonaSpecV1};
use super::model::{ConflictResolution, PersonaSpecV2, TriggerCondition};
use super::version::SchemaVersion;

/// Outcome of every validation entry point in this crate.
pub type ValidationResult = Result<(), SpecError>;

/// Longest accepted single text field.
const MAX_TEXT_LEN: usize = 4096;

/// Collects violations while walking a spec.
#[derive(Debug, Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(Violation::new(field, reason));
    }

    fn text(&mut self, field: impl Into<String>, value: &str) {
        let field = field.into();
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        } else if value.len() > MAX_TEXT_LEN {
            self.push(field, format!("exceeds {} bytes", MAX_TEXT_LEN));
        } else if value.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            self.push(field, "must not contain control characters");
        }
    }

    fn trigger(&mut self, field: &str, trigger: &TriggerCondition) {
        if trigger.is_empty() {
            self.push(field, "must declare at least one intent or keyword");
        }
        for (i, intent) in trigger.intents.iter().enumerate() {
            self.text(format!("{}.intents[{}]", field, i), intent);
        }
        for (i, keyword) in trigger.keywords.iter().enumerate() {
            self.text(format!("{}.keywords[{}]", field, i), keyword);
        }
    }

    fn finish(self) -> ValidationResult {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(SpecError::SchemaViolation { violations: self.0 })
        }
    }
}

/// True when the document carries the current (v2) schema marker.
pub fn is_current_schema(spec: &PersonaSpec) -> bool {
    spec.schema_version() == SchemaVersion::V2
}

/// Validate a document of either schema.
pub fn validate_document(spec: &PersonaSpec) -> ValidationResult {
    match spec {
        PersonaSpec::V1(v1) => validate_legacy(v1),
        PersonaSpec::V2(v2) => validate(v2),
    }
}

/// Check every invariant of a five-layer spec.
pub fn validate(spec: &PersonaSpecV2) -> ValidationResult {
    let mut v = Violations::default();

    // --- Metadata ---
    if spec.schema_version != SchemaVersion::V2 {
        v.push("schema_version", "must be v2");
    }
    v.text("spec_id", &spec.spec_id);
    v.text("owner_id", &spec.owner_id);
    if spec.updated_at < spec.created_at {
        v.push("updated_at", "must not precede created_at");
    }
    if let Some(prev) = spec.previous_version {
        if prev >= spec.version {
            v.push("previous_version", "must be older than version");
        }
    }

    // --- Identity ---
    let identity = &spec.identity;
    v.text("identity.name", &identity.name);
    v.text("identity.role", &identity.role);
    v.text("identity.self_description", &identity.self_description);
    if identity.core_traits.is_empty() {
        v.push("identity.core_traits", "must contain at least one trait");
    }
    for (i, t) in identity.core_traits.iter().enumerate() {
        v.text(format!("identity.core_traits[{}]", i), t);
    }

    // --- Heuristics ---
    let mut seen_heuristics: HashSet<(&TriggerCondition, &str)> = HashSet::new();
    for (i, h) in spec.heuristics.iter().enumerate() {
        let field = format!("heuristics[{}]", i);
        v.trigger(&format!("{}.trigger", field), &h.trigger);
        v.text(format!("{}.description", field), &h.description);
        if let Some(guidance) = &h.guidance {
            v.text(format!("{}.guidance", field), guidance);
        }
        if !seen_heuristics.insert((&h.trigger, h.description.as_str())) {
            v.push(field, "duplicate trigger and description pair");
        }
    }

    // --- Values ---
    let mut names: HashSet<&str> = HashSet::new();
    let mut weights: Vec<f64> = Vec::new();
    for (i, item) in spec.values.values.iter().enumerate() {
        let field = format!("values.values[{}]", i);
        v.text(format!("{}.name", field), &item.name);
        if !names.insert(item.name.as_str()) {
            v.push(format!("{}.name", field), format!("duplicate value '{}'", item.name));
        }
        if !item.weight.is_finite() {
            v.push(format!("{}.weight", field), "must be finite");
        } else if weights.contains(&item.weight) {
            v.push(
                format!("{}.weight", field),
                format!("weight {} is not unique", item.weight),
            );
        } else {
            weights.push(item.weight);
        }
        for (k, keyword) in item.keywords.iter().enumerate() {
            v.text(format!("{}.keywords[{}]", field, k), keyword);
        }
    }

    let mut rule_ids: HashSet<&str> = HashSet::new();
    for (i, rule) in spec.values.conflict_rules.iter().enumerate() {
        let field = format!("values.conflict_rules[{}]", i);
        v.text(format!("{}.id", field), &rule.id);
        if !rule_ids.insert(rule.id.as_str()) {
            v.push(format!("{}.id", field), format!("duplicate rule id '{}'", rule.id));
        }
        for (side, name) in [("left", &rule.left), ("right", &rule.right)] {
            if !names.contains(name.as_str()) {
                v.push(
                    format!("{}.{}", field, side),
                    format!("unknown value '{}'", name),
                );
            }
        }
        if rule.left == rule.right {
            v.push(field.clone(), "must reference two distinct values");
        }
        match &rule.resolution {
            ConflictResolution::Prefer { value } => {
                if value != &rule.left && value != &rule.right {
                    v.push(
                        format!("{}.resolution", field),
                        format!("winner '{}' is not part of the pair", value),
                    );
                }
            }
            ConflictResolution::Blend { guidance } => {
                v.text(format!("{}.resolution.guidance", field), guidance);
            }
        }
    }

    // --- Communication ---
    let mut situations: HashSet<&str> = HashSet::new();
    for (i, tone) in spec.communication.tone.iter().enumerate() {
        v.text(format!("communication.tone[{}]", i), tone);
    }
    for (i, t) in spec.communication.templates.iter().enumerate() {
        let field = format!("communication.templates[{}]", i);
        v.text(format!("{}.situation", field), &t.situation);
        v.text(format!("{}.template", field), &t.template);
        if !situations.insert(t.situation.as_str()) {
            v.push(
                format!("{}.situation", field),
                format!("duplicate template key '{}'", t.situation),
            );
        }
    }

    // --- Memory anchors ---
    let mut anchor_ids: HashSet<&str> = HashSet::new();
    for (i, a) in spec.memory_anchors.iter().enumerate() {
        let field = format!("memory_anchors[{}]", i);
        v.text(format!("{}.id", field), &a.id);
        if !anchor_ids.insert(a.id.as_str()) {
            v.push(format!("{}.id", field), format!("duplicate anchor id '{}'", a.id));
        }
        v.text(format!("{}.description", field), &a.description);
        if a.reinforces.is_empty() {
            v.push(format!("{}.reinforces", field), "must name at least one layer");
        }
        v.trigger(&format!("{}.condition", field), &a.condition);
    }

    // --- Safety boundaries ---
    let mut boundary_ids: HashSet<&str> = HashSet::new();
    for (i, b) in spec.safety_boundaries.iter().enumerate() {
        let field = format!("safety_boundaries[{}]", i);
        v.text(format!("{}.id", field), &b.id);
        if !boundary_ids.insert(b.id.as_str()) {
            v.push(format!("{}.id", field), format!("duplicate boundary id '{}'", b.id));
        }
        v.trigger(&format!("{}.condition", field), &b.condition);
        if let Some(message) = &b.message {
            v.text(format!("{}.message", field), message);
        }
    }

    let result = v.finish();
    if let Err(e) = &result {
        log::warn!("spec '{}' rejected: {}", spec.spec_id, e);
    }
    result
}

/// Check the invariants of a legacy spec.
pub fn validate_legacy(spec: &PersonaSpecV1) -> ValidationResult {
    let mut v = Violations::default();
    if spec.schema_version != SchemaVersion::V1 {
        v.push("schema_version", "must be v1");
    }
    v.text("spec_id", &spec.spec_id);
    v.text("owner_id", &spec.owner_id);
    v.text("name", &spec.name);
    v.text("description", &spec.description);
    if let Some(s) = &spec.specialization {
        v.text("specialization", s);
    }
    for (i, tone) in spec.tone_descriptors().iter().enumerate() {
        v.text(format!("tone[{}]", i), tone);
    }
    if spec.updated_at < spec.created_at {
        v.push("updated_at", "must not precede created_at");
    }

    let result = v.finish();
    if let Err(e) = &result {
        log::warn!("legacy spec '{}' rejected: {}", spec.spec_id, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::tests::{fixed_time, sample_spec};
    use crate::spec::model::{ResponseTemplate, SafetyBoundary, SafetyOutcome, ValueConflictRule, ValueItem};

    fn fields(err: &SpecError) -> Vec<&str> {
        err.violations().iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn test_sample_spec_is_valid() {
        assert!(validate(&sample_spec()).is_ok());
    }

    #[test]
    fn test_every_violation_is_reported() {
        let mut spec = sample_spec();
        spec.identity.core_traits.clear();
        spec.identity.self_description = "   ".into();
        spec.values.values.push(ValueItem::new("candor", 9.0));
        spec.values
            .conflict_rules
            .push(ValueConflictRule::prefer("ghost", "honesty", "courage", "tact"));

        let err = validate(&spec).unwrap_err();
        let fields = fields(&err);
        assert!(fields.contains(&"identity.core_traits"));
        assert!(fields.contains(&"identity.self_description"));
        assert!(fields.contains(&"values.values[3].weight"));
        assert!(fields.contains(&"values.conflict_rules[1].right"));
        assert!(fields.contains(&"values.conflict_rules[1].resolution"));
        assert_eq!(err.violations().len(), 5);
    }

    #[test]
    fn test_duplicate_heuristic_pair_rejected() {
        let mut spec = sample_spec();
        let dup = spec.heuristics[0].clone();
        spec.heuristics.push(dup);
        let err = validate(&spec).unwrap_err();
        assert_eq!(fields(&err), vec!["heuristics[2]"]);
    }

    #[test]
    fn test_same_description_different_trigger_is_fine() {
        let mut spec = sample_spec();
        let mut other = spec.heuristics[0].clone();
        other.trigger.keywords.push("raise".into());
        spec.heuristics.push(other);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn test_duplicate_template_key_rejected() {
        let mut spec = sample_spec();
        spec.communication.templates.push(ResponseTemplate {
            situation: "default".into(),
            template: "again".into(),
        });
        let err = validate(&spec).unwrap_err();
        assert_eq!(fields(&err), vec!["communication.templates[2].situation"]);
    }

    #[test]
    fn test_empty_trigger_rejected() {
        let mut spec = sample_spec();
        spec.safety_boundaries.push(SafetyBoundary {
            id: "vague".into(),
            condition: Default::default(),
            outcome: SafetyOutcome::Refuse,
            message: None,
        });
        let err = validate(&spec).unwrap_err();
        assert_eq!(fields(&err), vec!["safety_boundaries[1].condition"]);
    }

    #[test]
    fn test_self_conflict_and_nan_weight() {
        let mut spec = sample_spec();
        spec.values.values[2].weight = f64::NAN;
        spec.values
            .conflict_rules
            .push(ValueConflictRule::blend("self", "tact", "tact", "n/a"));
        let err = validate(&spec).unwrap_err();
        let fields = fields(&err);
        assert!(fields.contains(&"values.values[2].weight"));
        assert!(fields.contains(&"values.conflict_rules[1]"));
    }

    #[test]
    fn test_wrong_marker_rejected() {
        let mut spec = sample_spec();
        spec.schema_version = SchemaVersion::V1;
        assert!(!is_current_schema(&PersonaSpec::V2(spec.clone())));
        let err = validate(&spec).unwrap_err();
        assert_eq!(fields(&err), vec!["schema_version"]);
    }

    #[test]
    fn test_is_current_schema_by_marker() {
        assert!(is_current_schema(&PersonaSpec::V2(sample_spec())));
        let v1 = PersonaSpecV1::new("l", "o", "n", "d.", fixed_time());
        assert!(!is_current_schema(&PersonaSpec::V1(v1)));
    }

    #[test]
    fn test_legacy_validation() {
        let ok = PersonaSpecV1::new("l", "o", "Ravi", "I advise.", fixed_time());
        assert!(validate_legacy(&ok).is_ok());
        assert!(validate_document(&PersonaSpec::V1(ok)).is_ok());

        let bad = PersonaSpecV1::new("", "o", "Ravi", "", fixed_time());
        let err = validate_legacy(&bad).unwrap_err();
        assert_eq!(fields(&err), vec!["spec_id", "description"]);
    }

    #[test]
    fn test_legacy_tone_descriptors_checked() {
        let ok = PersonaSpecV1::new("l", "o", "Ravi", "I advise.", fixed_time()).with_tone("calm, dry");
        assert!(validate_legacy(&ok).is_ok());

        let bad = ok.with_tone("calm, \u{1b}[31mred");
        let err = validate_legacy(&bad).unwrap_err();
        assert_eq!(fields(&err), vec!["tone[1]"]);
    }
}
