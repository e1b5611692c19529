//! Legacy (v1) persona specs and the tagged v1/v2 document variant.
//!
//! The schema-version marker is read once, at the document boundary, and
//! decides which shape the rest of the document is parsed as.  Field
//! presence is never used to guess.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SpecError;
use super::model::PersonaSpecV2;
use super::version::{SchemaVersion, SemanticVersion};

/// A single-layer legacy spec: one free-text description plus an optional
/// declared specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSpecV1 {
    pub spec_id: String,
    pub owner_id: String,
    pub schema_version: SchemaVersion,
    pub name: String,
    /// Free-text persona description. The first sentence introduces the
    /// persona; later sentences describe it.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    /// Comma-separated tone descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemanticVersion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonaSpecV1 {
    pub fn new(
        spec_id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            spec_id: spec_id.into(),
            owner_id: owner_id.into(),
            schema_version: SchemaVersion::V1,
            name: name.into(),
            description: description.into(),
            specialization: None,
            tone: None,
            version: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Tone descriptors, split on commas, trimmed, empties dropped.
    pub fn tone_descriptors(&self) -> Vec<String> {
        self.tone
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

/// A persona document of either schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PersonaSpec {
    V1(PersonaSpecV1),
    V2(PersonaSpecV2),
}

impl PersonaSpec {
    /// The document's schema-version marker.
    pub fn schema_version(&self) -> SchemaVersion {
        match self {
            PersonaSpec::V1(s) => s.schema_version,
            PersonaSpec::V2(s) => s.schema_version,
        }
    }

    pub fn spec_id(&self) -> &str {
        match self {
            PersonaSpec::V1(s) => &s.spec_id,
            PersonaSpec::V2(s) => &s.spec_id,
        }
    }

    /// Dispatch on the `schema_version` field of an already-parsed document.
    pub fn from_json_value(value: Value) -> Result<Self, SpecError> {
        let marker = value
            .get("schema_version")
            .and_then(Value::as_str)
            .ok_or_else(|| SpecError::UnknownSchema("<missing>".to_string()))?;

        match SchemaVersion::parse(marker)? {
            SchemaVersion::V1 => Ok(PersonaSpec::V1(serde_json::from_value(value)?)),
            SchemaVersion::V2 => Ok(PersonaSpec::V2(serde_json::from_value(value)?)),
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Self::from_json_value(serde_json::from_str(json)?)
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_json_value(value)
    }

    /// Parse from a file on disk, choosing JSON or YAML by extension.
    pub fn from_file(path: &std::path::Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path.extension().map_or(false, |ext| ext == "json");
        let spec = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        Ok(spec)
    }
}

impl From<PersonaSpecV1> for PersonaSpec {
    fn from(spec: PersonaSpecV1) -> Self {
        PersonaSpec::V1(spec)
    }
}

impl From<PersonaSpecV2> for PersonaSpec {
    fn from(spec: PersonaSpecV2) -> Self {
        PersonaSpec::V2(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::tests::{fixed_time, sample_spec};

    fn legacy() -> PersonaSpecV1 {
        PersonaSpecV1::new(
            "legacy-1",
            "tenant-a",
            "Mara",
            "I am a career coach. Pragmatic. Direct with clients.",
            fixed_time(),
        )
        .with_tone("warm, concise ,")
    }

    #[test]
    fn test_tone_descriptors_are_trimmed() {
        assert_eq!(legacy().tone_descriptors(), vec!["warm", "concise"]);
        let mut bare = legacy();
        bare.tone = None;
        assert!(bare.tone_descriptors().is_empty());
    }

    #[test]
    fn test_dispatch_reads_marker() {
        let json = serde_json::to_string(&PersonaSpec::from(legacy())).unwrap();
        let parsed = PersonaSpec::from_json(&json).unwrap();
        assert_eq!(parsed.schema_version(), SchemaVersion::V1);
        assert_eq!(parsed.spec_id(), "legacy-1");

        let json = serde_json::to_string(&PersonaSpec::from(sample_spec())).unwrap();
        let parsed = PersonaSpec::from_json(&json).unwrap();
        assert!(matches!(parsed, PersonaSpec::V2(_)));
    }

    #[test]
    fn test_marker_wins_over_field_shape() {
        // A v2-shaped document labelled v1 is parsed as v1 and fails there,
        // rather than being silently accepted as v2.
        let mut value = serde_json::to_value(sample_spec()).unwrap();
        value["schema_version"] = Value::String("v1".into());
        assert!(matches!(
            PersonaSpec::from_json_value(value),
            Err(SpecError::Json(_))
        ));
    }

    #[test]
    fn test_missing_or_unknown_marker_rejected() {
        let mut value = serde_json::to_value(legacy()).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        assert!(matches!(
            PersonaSpec::from_json_value(value.clone()),
            Err(SpecError::UnknownSchema(_))
        ));

        value["schema_version"] = Value::String("v7".into());
        assert!(matches!(
            PersonaSpec::from_json_value(value),
            Err(SpecError::UnknownSchema(m)) if m == "v7"
        ));
    }

    #[test]
    fn test_yaml_document_dispatch() {
        let yaml = r#"
spec_id: legacy-2
owner_id: tenant-b
schema_version: v1
name: Ravi
description: "I am a finance advisor. Careful with numbers."
specialization: finance
created_at: "2026-01-01T00:00:00Z"
updated_at: "2026-01-01T00:00:00Z"
"#;
        match PersonaSpec::from_yaml(yaml).unwrap() {
            PersonaSpec::V1(v1) => {
                assert_eq!(v1.specialization.as_deref(), Some("finance"));
                assert!(v1.version.is_none());
            }
            other => panic!("expected v1, got {other:?}"),
        }
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        std::fs::write(&path, serde_json::to_string(&sample_spec()).unwrap()).unwrap();
        let spec = PersonaSpec::from_file(&path).unwrap();
        assert_eq!(spec.schema_version(), SchemaVersion::V2);
    }
}
