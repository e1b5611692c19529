//! Persona spec types: the five cognitive layers and the v2 aggregate.
//!
//! A `PersonaSpecV2` is pure data.  Validation lives in
//! [`super::validation`], versioning in [`super::version`], and matching of
//! trigger conditions against a query in [`crate::decision::matching`].
//!
//! # Example YAML
//!
//! ```yaml
//! spec_id: "coach-7"
//! owner_id: "tenant-a"
//! schema_version: v2
//! version: { major: 1, minor: 0, patch: 0 }
//! created_at: "2026-01-01T00:00:00Z"
//! updated_at: "2026-01-01T00:00:00Z"
//! identity:
//!   name: "Mara"
//!   role: "career coach"
//!   core_traits: ["pragmatic", "direct"]
//!   self_description: "I help people make their next career move."
//! values:
//!   values:
//!     - { name: honesty, weight: 9 }
//!     - { name: tact, weight: 5 }
//!   conflict_rules:
//!     - id: honesty-over-tact
//!       left: honesty
//!       right: tact
//!       resolution: { kind: prefer, value: honesty }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SpecError;
use super::validation;
use super::version::{bump_patch_at, SchemaVersion, SemanticVersion, VersionToken};

// ============================================================================
// Layers and channels
// ============================================================================

/// The five layers that compose a persona spec, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Identity,
    Heuristics,
    Values,
    Communication,
    Memory,
}

impl Layer {
    /// All five layers in canonical order.
    pub const ALL: [Layer; 5] = [
        Layer::Identity,
        Layer::Heuristics,
        Layer::Values,
        Layer::Communication,
        Layer::Memory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Identity => "identity",
            Layer::Heuristics => "heuristics",
            Layer::Values => "values",
            Layer::Communication => "communication",
            Layer::Memory => "memory",
        }
    }

    /// Position in [`Layer::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Who the agent is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// The spec's owner is on the other side.
    OwnerFacing,
    /// Anyone else.
    PublicFacing,
}

/// A pattern over the query's intent label and text.
///
/// Matches when the channel restriction (if any) holds and at least one
/// intent pattern or keyword hits.  Intent patterns support `*` wildcards;
/// keywords may be multi-word phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerCondition {
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl TriggerCondition {
    /// Condition on intent patterns only.
    pub fn intents<I, S>(intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            intents: intents.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Condition on keywords only.
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Restrict to one channel.
    pub fn on_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// True when neither intents nor keywords are declared.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.keywords.is_empty()
    }
}

// ============================================================================
// Layer 1: identity
// ============================================================================

/// Who the persona is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityFrame {
    pub name: String,
    pub role: String,
    /// Ordered short trait strings. At least one.
    pub core_traits: Vec<String>,
    pub self_description: String,
}

// ============================================================================
// Layer 2: cognitive heuristics
// ============================================================================

/// One reasoning rule. Lower `priority` is applied first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveHeuristic {
    pub trigger: TriggerCondition,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Note appended to the working recommendation when the rule fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

fn default_priority() -> i32 {
    100
}

impl CognitiveHeuristic {
    pub fn new(trigger: TriggerCondition, description: impl Into<String>, priority: i32) -> Self {
        Self {
            trigger,
            description: description.into(),
            priority,
            guidance: None,
        }
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }
}

// ============================================================================
// Layer 3: value hierarchy
// ============================================================================

/// A named value. Higher weight means higher priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueItem {
    pub name: String,
    pub weight: f64,
    /// Words that implicate this value. Empty means the name itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ValueItem {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The effective keyword list.
    pub fn match_terms(&self) -> Vec<&str> {
        if self.keywords.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.keywords.iter().map(String::as_str).collect()
        }
    }
}

/// How a conflict between two values is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// The named value wins outright.
    Prefer { value: String },
    /// Neither wins; respond with a blend.
    Blend { guidance: String },
}

impl ConflictResolution {
    /// Short audit label, e.g. `"honesty wins"`.
    pub fn label(&self) -> String {
        match self {
            ConflictResolution::Prefer { value } => format!("{} wins", value),
            ConflictResolution::Blend { guidance } => format!("blend: {}", guidance),
        }
    }

    /// The winning value, if the rule names one.
    pub fn winner(&self) -> Option<&str> {
        match self {
            ConflictResolution::Prefer { value } => Some(value),
            ConflictResolution::Blend { .. } => None,
        }
    }
}

/// Resolution for two values implicated at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueConflictRule {
    pub id: String,
    pub left: String,
    pub right: String,
    pub resolution: ConflictResolution,
}

impl ValueConflictRule {
    pub fn prefer(
        id: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
        winner: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            left: left.into(),
            right: right.into(),
            resolution: ConflictResolution::Prefer {
                value: winner.into(),
            },
        }
    }

    pub fn blend(
        id: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            left: left.into(),
            right: right.into(),
            resolution: ConflictResolution::Blend {
                guidance: guidance.into(),
            },
        }
    }
}

/// Ordered values plus the rules for their conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueHierarchy {
    #[serde(default)]
    pub values: Vec<ValueItem>,
    #[serde(default)]
    pub conflict_rules: Vec<ValueConflictRule>,
}

impl ValueHierarchy {
    pub fn get(&self, name: &str) -> Option<&ValueItem> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Values ordered by descending weight; equal weights keep declaration
    /// order (validation rejects them anyway).
    pub fn ranked(&self) -> Vec<&ValueItem> {
        let mut ranked: Vec<&ValueItem> = self.values.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        ranked
    }
}

// ============================================================================
// Layer 4: communication patterns
// ============================================================================

/// A response template for one situation label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    /// Situation label. Supports `*` wildcards.
    pub situation: String,
    pub template: String,
}

/// Tone descriptors plus templates keyed by situation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPatterns {
    #[serde(default)]
    pub tone: Vec<String>,
    #[serde(default)]
    pub templates: Vec<ResponseTemplate>,
}

// ============================================================================
// Layer 5: memory anchors
// ============================================================================

/// An episodic reference that reinforces one or more layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAnchor {
    pub id: String,
    pub description: String,
    pub reinforces: Vec<Layer>,
    pub condition: TriggerCondition,
}

// ============================================================================
// Safety boundaries
// ============================================================================

/// Forced outcome of a safety boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyOutcome {
    Refuse,
    Escalate,
    Redirect,
}

/// A hard constraint that overrides every layer when triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyBoundary {
    pub id: String,
    pub condition: TriggerCondition,
    pub outcome: SafetyOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// The aggregate
// ============================================================================

/// The five-layer persona spec.
///
/// Construct drafts with [`PersonaSpecV2::new`] and the `with_*` helpers.
/// Once a version has been handed out, change it only through
/// [`PersonaSpecV2::revise`] or [`super::version::bump_patch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSpecV2 {
    // --- Metadata ---
    pub spec_id: String,
    pub owner_id: String,
    pub schema_version: SchemaVersion,
    pub version: SemanticVersion,
    /// The version this one was derived from. `None` for a first version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<SemanticVersion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // --- Layers ---
    pub identity: IdentityFrame,
    #[serde(default)]
    pub heuristics: Vec<CognitiveHeuristic>,
    #[serde(default)]
    pub values: ValueHierarchy,
    #[serde(default)]
    pub communication: CommunicationPatterns,
    #[serde(default)]
    pub memory_anchors: Vec<MemoryAnchor>,
    #[serde(default)]
    pub safety_boundaries: Vec<SafetyBoundary>,
}

impl PersonaSpecV2 {
    /// A first-version draft with only the identity layer filled in.
    pub fn new(
        spec_id: impl Into<String>,
        owner_id: impl Into<String>,
        identity: IdentityFrame,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            spec_id: spec_id.into(),
            owner_id: owner_id.into(),
            schema_version: SchemaVersion::V2,
            version: SemanticVersion::INITIAL,
            previous_version: None,
            created_at: now,
            updated_at: now,
            identity,
            heuristics: Vec::new(),
            values: ValueHierarchy::default(),
            communication: CommunicationPatterns::default(),
            memory_anchors: Vec::new(),
            safety_boundaries: Vec::new(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: Vec<CognitiveHeuristic>) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_values(mut self, values: ValueHierarchy) -> Self {
        self.values = values;
        self
    }

    pub fn with_communication(mut self, communication: CommunicationPatterns) -> Self {
        self.communication = communication;
        self
    }

    pub fn with_memory_anchors(mut self, anchors: Vec<MemoryAnchor>) -> Self {
        self.memory_anchors = anchors;
        self
    }

    pub fn with_safety_boundaries(mut self, boundaries: Vec<SafetyBoundary>) -> Self {
        self.safety_boundaries = boundaries;
        self
    }

    /// This version's token.
    pub fn version_token(&self) -> VersionToken {
        VersionToken::new(self.spec_id.clone(), self.version)
    }

    /// Produce the next version with `edit` applied to its layers.
    ///
    /// Metadata (ids, schema marker, version lineage, timestamps) is owned by
    /// the versioning rules; any change `edit` makes to it is discarded.  The
    /// result is validated before it is returned.
    pub fn revise<F>(&self, head: &VersionToken, edit: F) -> Result<PersonaSpecV2, SpecError>
    where
        F: FnOnce(&mut PersonaSpecV2),
    {
        self.revise_at(head, Utc::now(), edit)
    }

    /// [`PersonaSpecV2::revise`] with an explicit clock.
    pub fn revise_at<F>(
        &self,
        head: &VersionToken,
        now: DateTime<Utc>,
        edit: F,
    ) -> Result<PersonaSpecV2, SpecError>
    where
        F: FnOnce(&mut PersonaSpecV2),
    {
        let mut next = bump_patch_at(self, head, now)?;
        let version = next.version;
        edit(&mut next);

        next.spec_id = self.spec_id.clone();
        next.owner_id = self.owner_id.clone();
        next.schema_version = self.schema_version;
        next.version = version;
        next.previous_version = Some(self.version);
        next.created_at = self.created_at;
        next.updated_at = now.max(self.updated_at);

        validation::validate(&next)?;
        Ok(next)
    }

    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, SpecError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
