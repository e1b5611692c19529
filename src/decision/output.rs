//! The audit record produced by every decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::spec::model::{Layer, SafetyOutcome};
use crate::spec::version::SemanticVersion;

// ============================================================================
// Actions, bands and stages
// ============================================================================

/// What the agent should do with the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Answer,
    Clarify,
    Redirect,
    Escalate,
    Refuse,
}

impl RecommendedAction {
    /// Higher is more conservative: refuse > escalate > redirect > clarify > answer.
    pub fn conservatism(self) -> u8 {
        match self {
            RecommendedAction::Answer => 0,
            RecommendedAction::Clarify => 1,
            RecommendedAction::Redirect => 2,
            RecommendedAction::Escalate => 3,
            RecommendedAction::Refuse => 4,
        }
    }

    /// The more conservative of two actions.
    pub fn most_conservative(self, other: Self) -> Self {
        if other.conservatism() > self.conservatism() {
            other
        } else {
            self
        }
    }
}

impl From<SafetyOutcome> for RecommendedAction {
    fn from(outcome: SafetyOutcome) -> Self {
        match outcome {
            SafetyOutcome::Refuse => RecommendedAction::Refuse,
            SafetyOutcome::Escalate => RecommendedAction::Escalate,
            SafetyOutcome::Redirect => RecommendedAction::Redirect,
        }
    }
}

/// Band of the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Low,
    Moderate,
    High,
}

/// States of the decision pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    SafetyCheck,
    ScoreDimensions,
    ApplyHeuristics,
    ResolveValueConflicts,
    ApplyMemoryAnchors,
    Finalize,
}

// ============================================================================
// Per-stage records
// ============================================================================

/// Result of the safety stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SafetyOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Score for one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub layer: Layer,
    /// 1..=5.
    pub score: u8,
    pub rationale: String,
}

/// A heuristic that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicApplied {
    /// Position in the spec's heuristic list.
    pub index: usize,
    pub description: String,
    pub priority: i32,
    pub matched: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// A conflict rule whose two values were both implicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueConflictEncountered {
    pub rule_id: String,
    pub left: String,
    pub right: String,
    /// e.g. `"honesty wins"` or `"blend: ..."`.
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl ValueConflictEncountered {
    /// A conflict without a declared winner.
    pub fn is_unresolved(&self) -> bool {
        self.winner.is_none()
    }
}

/// A memory anchor applied to one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAnchorApplied {
    pub anchor_id: String,
    pub layer: Layer,
    pub description: String,
}

// ============================================================================
// The output
// ============================================================================

/// Everything the engine decided for one (spec, query) pair, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDecisionOutput {
    pub decision_id: String,
    pub spec_id: String,
    pub spec_version: SemanticVersion,
    /// SHA-256 hex of the canonical spec, query and config.
    pub input_fingerprint: String,
    pub safety: SafetyCheckResult,
    /// One per layer, in canonical layer order.
    pub dimension_scores: Vec<DimensionScore>,
    pub aggregate_score: u32,
    pub score_band: ScoreBand,
    pub heuristics_applied: Vec<HeuristicApplied>,
    pub value_conflicts: Vec<ValueConflictEncountered>,
    pub memory_anchors_applied: Vec<MemoryAnchorApplied>,
    pub recommended_action: RecommendedAction,
    pub guidance: Vec<String>,
    pub stages: Vec<DecisionStage>,
    /// Wall-clock time. Not part of [`Self::canonical_json`].
    pub decided_at: DateTime<Utc>,
}

impl StructuredDecisionOutput {
    /// Score for one layer.
    pub fn score_for(&self, layer: Layer) -> Option<&DimensionScore> {
        self.dimension_scores.iter().find(|d| d.layer == layer)
    }

    /// True when any encountered conflict had no declared winner.
    pub fn has_unresolved_conflict(&self) -> bool {
        self.value_conflicts.iter().any(|c| c.is_unresolved())
    }

    /// JSON with `decided_at` removed and keys sorted.
    ///
    /// Two decisions for the same inputs produce identical strings.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("decided_at");
        }
        serde_json::to_string(&value)
    }

    /// SHA-256 hex of [`Self::canonical_json`].
    pub fn consistency_digest(&self) -> Result<String, serde_json::Error> {
        let canonical = self.canonical_json()?;
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }
}
