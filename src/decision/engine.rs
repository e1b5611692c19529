//! The decision pipeline.
//!
//! ```text
//! SafetyCheck ──blocked──────────────────────────────────────────┐
//!     │                                                          ↓
//!     └→ ScoreDimensions → ApplyHeuristics → ResolveValueConflicts
//!            → ApplyMemoryAnchors → Finalize ←───────────────────┘
//! ```
//!
//! Each stage runs at most once per call, in that order.  All working
//! state is local to the call; the spec and query are only borrowed.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::spec::error::SpecError;
use crate::spec::model::{Layer, PersonaSpecV2};
use crate::spec::validation;

use super::config::DecisionConfig;
use super::error::ConfigError;
use super::matching::QueryTerms;
use super::output::{
    DecisionStage, DimensionScore, HeuristicApplied, MemoryAnchorApplied, RecommendedAction,
    SafetyCheckResult, StructuredDecisionOutput, ValueConflictEncountered,
};
use super::query::QueryContext;
use super::scoring;
use super::table;

/// Namespace for decision ids.
fn decision_namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, b"persona-engine/decision")
}

/// Stateless decision engine. Cheap to clone and safe to share.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

/// Per-call working state.
#[derive(Debug, Default)]
struct Run {
    stages: Vec<DecisionStage>,
    safety: SafetyCheckResult,
    scores: Vec<DimensionScore>,
    heuristics: Vec<HeuristicApplied>,
    conflicts: Vec<ValueConflictEncountered>,
    anchors: Vec<MemoryAnchorApplied>,
    guidance: Vec<String>,
}

impl DecisionEngine {
    /// Engine with a validated scoring config.
    pub fn new(config: DecisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Decide, stamping the current time.
    pub fn decide(&self, spec: &PersonaSpecV2, query: &QueryContext) -> StructuredDecisionOutput {
        self.decide_at(spec, query, Utc::now())
    }

    /// Validate the spec first; a malformed spec is an error, not a decision.
    pub fn decide_validated(
        &self,
        spec: &PersonaSpecV2,
        query: &QueryContext,
    ) -> Result<StructuredDecisionOutput, SpecError> {
        validation::validate(spec)?;
        Ok(self.decide(spec, query))
    }

    /// SHA-256 hex over the canonical JSON of spec, query and config.
    pub fn fingerprint(&self, spec: &PersonaSpecV2, query: &QueryContext) -> String {
        use sha2::{Digest, Sha256};
        // Value maps are key-sorted, so this is stable across calls.
        let canonical = serde_json::json!({
            "config": &self.config,
            "query": query,
            "spec": spec,
        })
        .to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// [`DecisionEngine::decide`] with an explicit clock.
    pub fn decide_at(
        &self,
        spec: &PersonaSpecV2,
        query: &QueryContext,
        now: DateTime<Utc>,
    ) -> StructuredDecisionOutput {
        let terms = QueryTerms::new(query);
        let mut run = Run::default();
        let mut stage = Some(DecisionStage::SafetyCheck);

        while let Some(current) = stage {
            run.stages.push(current);
            stage = match current {
                DecisionStage::SafetyCheck => {
                    self.safety_check(spec, &terms, &mut run);
                    if run.safety.blocked {
                        Some(DecisionStage::Finalize)
                    } else {
                        Some(DecisionStage::ScoreDimensions)
                    }
                }
                DecisionStage::ScoreDimensions => {
                    run.scores = scoring::score_all(spec, &terms, &self.config);
                    log::debug!(
                        "[{}] scores {:?}",
                        spec.spec_id,
                        run.scores.iter().map(|d| d.score).collect::<Vec<_>>()
                    );
                    Some(DecisionStage::ApplyHeuristics)
                }
                DecisionStage::ApplyHeuristics => {
                    self.apply_heuristics(spec, &terms, &mut run);
                    Some(DecisionStage::ResolveValueConflicts)
                }
                DecisionStage::ResolveValueConflicts => {
                    self.resolve_value_conflicts(spec, &terms, &mut run);
                    Some(DecisionStage::ApplyMemoryAnchors)
                }
                DecisionStage::ApplyMemoryAnchors => {
                    self.apply_memory_anchors(spec, &terms, &mut run);
                    Some(DecisionStage::Finalize)
                }
                DecisionStage::Finalize => None,
            };
        }

        self.finalize(spec, query, run, now)
    }

    // --- Stages ---

    fn safety_check(&self, spec: &PersonaSpecV2, terms: &QueryTerms, run: &mut Run) {
        let hit = spec
            .safety_boundaries
            .iter()
            .find(|b| b.condition.matches(terms));
        if let Some(boundary) = hit {
            log::debug!(
                "[{}] safety boundary '{}' triggered -> {:?}",
                spec.spec_id,
                boundary.id,
                boundary.outcome
            );
            run.safety = SafetyCheckResult {
                blocked: true,
                boundary_id: Some(boundary.id.clone()),
                outcome: Some(boundary.outcome),
                message: boundary.message.clone(),
            };
            let reason = format!("safety boundary '{}' triggered", boundary.id);
            run.scores = Layer::ALL
                .iter()
                .map(|&layer| scoring::not_evaluated(layer, &reason))
                .collect();
            if let Some(message) = &boundary.message {
                run.guidance.push(message.clone());
            }
        }
    }

    fn apply_heuristics(&self, spec: &PersonaSpecV2, terms: &QueryTerms, run: &mut Run) {
        let mut ordered: Vec<(usize, &crate::spec::model::CognitiveHeuristic)> =
            spec.heuristics.iter().enumerate().collect();
        // Stable: equal priorities keep declaration order.
        ordered.sort_by_key(|(_, h)| h.priority);

        for (index, heuristic) in ordered {
            if !heuristic.trigger.matches(terms) {
                continue;
            }
            if let Some(guidance) = &heuristic.guidance {
                run.guidance.push(guidance.clone());
            }
            run.heuristics.push(HeuristicApplied {
                index,
                description: heuristic.description.clone(),
                priority: heuristic.priority,
                matched: heuristic.trigger.describe_hits(terms),
                guidance: heuristic.guidance.clone(),
            });
        }
        log::debug!("[{}] {} heuristic(s) applied", spec.spec_id, run.heuristics.len());
    }

    fn resolve_value_conflicts(&self, spec: &PersonaSpecV2, terms: &QueryTerms, run: &mut Run) {
        let values = &spec.values;
        let implicated = |name: &str| {
            values
                .get(name)
                .map_or(false, |v| v.is_implicated_by(terms))
        };

        for rule in &values.conflict_rules {
            if !(implicated(&rule.left) && implicated(&rule.right)) {
                continue;
            }
            if let crate::spec::model::ConflictResolution::Blend { guidance } = &rule.resolution {
                run.guidance.push(guidance.clone());
            }
            run.conflicts.push(ValueConflictEncountered {
                rule_id: rule.id.clone(),
                left: rule.left.clone(),
                right: rule.right.clone(),
                resolution: rule.resolution.label(),
                winner: rule.resolution.winner().map(String::from),
            });
        }
        log::debug!("[{}] {} value conflict(s)", spec.spec_id, run.conflicts.len());
    }

    fn apply_memory_anchors(&self, spec: &PersonaSpecV2, terms: &QueryTerms, run: &mut Run) {
        let mut reinforced: BTreeSet<Layer> = BTreeSet::new();

        for anchor in &spec.memory_anchors {
            if !anchor.condition.matches(terms) {
                continue;
            }
            for &layer in &anchor.reinforces {
                if reinforced.contains(&layer) {
                    continue;
                }
                let Some(dimension) = run.scores.iter_mut().find(|d| d.layer == layer) else {
                    continue;
                };
                if dimension.score <= self.config.min_relevance {
                    continue;
                }
                dimension.rationale = format!(
                    "{}; reinforced by '{}': {}",
                    dimension.rationale, anchor.id, anchor.description
                );
                reinforced.insert(layer);
                run.anchors.push(MemoryAnchorApplied {
                    anchor_id: anchor.id.clone(),
                    layer,
                    description: anchor.description.clone(),
                });
            }
        }
        log::debug!("[{}] {} anchor application(s)", spec.spec_id, run.anchors.len());
    }

    fn finalize(
        &self,
        spec: &PersonaSpecV2,
        query: &QueryContext,
        run: Run,
        now: DateTime<Utc>,
    ) -> StructuredDecisionOutput {
        let aggregate_score: u32 = run.scores.iter().map(|d| u32::from(d.score)).sum();
        let bands = self.config.bands_for(aggregate_score);
        let unresolved = run.conflicts.iter().any(|c| c.is_unresolved());

        let (score_band, recommended_action) = match run.safety.outcome {
            Some(outcome) if run.safety.blocked => {
                let band = bands.first().copied().unwrap_or(super::output::ScoreBand::Low);
                (band, RecommendedAction::from(outcome))
            }
            _ => table::resolve(&bands, unresolved),
        };

        let input_fingerprint = self.fingerprint(spec, query);
        let decision_id = Uuid::new_v5(&decision_namespace(), input_fingerprint.as_bytes()).to_string();

        log::debug!(
            "[{}@{}] aggregate {} ({:?}) -> {:?}",
            spec.spec_id,
            spec.version,
            aggregate_score,
            score_band,
            recommended_action
        );

        StructuredDecisionOutput {
            decision_id,
            spec_id: spec.spec_id.clone(),
            spec_version: spec.version,
            input_fingerprint,
            safety: run.safety,
            dimension_scores: run.scores,
            aggregate_score,
            score_band,
            heuristics_applied: run.heuristics,
            value_conflicts: run.conflicts,
            memory_anchors_applied: run.anchors,
            recommended_action,
            guidance: run.guidance,
            stages: run.stages,
            decided_at: now,
        }
    }
}

/// Decide with the default scoring config.
pub fn decide(spec: &PersonaSpecV2, query: &QueryContext) -> StructuredDecisionOutput {
    DecisionEngine::default().decide(spec, query)
}

// ============================================================================
// Tests
// ============================================================================
