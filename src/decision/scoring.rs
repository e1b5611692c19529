//! Per-layer scoring rubric.
//!
//! Every function here is pure: same spec, query and config give the same
//! score and rationale.

use std::collections::BTreeSet;

use crate::spec::model::{
    CommunicationPatterns, IdentityFrame, Layer, PersonaSpecV2, ValueHierarchy,
};

use super::config::{DecisionConfig, MIN_SCORE};
use super::matching::{normalize_label, pattern_matches, tokenize, QueryTerms};
use super::output::DimensionScore;

/// Role words shorter than this are too generic to count on their own.
const MIN_ROLE_WORD_LEN: usize = 4;

/// Score all five layers in canonical order.
pub fn score_all(spec: &PersonaSpecV2, terms: &QueryTerms, config: &DecisionConfig) -> Vec<DimensionScore> {
    Layer::ALL
        .iter()
        .map(|&layer| match layer {
            Layer::Identity => score_identity(&spec.identity, terms, config),
            Layer::Heuristics => score_heuristics(spec, terms, config),
            Layer::Values => score_values(&spec.values, terms, config),
            Layer::Communication => score_communication(&spec.communication, terms, config),
            Layer::Memory => score_memory(spec, terms, config),
        })
        .collect()
}

/// Minimum-score entry for a layer that was never evaluated.
pub fn not_evaluated(layer: Layer, reason: &str) -> DimensionScore {
    DimensionScore {
        layer,
        score: MIN_SCORE,
        rationale: format!("not evaluated: {}", reason),
    }
}

/// Distinct trait and role terms present in the query.
pub fn score_identity(identity: &IdentityFrame, terms: &QueryTerms, config: &DecisionConfig) -> DimensionScore {
    let mut candidates: Vec<String> = identity.core_traits.clone();
    candidates.push(identity.role.clone());
    candidates.extend(
        tokenize(&identity.role)
            .into_iter()
            .filter(|w| w.len() >= MIN_ROLE_WORD_LEN),
    );

    let mut seen = BTreeSet::new();
    let hits: Vec<String> = candidates
        .into_iter()
        .filter(|c| seen.insert(tokenize(c).join(" ")))
        .filter(|c| terms.mentions(c))
        .collect();

    let score = DecisionConfig::band_score(&config.identity_bands, hits.len());
    let rationale = if hits.is_empty() {
        "no trait or role terms in the query".to_string()
    } else {
        format!("{} identity term(s) present: {}", hits.len(), hits.join(", "))
    };
    DimensionScore {
        layer: Layer::Identity,
        score,
        rationale,
    }
}

/// Number of heuristics whose trigger matches.
pub fn score_heuristics(spec: &PersonaSpecV2, terms: &QueryTerms, config: &DecisionConfig) -> DimensionScore {
    let matching = spec
        .heuristics
        .iter()
        .filter(|h| h.trigger.matches(terms))
        .count();
    let score = DecisionConfig::band_score(&config.heuristic_bands, matching);
    DimensionScore {
        layer: Layer::Heuristics,
        score,
        rationale: format!(
            "{} of {} heuristic trigger(s) match",
            matching,
            spec.heuristics.len()
        ),
    }
}

/// 5 when a high-priority value is implicated, 3 for lower ones only, 1 for none.
pub fn score_values(values: &ValueHierarchy, terms: &QueryTerms, config: &DecisionConfig) -> DimensionScore {
    let ranked = values.ranked();
    let implicated: Vec<(usize, &str)> = ranked
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_implicated_by(terms))
        .map(|(rank, v)| (rank, v.name.as_str()))
        .collect();

    let any_high = implicated.iter().any(|(rank, _)| *rank < config.high_priority_rank);
    let (score, rationale) = if implicated.is_empty() {
        (1, "no values implicated".to_string())
    } else {
        let names: Vec<String> = implicated
            .iter()
            .map(|(rank, name)| {
                if *rank < config.high_priority_rank {
                    format!("{} (high priority)", name)
                } else {
                    name.to_string()
                }
            })
            .collect();
        let score = if any_high { 5 } else { 3 };
        (score, format!("implicated: {}", names.join(", ")))
    };
    DimensionScore {
        layer: Layer::Values,
        score,
        rationale,
    }
}

/// How well the templates cover the query's situation (its intent label).
pub fn score_communication(
    communication: &CommunicationPatterns,
    terms: &QueryTerms,
    config: &DecisionConfig,
) -> DimensionScore {
    let situation = terms.intent();
    let keys: Vec<String> = communication
        .templates
        .iter()
        .map(|t| normalize_label(&t.situation))
        .collect();
    let default_key = normalize_label(&config.default_template_key);

    let exact = keys.iter().find(|k| !k.contains('*') && k.as_str() == situation);
    let glob = keys
        .iter()
        .find(|k| k.contains('*') && pattern_matches(k, situation));

    let (score, rationale) = if let Some(key) = exact {
        (5, format!("exact template '{}'", key))
    } else if let Some(key) = glob {
        (4, format!("pattern template '{}' covers '{}'", key, situation))
    } else if keys.contains(&default_key) {
        (3, format!("falls back to '{}' template", default_key))
    } else if !keys.is_empty() {
        (2, format!("no template applies to '{}'", situation))
    } else {
        (1, "no templates declared".to_string())
    };
    DimensionScore {
        layer: Layer::Communication,
        score,
        rationale,
    }
}

/// Number of memory anchors whose condition matches.
pub fn score_memory(spec: &PersonaSpecV2, terms: &QueryTerms, config: &DecisionConfig) -> DimensionScore {
    let matching = spec
        .memory_anchors
        .iter()
        .filter(|a| a.condition.matches(terms))
        .count();
    DimensionScore {
        layer: Layer::Memory,
        score: DecisionConfig::band_score(&config.memory_bands, matching),
        rationale: format!(
            "{} of {} anchor condition(s) match",
            matching,
            spec.memory_anchors.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::query::QueryContext;
    use crate::spec::model::tests::sample_spec;
    use crate::spec::model::ResponseTemplate;

    fn terms(intent: &str, text: &str) -> QueryTerms {
        QueryTerms::new(&QueryContext::new(intent, text))
    }

    #[test]
    fn test_identity_counts_distinct_terms() {
        let spec = sample_spec();
        let config = DecisionConfig::default();
        let none = score_identity(&spec.identity, &terms("chat", "hello"), &config);
        assert_eq!(none.score, 1);

        // "direct", "career coach", "career" and "coach" are four distinct terms.
        let s = score_identity(
            &spec.identity,
            &terms("chat", "Be direct, career coach."),
            &config,
        );
        assert_eq!(s.score, 5);
        assert!(s.rationale.contains("direct"));
    }

    #[test]
    fn test_values_high_vs_low_priority() {
        let spec = sample_spec();
        let config = DecisionConfig::default();
        // Ranked: honesty 9, growth 7, tact 5. Top two are high priority.
        assert_eq!(score_values(&spec.values, &terms("chat", "hi"), &config).score, 1);
        assert_eq!(score_values(&spec.values, &terms("chat", "be gentle"), &config).score, 3);
        let s = score_values(&spec.values, &terms("chat", "be gentle but honest"), &config);
        assert_eq!(s.score, 5);
        assert_eq!(s.rationale, "implicated: honesty (high priority), tact");
    }

    #[test]
    fn test_communication_levels() {
        let spec = sample_spec();
        let config = DecisionConfig::default();
        let comm = &spec.communication;
        assert_eq!(score_communication(comm, &terms("career_advice", ""), &config).score, 5);
        assert_eq!(score_communication(comm, &terms("billing", ""), &config).score, 3);

        let mut globbed = comm.clone();
        globbed.templates.push(ResponseTemplate {
            situation: "billing_*".into(),
            template: "{answer}".into(),
        });
        assert_eq!(score_communication(&globbed, &terms("billing_refund", ""), &config).score, 4);

        let mut no_default = comm.clone();
        no_default.templates.retain(|t| t.situation != "default");
        assert_eq!(score_communication(&no_default, &terms("billing", ""), &config).score, 2);

        let empty = CommunicationPatterns::default();
        assert_eq!(score_communication(&empty, &terms("billing", ""), &config).score, 1);
    }

    #[test]
    fn test_score_all_in_layer_order() {
        let spec = sample_spec();
        let scores = score_all(&spec, &terms("career_advice", "salary offer"), &DecisionConfig::default());
        let layers: Vec<Layer> = scores.iter().map(|d| d.layer).collect();
        assert_eq!(layers, Layer::ALL.to_vec());
        // Both heuristics match; the one anchor matches.
        assert_eq!(scores[1].score, 3);
        assert_eq!(scores[4].score, 2);
        assert!(scores.iter().all(|d| (1..=5).contains(&d.score)));
    }
}
