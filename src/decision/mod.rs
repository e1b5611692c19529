//! Decision engine: evaluates a query against a five-layer persona spec.
//!
//! # Architecture
//!
//! ```text
//! QueryContext ──→ QueryTerms (normalized once)
//!                      │
//! PersonaSpecV2 ──→ DecisionEngine ──→ StructuredDecisionOutput
//!                      │                 (scores, applied rules,
//! DecisionConfig ──────┘                  conflicts, action, audit ids)
//! ```
//!
//! The engine holds only its scoring config.  Every call owns its working
//! state, so one engine can be shared across threads without locks.

pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod output;
pub mod query;
pub mod scoring;
pub mod table;

// Re-exports
pub use config::DecisionConfig;
pub use engine::{decide, DecisionEngine};
pub use error::ConfigError;
pub use matching::{pattern_matches, QueryTerms};
pub use output::{
    DecisionStage, DimensionScore, HeuristicApplied, MemoryAnchorApplied, RecommendedAction,
    SafetyCheckResult, ScoreBand, StructuredDecisionOutput, ValueConflictEncountered,
};
pub use query::QueryContext;
