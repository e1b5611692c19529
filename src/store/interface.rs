//! Store collaborator interface.
//!
//! The engine never assigns versions itself.  A store keeps an append-only
//! history per spec id and accepts a write only when the incoming spec's
//! `previous_version` is the current head (compare-and-swap).

use async_trait::async_trait;
use thiserror::Error;

use crate::spec::error::SpecError;
use crate::spec::model::PersonaSpecV2;
use crate::spec::version::VersionToken;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No spec stored under this id.
    #[error("Spec not found: {0}")]
    NotFound(String),

    /// The spec was rejected (invalid, or a stale version token).
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Backend failure (I/O, database, network).
    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// True when the caller should re-fetch the head and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Spec(SpecError::ImmutableVersionConflict { .. }))
    }
}

/// Versioned persistence for persona specs.
///
/// All backends must implement this trait.
#[async_trait]
pub trait SpecStore: Send + Sync {
    /// The head version of a spec.
    fn load(&self, spec_id: &str) -> Result<PersonaSpecV2, StoreError>;

    /// Append a new version.
    ///
    /// Accepted when no version exists yet, or when `spec.previous_version`
    /// equals the current head. Otherwise fails with
    /// [`SpecError::ImmutableVersionConflict`]. A revision that changes
    /// `owner_id` or `created_at` fails with [`SpecError::SchemaViolation`].
    fn save(&self, spec: &PersonaSpecV2) -> Result<VersionToken, StoreError>;

    /// Token of the head version, or `None` if nothing is stored.
    fn current_version(&self, spec_id: &str) -> Result<Option<VersionToken>, StoreError>;

    /// Every stored version, oldest first.
    fn history(&self, spec_id: &str) -> Result<Vec<PersonaSpecV2>, StoreError>;

    /// Load asynchronously.
    async fn aload(&self, spec_id: &str) -> Result<PersonaSpecV2, StoreError> {
        self.load(spec_id)
    }

    /// Save asynchronously.
    async fn asave(&self, spec: &PersonaSpecV2) -> Result<VersionToken, StoreError> {
        self.save(spec)
    }
}
