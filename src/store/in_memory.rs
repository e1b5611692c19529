//! In-process spec store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::spec::error::{SpecError, Violation};
use crate::spec::model::PersonaSpecV2;
use crate::spec::validation;
use crate::spec::version::VersionToken;

use super::interface::{SpecStore, StoreError};

/// Append-only history per spec id behind a single lock.
///
/// The head check and the append happen under one write guard, so two
/// writers racing from the same head cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    specs: RwLock<HashMap<String, Vec<PersonaSpecV2>>>,
}

impl InMemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct spec ids stored.
    pub fn len(&self) -> usize {
        self.specs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.read().is_empty()
    }
}

#[async_trait]
impl SpecStore for InMemorySpecStore {
    fn load(&self, spec_id: &str) -> Result<PersonaSpecV2, StoreError> {
        self.specs
            .read()
            .get(spec_id)
            .and_then(|history| history.last().cloned())
            .ok_or_else(|| StoreError::NotFound(spec_id.to_string()))
    }

    fn save(&self, spec: &PersonaSpecV2) -> Result<VersionToken, StoreError> {
        validation::validate(spec)?;

        let mut specs = self.specs.write();
        let history = specs.entry(spec.spec_id.clone()).or_default();
        if let Some(head) = history.last() {
            if spec.previous_version != Some(head.version) || spec.version <= head.version {
                log::warn!(
                    "rejected write to '{}': based on {:?}, head is {}",
                    spec.spec_id,
                    spec.previous_version,
                    head.version
                );
                return Err(SpecError::ImmutableVersionConflict {
                    spec_id: spec.spec_id.clone(),
                    assumed: spec.previous_version.unwrap_or(spec.version),
                    head: head.version,
                }
                .into());
            }
            lineage(head, spec)?;
        }

        history.push(spec.clone());
        log::info!("stored {}", spec.version_token());
        Ok(spec.version_token())
    }

    fn current_version(&self, spec_id: &str) -> Result<Option<VersionToken>, StoreError> {
        Ok(self
            .specs
            .read()
            .get(spec_id)
            .and_then(|history| history.last())
            .map(PersonaSpecV2::version_token))
    }

    fn history(&self, spec_id: &str) -> Result<Vec<PersonaSpecV2>, StoreError> {
        Ok(self.specs.read().get(spec_id).cloned().unwrap_or_default())
    }
}

/// A revision keeps the tenant and creation stamp of the history it extends.
fn lineage(head: &PersonaSpecV2, spec: &PersonaSpecV2) -> Result<(), StoreError> {
    let mut violations = Vec::new();
    if spec.owner_id != head.owner_id {
        violations.push(Violation::new(
            "owner_id",
            format!("must stay '{}' across versions", head.owner_id),
        ));
    }
    if spec.created_at != head.created_at {
        violations.push(Violation::new(
            "created_at",
            format!("must stay {} across versions", head.created_at.to_rfc3339()),
        ));
    }
    if violations.is_empty() {
        return Ok(());
    }
    log::warn!(
        "rejected write to '{}': lineage changed ({} field(s))",
        spec.spec_id,
        violations.len()
    );
    Err(SpecError::SchemaViolation { violations }.into())
}
