//! Versioned spec storage.
//!
//! [`SpecStore`] is the collaborator boundary; [`InMemorySpecStore`] is the
//! in-process implementation used by the CLI and tests.

pub mod in_memory;
pub mod interface;

pub use in_memory::InMemorySpecStore;
pub use interface::{SpecStore, StoreError};

use crate::spec::model::PersonaSpecV2;
use crate::spec::version::VersionToken;

/// Store the first version of a spec.
pub fn commit_initial<S>(store: &S, spec: &PersonaSpecV2) -> Result<VersionToken, StoreError>
where
    S: SpecStore + ?Sized,
{
    store.save(spec)
}

/// Fetch the head, derive the next version with `edit` applied, and save it.
///
/// Fails with [`crate::spec::SpecError::ImmutableVersionConflict`] when
/// `base` is not the head, or when another writer lands first.
pub fn commit_revision<S, F>(
    store: &S,
    base: &PersonaSpecV2,
    edit: F,
) -> Result<PersonaSpecV2, StoreError>
where
    S: SpecStore + ?Sized,
    F: FnOnce(&mut PersonaSpecV2),
{
    let head = store
        .current_version(&base.spec_id)?
        .ok_or_else(|| StoreError::NotFound(base.spec_id.clone()))?;
    let next = base.revise(&head, edit)?;
    store.save(&next)?;
    log::info!("committed {} (from {})", next.version_token(), head);
    Ok(next)
}
