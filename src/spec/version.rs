//! Versioning: schema markers, semantic versions, and the optimistic
//! concurrency rule behind `bump_patch`.
//!
//! A versioned [`PersonaSpecV2`] is never edited in place.  Every change
//! produces a new value whose patch number is one higher and whose
//! `previous_version` points at the version it was derived from.  The store
//! collaborator enforces the compare-and-swap; this module only owns the
//! comparison rule.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SpecError;
use super::model::PersonaSpecV2;

/// Schema-version marker carried by every persona document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Legacy single-layer specification.
    #[serde(rename = "v1")]
    V1,
    /// Current five-layer specification.
    #[serde(rename = "v2")]
    V2,
}

impl SchemaVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
        }
    }

    /// Parse a marker string. Unknown markers are rejected, never guessed.
    pub fn parse(marker: &str) -> Result<Self, SpecError> {
        match marker {
            "v1" => Ok(SchemaVersion::V1),
            "v2" => Ok(SchemaVersion::V2),
            other => Err(SpecError::UnknownSchema(other.to_string())),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `major.minor.patch`, ordered lexicographically by component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SemanticVersion {
    pub const INITIAL: SemanticVersion = SemanticVersion::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The next patch version, or `None` once the patch number is exhausted.
    pub fn next_patch(self) -> Option<Self> {
        let patch = self.patch.checked_add(1)?;
        Some(Self { patch, ..self })
    }

    /// [`SemanticVersion::next_patch`] for `spec_id`, failing with
    /// [`SpecError::VersionExhausted`] instead of wrapping.
    pub fn successor(self, spec_id: &str) -> Result<Self, SpecError> {
        self.next_patch().ok_or_else(|| SpecError::VersionExhausted {
            spec_id: spec_id.to_string(),
            version: self,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("'{}' is not major.minor.patch", s));
        }
        let mut nums = [0u32; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a version component", part))?;
        }
        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

/// Identifies one immutable version of one spec: `spec_id@major.minor.patch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken {
    pub spec_id: String,
    pub version: SemanticVersion,
}

impl VersionToken {
    pub fn new(spec_id: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            spec_id: spec_id.into(),
            version,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.spec_id, self.version)
    }
}

/// The optimistic-concurrency rule: reject unless the caller's assumed
/// version is exactly the store's head.
pub fn ensure_head(assumed: &VersionToken, head: &VersionToken) -> Result<(), SpecError> {
    if assumed == head {
        return Ok(());
    }
    Err(SpecError::ImmutableVersionConflict {
        spec_id: assumed.spec_id.clone(),
        assumed: assumed.version,
        head: head.version,
    })
}

/// Derive the next patch version of `spec`, stamped with the current time.
///
/// Fails with [`SpecError::ImmutableVersionConflict`] when `spec` is not the
/// head version reported by the store.
pub fn bump_patch(spec: &PersonaSpecV2, head: &VersionToken) -> Result<PersonaSpecV2, SpecError> {
    bump_patch_at(spec, head, Utc::now())
}

/// [`bump_patch`] with an explicit clock.
///
/// `updated_at` never moves backwards: a clock earlier than the current
/// stamp keeps the current stamp.
pub fn bump_patch_at(
    spec: &PersonaSpecV2,
    head: &VersionToken,
    now: DateTime<Utc>,
) -> Result<PersonaSpecV2, SpecError> {
    ensure_head(&spec.version_token(), head)?;

    let mut next = spec.clone();
    next.previous_version = Some(spec.version);
    next.version = spec.version.successor(&spec.spec_id)?;
    next.updated_at = now.max(spec.updated_at);

    log::debug!(
        "bumped {} -> {}",
        spec.version_token(),
        next.version_token()
    );
    Ok(next)
}
