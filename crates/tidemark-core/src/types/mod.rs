//! # Core Type Definitions
//!
//! This module contains the data model shared by the whole engine:
//! - Snapshot rows (`Region`, `Nation`)
//! - Derived aggregate (`UpdateStatistics`)
//! - Cycle and freshness enums (`UpdateCycle`, `SnapshotFreshness`)
//! - Name canonicalization (`canonical_name`)
//! - Error types (`TidemarkError`)
//!
//! ## Ordering Guarantees
//!
//! `Region::index` and `Nation::id` are assigned by position during
//! ingestion and are the sole basis for update-order comparisons.
//! Both are contiguous and strictly increasing; nations of one region
//! always form a contiguous id block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authority::{self, Authority};

// =============================================================================
// REGION
// =============================================================================

/// One territorial entity as captured by the daily snapshot.
///
/// Authority strings from the snapshot are pre-encoded to bit flags
/// (see [`crate::authority`]) to keep rows compact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Position in the snapshot's region sequence. Immutable once assigned.
    pub index: u32,
    /// Display name as it appears in the snapshot.
    pub name: String,
    /// Nation count at snapshot time.
    pub num_nations: u32,
    /// WA Delegate nation name (empty or "0" when the seat is vacant).
    pub delegate: String,
    pub delegate_votes: u32,
    /// Delegate authority as encoded bit flags.
    pub delegate_auth: u16,
    pub founder: String,
    /// Founder authority as encoded bit flags.
    pub founder_auth: u16,
    /// World Factbook Entry text.
    pub factbook: String,
    /// Embassy region names.
    pub embassies: Vec<String>,
    /// Seconds since epoch of the last update of any kind.
    pub last_update: f64,
    pub last_major_update: f64,
    /// Zero when the region has never completed a minor update in this
    /// snapshot.
    pub last_minor_update: f64,
    /// Enrichment flags, filled only when the snapshot is the current
    /// day's (see [`SnapshotFreshness`]).
    pub has_governor: bool,
    pub has_password: bool,
    pub is_frontier: bool,
}

impl Region {
    /// Canonical lookup key for this region.
    #[must_use]
    pub fn key(&self) -> String {
        canonical_name(&self.name)
    }

    /// Whether the delegate holds the given authority.
    #[must_use]
    pub fn delegate_has(&self, auth: Authority) -> bool {
        authority::has(self.delegate_auth, auth)
    }

    /// Whether the founder holds the given authority.
    #[must_use]
    pub fn founder_has(&self, auth: Authority) -> bool {
        authority::has(self.founder_auth, auth)
    }
}

// =============================================================================
// NATION
// =============================================================================

/// One population unit inside a region.
///
/// The `id` is assigned globally across the entire snapshot in ingestion
/// order, which makes it the fine-grained proxy for real update order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    /// Global position in the snapshot's nation sequence.
    pub id: u64,
    pub name: String,
    /// Back-reference to the owning region's `index`.
    pub region_index: u32,
}

// =============================================================================
// UPDATE STATISTICS
// =============================================================================

/// Global cycle metrics derived once from committed Region rows.
///
/// Computed by [`crate::stats::compute_statistics`] after ingestion and
/// treated as read-only thereafter; recomputation requires re-ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatistics {
    pub total_nations: u64,
    /// Max − min of `last_major_update` across all regions.
    pub major_span: f64,
    /// Max − min of `last_minor_update`, restricted to regions with a
    /// non-zero minor timestamp.
    pub minor_span: f64,
    /// Average wall-clock seconds between consecutive nations, major cycle.
    pub tpn_major: f64,
    /// Average wall-clock seconds between consecutive nations, minor cycle.
    pub tpn_minor: f64,
    /// Earliest major update timestamp (origin for estimate offsets).
    pub major_floor: f64,
    /// Earliest non-zero minor update timestamp.
    pub minor_floor: f64,
}

impl UpdateStatistics {
    /// Time-per-nation for the given cycle.
    #[must_use]
    pub fn tpn(&self, cycle: UpdateCycle) -> f64 {
        match cycle {
            UpdateCycle::Major => self.tpn_major,
            UpdateCycle::Minor => self.tpn_minor,
        }
    }
}

// =============================================================================
// CYCLE & FRESHNESS
// =============================================================================

/// One of the two daily passes over the world.
///
/// Major and Minor cycles have independent timing; every region carries a
/// last-update timestamp for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateCycle {
    Major,
    Minor,
}

impl std::fmt::Display for UpdateCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// Whether a snapshot corresponds to the current processing day.
///
/// Decided once at ingestion start. Live tag enrichment (governorless,
/// password, frontier) is only meaningful for a `Current` snapshot; for
/// `Historical` snapshots the flags stay at their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFreshness {
    Current,
    Historical,
}

// =============================================================================
// NAME CANONICALIZATION
// =============================================================================

/// Canonical lookup key: lowercase, whitespace collapsed to underscores.
///
/// All name lookups and tag-membership tests go through this form so that
/// "Spear Danes" and "spear_danes" address the same row.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the engine.
///
/// Fatal-input conditions carry enough context to tell the operator which
/// precondition failed; recovered per-record conditions never reach this
/// type (they are logged and skipped inside ingestion).
#[derive(Debug, Error)]
pub enum TidemarkError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// The persistent store rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// A row could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The snapshot artifact is unobtainable or structurally malformed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// The remote API returned a non-success response.
    #[error("API request failed: {0}")]
    Api(String),

    /// No region row matches the requested name.
    #[error("region not found: {0}")]
    RegionNotFound(String),

    /// No nation row carries the requested id.
    #[error("nation not found: id {0}")]
    NationNotFound(u64),

    /// The snapshot contains no nations (or no usable cycle timestamps),
    /// so per-nation timing cannot be derived.
    #[error("world snapshot is empty: no nations to derive timing from")]
    EmptyWorld,

    /// The requested trigger width reaches outside the update order.
    #[error("trigger index {index} is outside the update order (0..{total})")]
    TriggerOutOfRange { index: i64, total: u64 },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_lowercases_and_underscores() {
        assert_eq!(canonical_name("Spear Danes"), "spear_danes");
        assert_eq!(canonical_name("  The  North   Pacific "), "the_north_pacific");
        assert_eq!(canonical_name("lazarus"), "lazarus");
    }

    #[test]
    fn canonical_name_is_idempotent() {
        let once = canonical_name("Warzone Trinidad");
        assert_eq!(canonical_name(&once), once);
    }

    #[test]
    fn region_authority_helpers() {
        let region = Region {
            index: 0,
            name: "Test".to_string(),
            num_nations: 1,
            delegate: "someone".to_string(),
            delegate_votes: 1,
            delegate_auth: crate::authority::encode("XB"),
            founder: "founder".to_string(),
            founder_auth: crate::authority::encode("W"),
            factbook: String::new(),
            embassies: Vec::new(),
            last_update: 0.0,
            last_major_update: 0.0,
            last_minor_update: 0.0,
            has_governor: false,
            has_password: false,
            is_frontier: false,
        };
        assert!(region.delegate_has(Authority::Executive));
        assert!(region.delegate_has(Authority::BorderControl));
        assert!(!region.delegate_has(Authority::WorldAssembly));
        assert!(region.founder_has(Authority::WorldAssembly));
        assert!(!region.founder_has(Authority::Executive));
    }

    #[test]
    fn tpn_selects_cycle() {
        let stats = UpdateStatistics {
            total_nations: 10,
            major_span: 100.0,
            minor_span: 50.0,
            tpn_major: 10.0,
            tpn_minor: 5.0,
            major_floor: 0.0,
            minor_floor: 0.0,
        };
        assert!((stats.tpn(UpdateCycle::Major) - 10.0).abs() < f64::EPSILON);
        assert!((stats.tpn(UpdateCycle::Minor) - 5.0).abs() < f64::EPSILON);
    }
}
