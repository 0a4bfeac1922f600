//! # tidemark-core
//!
//! The update-order estimation and trigger resolution engine - THE LOGIC.
//!
//! Given a daily full-world snapshot, this crate derives a stable global
//! ordering of regions and nations, computes per-nation average processing
//! time from timestamp extrema, resolves triggers (an earlier region whose
//! update precedes a target's by a requested width), and assembles live
//! reconciliation reports.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Performs no network I/O; snapshot and live data arrive pre-fetched
//!   through plain data types
//! - Holds all persistent state in one redb-backed store, written as a
//!   single atomic batch per snapshot
//! - Keeps every derivation (statistics, trigger math, report assembly)
//!   pure and unit-testable without a live database or client

// =============================================================================
// MODULES
// =============================================================================

pub mod authority;
pub mod ingest;
pub mod recon;
pub mod stats;
pub mod storage;
pub mod trigger;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Nation, Region, SnapshotFreshness, TidemarkError, UpdateCycle, UpdateStatistics,
    canonical_name,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use authority::Authority;
pub use ingest::{RawRegion, SnapshotRecords, TagSets, build_records};
pub use recon::{
    LiveOfficer, LiveRegion, NationProfile, RegionReport, RoleHolder, VisibilityThresholds,
    role_holders,
};
pub use stats::compute_statistics;
pub use storage::RedbStore;
pub use trigger::{TriggerResolution, UpdateEstimate, resolve_trigger};
