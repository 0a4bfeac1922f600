//! # Trigger Resolver
//!
//! Maps a target region to an earlier region whose update precedes the
//! target's by a requested time width, assuming uniform per-nation
//! processing time within a cycle.
//!
//! Also derives per-region estimated vs actual update offsets, used by the
//! `estimate` command to judge how well the uniform-time model fits a
//! given region.

use crate::storage::RedbStore;
use crate::types::{Nation, Region, TidemarkError, UpdateCycle, UpdateStatistics};

// =============================================================================
// TRIGGER RESOLUTION
// =============================================================================

/// The outcome of resolving a trigger for a target region.
#[derive(Debug, Clone)]
pub struct TriggerResolution {
    pub target: Region,
    pub target_nation: Nation,
    pub trigger: Region,
    pub trigger_nation: Nation,
    /// The width actually used, after defaulting.
    pub width: f64,
    /// Time-per-nation for the requested cycle.
    pub time_per_nation: f64,
}

impl TriggerResolution {
    /// How many nations the trigger precedes the target by.
    #[must_use]
    pub fn lead_nations(&self) -> u64 {
        self.target_nation.id - self.trigger_nation.id
    }
}

/// Resolve a trigger region for `target_name`.
///
/// The target's first nation is its position proxy in the global order;
/// any member would do since time-per-nation is modeled as uniform. When
/// `width` is `None` it defaults to one major-cycle nation's average time.
///
/// A width that reaches before the start (or past the end) of the update
/// order is a [`TidemarkError::TriggerOutOfRange`] boundary error, never a
/// silent clamp.
pub fn resolve_trigger(
    store: &RedbStore,
    target_name: &str,
    width: Option<f64>,
    cycle: UpdateCycle,
) -> Result<TriggerResolution, TidemarkError> {
    let stats = store
        .statistics()?
        .ok_or_else(|| TidemarkError::Storage("no update statistics; ingest a snapshot first".to_string()))?;

    let time_per_nation = stats.tpn(cycle);
    if time_per_nation <= 0.0 {
        // A cycle nothing has completed yet carries no timing information.
        return Err(TidemarkError::EmptyWorld);
    }
    let width = width.unwrap_or(stats.tpn_major);

    let target = store
        .region_by_name(target_name)?
        .ok_or_else(|| TidemarkError::RegionNotFound(target_name.to_string()))?;
    let target_nation = store
        .first_nation_in_region(target.index)?
        .ok_or_else(|| TidemarkError::RegionNotFound(target_name.to_string()))?;

    let offset = (width / time_per_nation).floor() as i64;
    let trigger_id = target_nation.id as i64 - offset;
    if trigger_id < 0 || trigger_id as u64 >= stats.total_nations {
        return Err(TidemarkError::TriggerOutOfRange {
            index: trigger_id,
            total: stats.total_nations,
        });
    }

    let trigger_nation = store
        .nation_by_id(trigger_id as u64)?
        .ok_or(TidemarkError::NationNotFound(trigger_id as u64))?;
    let trigger = store
        .region_by_index(trigger_nation.region_index)?
        .ok_or_else(|| TidemarkError::RegionNotFound(trigger_nation.name.clone()))?;

    Ok(TriggerResolution {
        target,
        target_nation,
        trigger,
        trigger_nation,
        width,
        time_per_nation,
    })
}

// =============================================================================
// UPDATE ESTIMATES
// =============================================================================

/// Estimated vs actual update offset for one region in one cycle.
///
/// Offsets are seconds from the cycle start (the earliest update timestamp
/// in the snapshot). `estimated` models uniform per-nation time; `variance`
/// is how far reality drifted from the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateEstimate {
    pub estimated: f64,
    pub actual: f64,
    pub variance: f64,
}

impl UpdateEstimate {
    /// Compute the estimate for a region whose first nation has the given
    /// global id.
    #[must_use]
    pub fn for_region(
        region: &Region,
        first_nation_id: u64,
        stats: &UpdateStatistics,
        cycle: UpdateCycle,
    ) -> Self {
        let (timestamp, floor) = match cycle {
            UpdateCycle::Major => (region.last_major_update, stats.major_floor),
            UpdateCycle::Minor => (region.last_minor_update, stats.minor_floor),
        };
        let estimated = first_nation_id as f64 * stats.tpn(cycle);
        let actual = timestamp - floor;
        Self {
            estimated,
            actual,
            variance: actual - estimated,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{RawRegion, TagSets, build_records};
    use crate::stats::compute_statistics;
    use crate::types::SnapshotFreshness;

    /// A store with 3 regions of 500, 50 and 50 nations and a major tpn
    /// of exactly 10 seconds per nation.
    fn seeded_store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("trigger.db")).expect("open");

        let sizes = [500usize, 50, 50];
        let raw: Vec<RawRegion> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let first_id: usize = sizes[..i].iter().sum();
                RawRegion {
                    name: format!("Region {i}"),
                    num_nations: size as u32,
                    nations: (0..size).map(|n| format!("nation_{}", first_id + n)).collect(),
                    // Major timestamps chosen so span / 600 nations = 10s tpn.
                    last_update: Some(first_id as f64 * 10.0),
                    last_major_update: Some(first_id as f64 * 10.0),
                    last_minor_update: Some(first_id as f64 * 5.0 + 1.0),
                    ..RawRegion::default()
                }
            })
            .collect();
        // Stretch the last region's timestamp so max-min = 6000 over 600 nations.
        let mut raw = raw;
        raw[2].last_major_update = Some(6000.0);
        raw[2].last_update = Some(6000.0);

        let records = build_records(&raw, &TagSets::default(), SnapshotFreshness::Historical);
        store.insert_snapshot(&records).expect("insert");
        let stats =
            compute_statistics(&records.regions, records.nations.len() as u64).expect("stats");
        store.put_statistics(&stats).expect("put stats");
        (dir, store)
    }

    #[test]
    fn trigger_offset_matches_width_over_tpn() {
        let (_dir, store) = seeded_store();
        // Region 1 starts at nation id 500; tpn is 10s.
        // A 150s width reaches back 15 nations: id 485, still in Region 0.
        let resolution =
            resolve_trigger(&store, "Region 1", Some(150.0), UpdateCycle::Major).expect("resolve");

        assert_eq!(resolution.target_nation.id, 500);
        assert_eq!(resolution.trigger_nation.id, 485);
        assert_eq!(resolution.trigger.name, "Region 0");
        assert_eq!(resolution.lead_nations(), 15);
    }

    #[test]
    fn width_defaults_to_one_nation_of_major_time() {
        let (_dir, store) = seeded_store();
        let resolution =
            resolve_trigger(&store, "Region 1", None, UpdateCycle::Major).expect("resolve");
        // Default width = tpn_major, so exactly one nation back.
        assert_eq!(resolution.trigger_nation.id, 499);
        assert_eq!(resolution.trigger.name, "Region 0");
    }

    #[test]
    fn oversized_width_is_a_boundary_error_not_a_clamp() {
        let (_dir, store) = seeded_store();
        // Region 0's first nation is id 0; any positive width underflows.
        let result = resolve_trigger(&store, "Region 0", Some(50.0), UpdateCycle::Major);
        assert!(matches!(
            result,
            Err(TidemarkError::TriggerOutOfRange { index: -5, total: 600 })
        ));
    }

    #[test]
    fn unknown_target_is_reported_by_name() {
        let (_dir, store) = seeded_store();
        let result = resolve_trigger(&store, "Atlantis", Some(10.0), UpdateCycle::Major);
        assert!(matches!(result, Err(TidemarkError::RegionNotFound(name)) if name == "Atlantis"));
    }

    #[test]
    fn lookup_is_case_and_format_insensitive() {
        let (_dir, store) = seeded_store();
        let resolution =
            resolve_trigger(&store, "region_1", Some(150.0), UpdateCycle::Major).expect("resolve");
        assert_eq!(resolution.target.name, "Region 1");
    }

    #[test]
    fn estimate_variance_is_actual_minus_estimated() {
        let stats = UpdateStatistics {
            total_nations: 600,
            major_span: 6000.0,
            minor_span: 3000.0,
            tpn_major: 10.0,
            tpn_minor: 5.0,
            major_floor: 1000.0,
            minor_floor: 500.0,
        };
        let region = Region {
            index: 1,
            name: "R".to_string(),
            num_nations: 10,
            delegate: String::new(),
            delegate_votes: 0,
            delegate_auth: 0,
            founder: String::new(),
            founder_auth: 0,
            factbook: String::new(),
            embassies: Vec::new(),
            last_update: 3600.0,
            last_major_update: 3600.0,
            last_minor_update: 1750.0,
            has_governor: false,
            has_password: false,
            is_frontier: false,
        };

        let major = UpdateEstimate::for_region(&region, 250, &stats, UpdateCycle::Major);
        assert!((major.estimated - 2500.0).abs() < f64::EPSILON);
        assert!((major.actual - 2600.0).abs() < f64::EPSILON);
        assert!((major.variance - 100.0).abs() < f64::EPSILON);

        let minor = UpdateEstimate::for_region(&region, 250, &stats, UpdateCycle::Minor);
        assert!((minor.estimated - 1250.0).abs() < f64::EPSILON);
        assert!((minor.actual - 1250.0).abs() < f64::EPSILON);
        assert!((minor.variance).abs() < f64::EPSILON);
    }
}
