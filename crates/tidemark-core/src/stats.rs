//! # Aggregate Statistics
//!
//! Pure derivation of global cycle metrics from committed Region rows.
//!
//! The original tooling computed these figures with ad-hoc SQL views; here
//! they are an explicit function over materialized rows so the math is
//! unit-testable without a live database.

use crate::types::{Region, TidemarkError, UpdateStatistics};

/// Derive cycle spans and time-per-nation from Region timestamp extrema.
///
/// The minor-cycle figures only consider regions with a non-zero minor
/// timestamp: zero means "never completed a minor cycle in this snapshot",
/// not a valid time. An empty world (`total_nations == 0` or no regions)
/// is an error, never a silent division.
pub fn compute_statistics(
    regions: &[Region],
    total_nations: u64,
) -> Result<UpdateStatistics, TidemarkError> {
    if regions.is_empty() || total_nations == 0 {
        return Err(TidemarkError::EmptyWorld);
    }

    let mut major_min = f64::INFINITY;
    let mut major_max = f64::NEG_INFINITY;
    let mut minor_min = f64::INFINITY;
    let mut minor_max = f64::NEG_INFINITY;

    for region in regions {
        major_min = major_min.min(region.last_major_update);
        major_max = major_max.max(region.last_major_update);
        if region.last_minor_update > 0.0 {
            minor_min = minor_min.min(region.last_minor_update);
            minor_max = minor_max.max(region.last_minor_update);
        }
    }

    let major_span = major_max - major_min;
    // No region has ever minor-updated: spans and tpn stay at zero, and the
    // trigger resolver rejects the minor cycle later.
    let (minor_span, minor_floor) = if minor_min.is_finite() {
        (minor_max - minor_min, minor_min)
    } else {
        (0.0, 0.0)
    };

    let total = total_nations as f64;
    Ok(UpdateStatistics {
        total_nations,
        major_span,
        minor_span,
        tpn_major: major_span / total,
        tpn_minor: minor_span / total,
        major_floor: major_min,
        minor_floor,
    })
}

// =============================================================================
// TESTS
// =============================================================================
