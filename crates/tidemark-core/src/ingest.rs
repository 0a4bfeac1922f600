//! # Snapshot Ingestion
//!
//! Pure transformation from raw snapshot records into ordered Region and
//! Nation rows.
//!
//! - Region `index` = position in the snapshot sequence
//! - Nation `id` = global position across the entire snapshot
//! - Authority strings pass through the codec
//! - Enrichment flags come from the three tag lists, current snapshots only
//! - A malformed record is logged and skipped; the batch continues
//!
//! Downloading, decompression and parsing of the raw artifact belong to the
//! caller; this module only sees already-parsed [`RawRegion`]s.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::authority;
use crate::types::{Nation, Region, SnapshotFreshness, canonical_name};

// =============================================================================
// RAW INPUT
// =============================================================================

/// One region record as produced by the snapshot parser, before encoding.
///
/// Timestamps are optional because the snapshot format leaves them out for
/// pathological rows; a missing timestamp makes the record malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRegion {
    pub name: String,
    pub num_nations: u32,
    /// Member nation names in snapshot order.
    pub nations: Vec<String>,
    pub delegate: String,
    pub delegate_votes: u32,
    /// Delegate permission string, e.g. `"XWS"`.
    pub delegate_auth: String,
    pub founder: String,
    pub founder_auth: String,
    pub factbook: String,
    pub embassies: Vec<String>,
    pub last_update: Option<f64>,
    pub last_major_update: Option<f64>,
    pub last_minor_update: Option<f64>,
}

/// The three live tag-membership lists used for enrichment.
///
/// Names are stored in canonical form; membership tests canonicalize the
/// probe the same way.
#[derive(Debug, Clone, Default)]
pub struct TagSets {
    governorless: BTreeSet<String>,
    password: BTreeSet<String>,
    frontier: BTreeSet<String>,
}

impl TagSets {
    /// Build tag sets from raw name lists, canonicalizing each entry.
    #[must_use]
    pub fn new<I, S>(governorless: I, password: I, frontier: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canon = |names: I| {
            names
                .into_iter()
                .map(|n| canonical_name(n.as_ref()))
                .collect::<BTreeSet<_>>()
        };
        Self {
            governorless: canon(governorless),
            password: canon(password),
            frontier: canon(frontier),
        }
    }

    fn is_governorless(&self, key: &str) -> bool {
        self.governorless.contains(key)
    }

    fn is_passworded(&self, key: &str) -> bool {
        self.password.contains(key)
    }

    fn is_frontier(&self, key: &str) -> bool {
        self.frontier.contains(key)
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Ordered rows ready for one atomic store insert.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRecords {
    pub regions: Vec<Region>,
    pub nations: Vec<Nation>,
    /// Count of malformed records that were logged and skipped.
    pub skipped: usize,
}

// =============================================================================
// RECORD BUILDING
// =============================================================================

/// Build ordered Region and Nation rows from parsed snapshot records.
///
/// Regions are processed in input order. A record missing a cycle
/// timestamp is skipped (with a warning) and does not abort the batch;
/// indices and ids stay contiguous over the surviving records.
///
/// Enrichment flags are only set when `freshness` is
/// [`SnapshotFreshness::Current`] — live tags carry no meaning for a
/// historical snapshot.
#[must_use]
pub fn build_records(
    raw: &[RawRegion],
    tags: &TagSets,
    freshness: SnapshotFreshness,
) -> SnapshotRecords {
    let mut records = SnapshotRecords::default();
    let mut nation_id: u64 = 0;

    for raw_region in raw {
        let index = records.regions.len() as u32;
        match build_region(raw_region, index, tags, freshness) {
            Ok(region) => {
                for nation_name in &raw_region.nations {
                    records.nations.push(Nation {
                        id: nation_id,
                        name: nation_name.clone(),
                        region_index: index,
                    });
                    nation_id += 1;
                }
                records.regions.push(region);
            }
            Err(reason) => {
                warn!(region = %raw_region.name, %reason, "skipping malformed snapshot record");
                records.skipped += 1;
            }
        }
    }

    records
}

/// Build a single Region row, or explain why the record is malformed.
fn build_region(
    raw: &RawRegion,
    index: u32,
    tags: &TagSets,
    freshness: SnapshotFreshness,
) -> Result<Region, String> {
    if raw.name.trim().is_empty() {
        return Err("missing region name".to_string());
    }
    let last_update = raw.last_update.ok_or("missing last-update timestamp")?;
    let last_major_update = raw
        .last_major_update
        .ok_or("missing major-update timestamp")?;
    let last_minor_update = raw
        .last_minor_update
        .ok_or("missing minor-update timestamp")?;

    let key = canonical_name(&raw.name);
    let (has_governor, has_password, is_frontier) = match freshness {
        SnapshotFreshness::Current => (
            !tags.is_governorless(&key),
            tags.is_passworded(&key),
            tags.is_frontier(&key),
        ),
        SnapshotFreshness::Historical => (false, false, false),
    };

    Ok(Region {
        index,
        name: raw.name.clone(),
        num_nations: raw.num_nations,
        delegate: raw.delegate.clone(),
        delegate_votes: raw.delegate_votes,
        delegate_auth: authority::encode(&raw.delegate_auth),
        founder: raw.founder.clone(),
        founder_auth: authority::encode(&raw.founder_auth),
        factbook: raw.factbook.clone(),
        embassies: raw.embassies.clone(),
        last_update,
        last_major_update,
        last_minor_update,
        has_governor,
        has_password,
        is_frontier,
    })
}

// =============================================================================
// TESTS
// =============================================================================
