//! # Snapshot Dump Pipeline
//!
//! Turns a daily snapshot dump (gzipped XML) into a populated store:
//!
//! 1. Derive the store path from the dump name; an existing store
//!    short-circuits the whole pipeline (one ingest per snapshot).
//! 2. Download the dump if it is not present locally.
//! 3. Decompress and parse into ordered raw region records.
//! 4. For a current-day dump, fetch the three tag lists concurrently.
//! 5. Build rows, commit them as one batch, derive and persist statistics.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{info, warn};

use tidemark_core::{
    RawRegion, RedbStore, SnapshotFreshness, TagSets, TidemarkError, build_records,
    compute_statistics,
};

use crate::net::NsClient;

// =============================================================================
// NAME TRANSFORMS
// =============================================================================

/// The dump name for a given day, e.g. `regions.08.28.2026.xml.gz`.
pub fn default_dump_name(today: NaiveDate) -> String {
    format!("regions.{}.xml.gz", today.format("%m.%d.%Y"))
}

/// Deterministic store path for a dump name.
///
/// Pure string transform so the same snapshot always maps to the same
/// store file, which is what makes ingestion idempotent.
pub fn store_path_for(dump_name: &str) -> String {
    dump_name.replace("regions", "data").replace(".xml.gz", ".db")
}

/// A dump is current iff its name embeds today's date in the default
/// naming shape; anything else is treated as historical.
pub fn freshness_of(dump_name: &str, today: NaiveDate) -> SnapshotFreshness {
    let stamp = today.format("%m.%d.%Y").to_string();
    if dump_name.contains(&stamp) {
        SnapshotFreshness::Current
    } else {
        SnapshotFreshness::Historical
    }
}

// =============================================================================
// DUMP XML
// =============================================================================

#[derive(Debug, Deserialize)]
struct DumpPayload {
    #[serde(rename = "REGION", default)]
    regions: Vec<DumpRegion>,
}

#[derive(Debug, Deserialize)]
struct DumpRegion {
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "NUMNATIONS", default)]
    num_nations: u32,
    /// Colon-separated member nation names.
    #[serde(rename = "NATIONS", default)]
    nations: String,
    #[serde(rename = "DELEGATE", default)]
    delegate: String,
    #[serde(rename = "DELEGATEVOTES", default)]
    delegate_votes: u32,
    #[serde(rename = "DELEGATEAUTH", default)]
    delegate_auth: String,
    #[serde(rename = "FOUNDER", default)]
    founder: String,
    #[serde(rename = "FOUNDERAUTH", default)]
    founder_auth: String,
    #[serde(rename = "FACTBOOK", default)]
    factbook: String,
    #[serde(rename = "EMBASSIES", default)]
    embassies: EmbassiesPayload,
    #[serde(rename = "LASTUPDATE", default)]
    last_update: Option<f64>,
    #[serde(rename = "LASTMAJORUPDATE", default)]
    last_major_update: Option<f64>,
    #[serde(rename = "LASTMINORUPDATE", default)]
    last_minor_update: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbassiesPayload {
    #[serde(rename = "EMBASSY", default)]
    embassies: Vec<String>,
}

impl From<DumpRegion> for RawRegion {
    fn from(dump: DumpRegion) -> Self {
        Self {
            name: dump.name,
            num_nations: dump.num_nations,
            nations: dump
                .nations
                .split(':')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            delegate: dump.delegate,
            delegate_votes: dump.delegate_votes,
            delegate_auth: dump.delegate_auth,
            founder: dump.founder,
            founder_auth: dump.founder_auth,
            factbook: dump.factbook,
            embassies: dump.embassies.embassies,
            last_update: dump.last_update,
            last_major_update: dump.last_major_update,
            last_minor_update: dump.last_minor_update,
        }
    }
}

/// Parse a decompressed dump into ordered raw region records.
///
/// A structurally malformed dump is fatal; individually malformed records
/// are handled later by the record builder.
fn parse_dump(xml: &str) -> Result<Vec<RawRegion>, TidemarkError> {
    let payload: DumpPayload = quick_xml::de::from_str(xml)
        .map_err(|e| TidemarkError::Snapshot(format!("malformed dump: {e}")))?;
    Ok(payload.regions.into_iter().map(RawRegion::from).collect())
}

/// Read and decompress a gzipped dump file.
fn read_dump_file(path: &Path) -> Result<String, TidemarkError> {
    let file = std::fs::File::open(path)
        .map_err(|e| TidemarkError::Snapshot(format!("{}: {e}", path.display())))?;
    let mut decoder = GzDecoder::new(file);
    let mut xml = String::new();
    decoder
        .read_to_string(&mut xml)
        .map_err(|e| TidemarkError::Snapshot(format!("{}: {e}", path.display())))?;
    Ok(xml)
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Open the store for a dump, running the ingest pipeline at most once.
///
/// If a store already exists for this dump name the expensive pipeline is
/// skipped entirely and the existing store is returned unchanged.
pub async fn prepare_store(
    client: &NsClient,
    dump_name: &str,
    today: NaiveDate,
) -> Result<RedbStore, TidemarkError> {
    let db_path = store_path_for(dump_name);
    if Path::new(&db_path).exists() {
        info!(store = %db_path, "existing store found, skipping snapshot processing");
        return RedbStore::open(&db_path);
    }

    if !Path::new(dump_name).exists() {
        info!(dump = %dump_name, "snapshot not found locally, downloading");
        client.download_dump(Path::new(dump_name)).await?;
    }

    info!(dump = %dump_name, "decompressing and parsing snapshot");
    let xml = read_dump_file(Path::new(dump_name))?;
    let raw = parse_dump(&xml)?;

    let freshness = freshness_of(dump_name, today);
    let tags = match freshness {
        SnapshotFreshness::Current => {
            info!("fetching governorless, password and frontier tag lists");
            let (governorless, password, frontier) = tokio::try_join!(
                client.regions_by_tag("governorless"),
                client.regions_by_tag("password"),
                client.regions_by_tag("frontier"),
            )?;
            TagSets::new(governorless, password, frontier)
        }
        SnapshotFreshness::Historical => {
            info!("historical snapshot, leaving tag enrichment unset");
            TagSets::default()
        }
    };

    let records = build_records(&raw, &tags, freshness);
    if records.skipped > 0 {
        warn!(skipped = records.skipped, "malformed snapshot records were skipped");
    }

    info!(
        regions = records.regions.len(),
        nations = records.nations.len(),
        "committing snapshot batch"
    );
    let mut store = RedbStore::open(&db_path)?;
    store.insert_snapshot(&records)?;

    // Aggregation pass runs over the committed rows, not the in-memory batch.
    let regions = store.regions()?;
    let stats = compute_statistics(&regions, store.nation_count()?)?;
    store.put_statistics(&stats)?;

    Ok(store)
}

// =============================================================================
// TESTS
// =============================================================================
