//! # redb-backed Snapshot Store
//!
//! A disk-backed store for ingested Region and Nation rows using the redb
//! embedded database.
//!
//! One store file corresponds to exactly one snapshot. The whole snapshot
//! is written in a single ACID transaction, so a store is either fully
//! populated or empty; callers use [`RedbStore::is_populated`] to decide
//! whether the ingest pipeline can be skipped for a given snapshot
//! identifier.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

use crate::ingest::SnapshotRecords;
use crate::types::{Nation, Region, TidemarkError, UpdateStatistics, canonical_name};

/// Table for regions: index (u32) -> serialized Region bytes.
const REGIONS: TableDefinition<u32, &[u8]> = TableDefinition::new("regions");

/// Table for the name index: canonical region name -> region index.
const REGION_NAMES: TableDefinition<&str, u32> = TableDefinition::new("region_names");

/// Table for nations: global id (u64) -> serialized Nation bytes.
const NATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("nations");

/// Table mapping region index -> first nation id in that region.
///
/// Nation ids of one region are contiguous, so the first id is enough to
/// recover a representative nation for the region.
const REGION_FIRST_NATION: TableDefinition<u32, u64> = TableDefinition::new("region_first_nation");

/// Table for derived metadata: key -> serialized bytes.
const METADATA: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

const STATISTICS_KEY: &str = "update_statistics";

/// A disk-backed snapshot store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a snapshot store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TidemarkError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| TidemarkError::Storage(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(REGIONS)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(REGION_NAMES)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(NATIONS)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(REGION_FIRST_NATION)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Whether this store already holds an ingested snapshot.
    pub fn is_populated(&self) -> Result<bool, TidemarkError> {
        Ok(self.region_count()? > 0)
    }

    /// Insert an entire snapshot batch in one ACID transaction.
    ///
    /// Grouping all rows into a single transaction keeps fsync overhead at
    /// O(1) and guarantees the `index`/`id` contiguity invariant is either
    /// fully visible or not at all.
    pub fn insert_snapshot(&mut self, records: &SnapshotRecords) -> Result<(), TidemarkError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;

        {
            let mut regions_table = write_txn
                .open_table(REGIONS)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let mut names_table = write_txn
                .open_table(REGION_NAMES)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let mut nations_table = write_txn
                .open_table(NATIONS)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let mut first_nation_table = write_txn
                .open_table(REGION_FIRST_NATION)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;

            for region in &records.regions {
                let bytes = postcard::to_allocvec(region)
                    .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
                regions_table
                    .insert(region.index, bytes.as_slice())
                    .map_err(|e| TidemarkError::Storage(e.to_string()))?;
                names_table
                    .insert(region.key().as_str(), region.index)
                    .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            }

            for nation in &records.nations {
                let bytes = postcard::to_allocvec(nation)
                    .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
                nations_table
                    .insert(nation.id, bytes.as_slice())
                    .map_err(|e| TidemarkError::Storage(e.to_string()))?;
                let first = first_nation_table
                    .get(nation.region_index)
                    .map_err(|e| TidemarkError::Storage(e.to_string()))?
                    .map(|v| v.value());
                if first.is_none() {
                    first_nation_table
                        .insert(nation.region_index, nation.id)
                        .map_err(|e| TidemarkError::Storage(e.to_string()))?;
                }
            }
        }

        write_txn
            .commit()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Persist the derived statistics row.
    pub fn put_statistics(&mut self, stats: &UpdateStatistics) -> Result<(), TidemarkError> {
        let bytes = postcard::to_allocvec(stats)
            .map_err(|e| TidemarkError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        {
            let mut meta_table = write_txn
                .open_table(METADATA)
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
            meta_table
                .insert(STATISTICS_KEY, bytes.as_slice())
                .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;

        Ok(())
    }

    /// The derived statistics row, if ingestion has completed.
    pub fn statistics(&self) -> Result<Option<UpdateStatistics>, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(METADATA)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let Some(bytes) = table
            .get(STATISTICS_KEY)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };
        let stats = postcard::from_bytes(bytes.value())
            .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
        Ok(Some(stats))
    }

    /// Exact lookup by canonical region name.
    pub fn region_by_name(&self, name: &str) -> Result<Option<Region>, TidemarkError> {
        let key = canonical_name(name);
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let names_table = read_txn
            .open_table(REGION_NAMES)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let Some(index) = names_table
            .get(key.as_str())
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
            .map(|v| v.value())
        else {
            return Ok(None);
        };
        drop(names_table);
        self.read_region(&read_txn, index)
    }

    /// Lookup by region index.
    pub fn region_by_index(&self, index: u32) -> Result<Option<Region>, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        self.read_region(&read_txn, index)
    }

    fn read_region(
        &self,
        read_txn: &redb::ReadTransaction,
        index: u32,
    ) -> Result<Option<Region>, TidemarkError> {
        let table = read_txn
            .open_table(REGIONS)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let Some(bytes) = table
            .get(index)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };
        let region = postcard::from_bytes(bytes.value())
            .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
        Ok(Some(region))
    }

    /// Lookup by global nation id.
    pub fn nation_by_id(&self, id: u64) -> Result<Option<Nation>, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(NATIONS)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let Some(bytes) = table
            .get(id)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };
        let nation = postcard::from_bytes(bytes.value())
            .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
        Ok(Some(nation))
    }

    /// The representative (first) nation of a region, used as the region's
    /// position proxy in the global update order.
    pub fn first_nation_in_region(&self, index: u32) -> Result<Option<Nation>, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(REGION_FIRST_NATION)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let Some(id) = table
            .get(index)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
            .map(|v| v.value())
        else {
            return Ok(None);
        };
        drop(table);
        drop(read_txn);
        self.nation_by_id(id)
    }

    /// All region rows in index order, for the aggregation pass.
    pub fn regions(&self) -> Result<Vec<Region>, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(REGIONS)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let mut regions = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?
        {
            let (_, bytes) = entry.map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let region: Region = postcard::from_bytes(bytes.value())
                .map_err(|e| TidemarkError::Serialization(e.to_string()))?;
            regions.push(region);
        }
        Ok(regions)
    }

    /// Number of stored regions.
    pub fn region_count(&self) -> Result<u64, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(REGIONS)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        table
            .len()
            .map_err(|e| TidemarkError::Storage(e.to_string()))
    }

    /// Number of stored nations.
    pub fn nation_count(&self) -> Result<u64, TidemarkError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(NATIONS)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        table
            .len()
            .map_err(|e| TidemarkError::Storage(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{RawRegion, TagSets, build_records};
    use crate::types::SnapshotFreshness;

    fn sample_records() -> SnapshotRecords {
        let raw = vec![
            RawRegion {
                name: "First Region".to_string(),
                num_nations: 2,
                nations: vec!["n0".to_string(), "n1".to_string()],
                delegate: "n0".to_string(),
                delegate_auth: "XB".to_string(),
                last_update: Some(100.0),
                last_major_update: Some(100.0),
                last_minor_update: Some(50.0),
                ..RawRegion::default()
            },
            RawRegion {
                name: "Second Region".to_string(),
                num_nations: 1,
                nations: vec!["n2".to_string()],
                delegate: "n2".to_string(),
                delegate_auth: "W".to_string(),
                last_update: Some(200.0),
                last_major_update: Some(200.0),
                last_minor_update: Some(150.0),
                ..RawRegion::default()
            },
        ];
        build_records(&raw, &TagSets::default(), SnapshotFreshness::Historical)
    }

    fn temp_store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbStore::open(dir.path().join("test.db")).expect("open store");
        (dir, store)
    }

    #[test]
    fn fresh_store_is_unpopulated() {
        let (_dir, store) = temp_store();
        assert!(!store.is_populated().expect("is_populated"));
        assert!(store.statistics().expect("statistics").is_none());
    }

    #[test]
    fn insert_and_lookup_round_trip() {
        let (_dir, mut store) = temp_store();
        store.insert_snapshot(&sample_records()).expect("insert");

        assert!(store.is_populated().expect("is_populated"));
        assert_eq!(store.region_count().expect("count"), 2);
        assert_eq!(store.nation_count().expect("count"), 3);

        let by_name = store
            .region_by_name("first region")
            .expect("lookup")
            .expect("present");
        assert_eq!(by_name.index, 0);
        assert_eq!(by_name.name, "First Region");

        let by_index = store
            .region_by_index(1)
            .expect("lookup")
            .expect("present");
        assert_eq!(by_index.name, "Second Region");

        let nation = store.nation_by_id(2).expect("lookup").expect("present");
        assert_eq!(nation.name, "n2");
        assert_eq!(nation.region_index, 1);

        assert!(store.region_by_name("no such region").expect("lookup").is_none());
        assert!(store.nation_by_id(99).expect("lookup").is_none());
    }

    #[test]
    fn first_nation_is_region_representative() {
        let (_dir, mut store) = temp_store();
        store.insert_snapshot(&sample_records()).expect("insert");

        let rep = store
            .first_nation_in_region(0)
            .expect("lookup")
            .expect("present");
        assert_eq!(rep.id, 0);

        let rep = store
            .first_nation_in_region(1)
            .expect("lookup")
            .expect("present");
        assert_eq!(rep.id, 2);
    }

    #[test]
    fn statistics_round_trip() {
        let (_dir, mut store) = temp_store();
        let stats = UpdateStatistics {
            total_nations: 3,
            major_span: 100.0,
            minor_span: 100.0,
            tpn_major: 100.0 / 3.0,
            tpn_minor: 100.0 / 3.0,
            major_floor: 100.0,
            minor_floor: 50.0,
        };
        store.put_statistics(&stats).expect("put");
        let loaded = store.statistics().expect("get").expect("present");
        assert_eq!(loaded, stats);
    }

    #[test]
    fn regions_returns_index_order() {
        let (_dir, mut store) = temp_store();
        store.insert_snapshot(&sample_records()).expect("insert");
        let regions = store.regions().expect("regions");
        let indices: Vec<u32> = regions.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
