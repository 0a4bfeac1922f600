//! # Property-Based Tests
//!
//! Codec and ingestion invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use tidemark_core::authority::{self, Authority};
use tidemark_core::{RawRegion, SnapshotFreshness, TagSets, build_records};

const ALPHABET: [(char, Authority); 8] = [
    ('X', Authority::Executive),
    ('W', Authority::WorldAssembly),
    ('S', Authority::Succession),
    ('A', Authority::Appearance),
    ('B', Authority::BorderControl),
    ('C', Authority::Communications),
    ('E', Authority::Embassies),
    ('P', Authority::Polls),
];

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// `has(encode(subset), p)` is true iff `p` is in the subset, for every
    /// subset of the alphabet.
    #[test]
    fn encode_preserves_subset_membership(mask in 0u8..=255) {
        let subset: String = ALPHABET
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, (code, _))| *code)
            .collect();
        let flags = authority::encode(&subset);

        for (i, (_, auth)) in ALPHABET.iter().enumerate() {
            prop_assert_eq!(authority::has(flags, *auth), mask & (1 << i) != 0);
        }
    }

    /// Character order and duplication never change the encoding.
    #[test]
    fn encode_is_order_and_duplicate_insensitive(
        indices in vec(0usize..8, 0..24)
    ) {
        let noisy: String = indices.iter().map(|&i| ALPHABET[i].0).collect();
        let mut sorted_unique: Vec<char> = indices.iter().map(|&i| ALPHABET[i].0).collect();
        sorted_unique.sort_unstable();
        sorted_unique.dedup();
        let canonical: String = sorted_unique.into_iter().collect();

        prop_assert_eq!(authority::encode(&noisy), authority::encode(&canonical));
    }

    /// Characters outside the alphabet contribute nothing.
    #[test]
    fn unknown_characters_never_set_bits(noise in "[a-z0-9 ]{0,16}") {
        prop_assert_eq!(authority::encode(&noise), 0);
        let mixed = format!("X{noise}B");
        prop_assert_eq!(authority::encode(&mixed), authority::encode("XB"));
    }

    /// Nation ids are always 0..total and contiguous per region, whatever
    /// the region sizes.
    #[test]
    fn nation_ids_are_globally_contiguous(sizes in vec(0usize..6, 1..10)) {
        let raw: Vec<RawRegion> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| RawRegion {
                name: format!("Region {i}"),
                num_nations: size as u32,
                nations: (0..size).map(|n| format!("n_{i}_{n}")).collect(),
                last_update: Some(100.0),
                last_major_update: Some(100.0),
                last_minor_update: Some(0.0),
                ..RawRegion::default()
            })
            .collect();

        let records = build_records(&raw, &TagSets::default(), SnapshotFreshness::Historical);

        let expected_total: usize = sizes.iter().sum();
        prop_assert_eq!(records.nations.len(), expected_total);

        let mut expected_id = 0u64;
        let mut last_region = 0u32;
        for nation in &records.nations {
            prop_assert_eq!(nation.id, expected_id);
            prop_assert!(nation.region_index >= last_region);
            expected_id += 1;
            last_region = nation.region_index;
        }
    }
}
