//! Property-style tests for the channel mapping table
//!
//! Random update sequences over a small ssrc/slot space force frequent
//! conflicts.

use callpart_media::ChannelMappingTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn assert_partial_bijection(table: &ChannelMappingTable) {
    let ssrcs: HashSet<u32> = table.entries().iter().map(|e| e.ssrc).collect();
    let slots: HashSet<i32> = table.entries().iter().map(|e| e.channel_index).collect();
    assert_eq!(ssrcs.len(), table.len(), "duplicate ssrc in {:?}", table);
    assert_eq!(slots.len(), table.len(), "duplicate slot in {:?}", table);
}

#[test]
fn test_random_updates_keep_partial_bijection() {
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..200 {
        let mut table = ChannelMappingTable::new();
        for _ in 0..50 {
            let ssrc = rng.gen_range(1..=6u32);
            let slot = rng.gen_range(0..4i32);
            table.apply_update(ssrc, slot);

            assert_partial_bijection(&table);
            assert_eq!(table.channel_for(ssrc), Some(slot));
            assert!(table.len() <= 4);
        }
    }
}

#[test]
fn test_repeated_update_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let mut table = ChannelMappingTable::new();
        for _ in 0..10 {
            table.apply_update(rng.gen_range(1..=5u32), rng.gen_range(0..3i32));
        }

        let ssrc = rng.gen_range(1..=5u32);
        let slot = rng.gen_range(0..3i32);
        table.apply_update(ssrc, slot);
        let once = table.clone();
        table.apply_update(ssrc, slot);

        assert_eq!(table, once);
    }
}

#[test]
fn test_newest_binding_is_last() {
    let mut table = ChannelMappingTable::new();
    table.apply_update(1, 0);
    table.apply_update(2, 1);
    table.apply_update(3, 2);
    table.apply_update(1, 3);

    let order: Vec<u32> = table.entries().iter().map(|e| e.ssrc).collect();
    assert_eq!(order, vec![2, 3, 1]);
}
