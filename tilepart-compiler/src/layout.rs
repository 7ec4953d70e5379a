//! Control sections, counter blocks placed right after the instruction body.
//!
//! Every counter is a little endian `u32` mutated only by the GPU. The last
//! counter of each section is the final sync counter used by self-cleanup,
//! the leading ones are zeroed again by the cleanup end section.

/// Dynamic partitioning counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DynamicControlSection {
    /// Next partition id, incremented with return data by every visit
    pub partition_count: u32,
    /// Tiles that left the partition loop
    pub tile_count: u32,
    /// Tiles that entered the buffer
    pub in_tile_count: u32,
    pub final_sync_tile_count: u32,
}

impl DynamicControlSection {
    pub const SIZE: usize = 16;
    pub const PARTITION_COUNT_OFFSET: u64 = 0;
    pub const TILE_COUNT_OFFSET: u64 = 4;
    pub const IN_TILE_COUNT_OFFSET: u64 = 8;
    pub const FINAL_SYNC_TILE_COUNT_OFFSET: u64 = 12;
    /// Counters zeroed by the cleanup end section
    pub const FIELDS_FOR_CLEANUP: usize = 3;

    /// Read section from emitted bytes, None if `bytes` is too short
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<DynamicControlSection> {
        let [partition_count, tile_count, in_tile_count, final_sync_tile_count] = read_counters(bytes)?;
        Some(DynamicControlSection {
            partition_count,
            tile_count,
            in_tile_count,
            final_sync_tile_count,
        })
    }
}

/// Static partitioning counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StaticControlSection {
    pub synchronize_before_walker_counter: u32,
    pub synchronize_after_walker_counter: u32,
    pub final_sync_tile_counter: u32,
}

impl StaticControlSection {
    pub const SIZE: usize = 12;
    pub const SYNCHRONIZE_BEFORE_WALKER_OFFSET: u64 = 0;
    pub const SYNCHRONIZE_AFTER_WALKER_OFFSET: u64 = 4;
    pub const FINAL_SYNC_TILE_COUNTER_OFFSET: u64 = 8;
    pub const FIELDS_FOR_CLEANUP: usize = 2;

    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<StaticControlSection> {
        let [before, after, last] = read_counters(bytes)?;
        Some(StaticControlSection {
            synchronize_before_walker_counter: before,
            synchronize_after_walker_counter: after,
            final_sync_tile_counter: last,
        })
    }
}

/// Barrier counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BarrierControlSection {
    pub cross_tile_sync_count: u32,
    pub final_sync_tile_count: u32,
}

impl BarrierControlSection {
    pub const SIZE: usize = 8;
    pub const CROSS_TILE_SYNC_COUNT_OFFSET: u64 = 0;
    pub const FINAL_SYNC_TILE_COUNT_OFFSET: u64 = 4;
    pub const FIELDS_FOR_CLEANUP: usize = 1;

    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<BarrierControlSection> {
        let [cross_tile_sync_count, final_sync_tile_count] = read_counters(bytes)?;
        Some(BarrierControlSection {
            cross_tile_sync_count,
            final_sync_tile_count,
        })
    }
}

fn read_counters<const N: usize>(bytes: &[u8]) -> Option<[u32; N]> {
    if bytes.len() < N * 4 {
        return None;
    }
    let mut counters = [0u32; N];
    for (counter, chunk) in counters.iter_mut().zip(bytes.chunks_exact(4)) {
        *counter = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(counters)
}

#[test]
fn short_slices_are_not_sections() {
    assert_eq!(BarrierControlSection::parse(&[0; 7]), None);
    assert_eq!(
        StaticControlSection::parse(&[1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0xFF]),
        Some(StaticControlSection {
            synchronize_before_walker_counter: 1,
            synchronize_after_walker_counter: 2,
            final_sync_tile_counter: 3,
        })
    );
}
