//! Partition count and dimension selection.

use tilepart_core::command::{ComputeWalker, PartitionType};
use tilepart_core::error::TilepartError;

/// Dimensions with imbalance at or below this share of thread groups
/// still count as evenly divisible
const MINIMAL_IMBALANCE_THRESHOLD: f32 = 0.05;
/// Upper bound of dynamic partition count
const MAX_DYNAMIC_PARTITION_COUNT: u32 = 16;

/// Thread group start and count of one dispatch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadExtents {
    pub start: [u32; 3],
    pub count: [u32; 3],
}

impl WorkloadExtents {
    /// Extents starting at origin
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> WorkloadExtents {
        WorkloadExtents {
            start: [0; 3],
            count: [x, y, z],
        }
    }

    #[must_use]
    pub const fn from_walker(walker: &ComputeWalker) -> WorkloadExtents {
        WorkloadExtents {
            start: walker.thread_group_start,
            count: walker.thread_group_count,
        }
    }

    /// Partitioning is only possible from a zero origin
    #[must_use]
    pub const fn is_uniform(&self) -> bool {
        self.start[0] == 0 && self.start[1] == 0 && self.start[2] == 0
    }
}

/// Tunables of the selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorPolicy {
    /// Dynamic partitions are halved while they get fewer thread groups than this, 0 disables
    pub minimal_partition_size: u32,
    /// Overrides whether the largest dimension wins over an evenly divisible one
    pub prefer_highest_dimension: Option<bool>,
    /// Partition type code replacing any requested type
    pub partition_type: Option<u32>,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        SelectorPolicy {
            minimal_partition_size: 512,
            prefer_highest_dimension: None,
            partition_type: None,
        }
    }
}

/// Result of partition selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSelection {
    pub partition_count: u32,
    pub partition_type: PartitionType,
    pub static_partitioning: bool,
}

impl PartitionSelection {
    /// Walker must be dispatched without partitioning
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.partition_type == PartitionType::Disabled || self.partition_count <= 1
    }
}

fn prev_power_of_two(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        1 << (31 - value.leading_zeros())
    }
}

fn imbalance(count: u32, tile_count: u32) -> f32 {
    (count % tile_count) as f32 / count as f32
}

/// Select partition count, partition type and static or dynamic algorithm.
///
/// `uses_images` requests partitioning along X. A partition type code in
/// `policy` replaces the request and fails if it is not X, Y or Z.
pub fn select_partition(
    extents: &WorkloadExtents,
    tile_count: u32,
    prefer_static: bool,
    uses_images: bool,
    policy: &SelectorPolicy,
) -> Result<PartitionSelection, TilepartError> {
    if !extents.is_uniform() {
        return Ok(PartitionSelection {
            partition_count: 1,
            partition_type: PartitionType::Disabled,
            static_partitioning: false,
        });
    }

    let [x, y, z] = extents.count;
    let tiles = tile_count.max(1);

    let requested = match policy.partition_type {
        Some(code) => Some(code),
        None => uses_images.then_some(PartitionType::X as u32),
    };

    let (mut partition_type, workgroup_count, disable_for_single_partition) = if let Some(code) = requested {
        let partition_type = match PartitionType::from_code(code) {
            Some(partition_type @ (PartitionType::X | PartitionType::Y | PartitionType::Z)) => partition_type,
            _ => return Err(TilepartError::InvalidPartitionType(code)),
        };
        let workgroup_count = partition_type.axis().map_or(0, |axis| extents.count[axis]);
        (partition_type, workgroup_count, false)
    } else {
        let max_dimension = x.max(y).max(z);
        let mut go_with_max = match policy.prefer_highest_dimension {
            Some(prefer) => !prefer,
            None => !prefer_static,
        };

        let mut partition_type = PartitionType::Disabled;
        if z > 1 && imbalance(z, tiles) <= MINIMAL_IMBALANCE_THRESHOLD {
            partition_type = PartitionType::Z;
        } else if y > 1 && imbalance(y, tiles) < MINIMAL_IMBALANCE_THRESHOLD {
            partition_type = PartitionType::Y;
        } else if x % tiles == 0 {
            partition_type = PartitionType::X;
        } else {
            // no dimension splits evenly
            go_with_max = true;
        }

        if go_with_max {
            partition_type = if max_dimension == x {
                PartitionType::X
            } else if max_dimension == y {
                PartitionType::Y
            } else {
                PartitionType::Z
            };
        }
        (partition_type, max_dimension, true)
    };

    if prefer_static {
        return Ok(PartitionSelection {
            partition_count: tile_count,
            partition_type,
            static_partitioning: true,
        });
    }

    let mut partition_count = prev_power_of_two(MAX_DYNAMIC_PARTITION_COUNT.min(workgroup_count));
    if policy.minimal_partition_size != 0 {
        let preferred_minimal_partition_count = tile_count.max(2);
        while partition_count > preferred_minimal_partition_count {
            if workgroup_count / partition_count >= policy.minimal_partition_size {
                break;
            }
            partition_count /= 2;
        }
    }

    if partition_count <= 1 && disable_for_single_partition {
        partition_type = PartitionType::Disabled;
    }

    Ok(PartitionSelection {
        partition_count,
        partition_type,
        static_partitioning: false,
    })
}

/// Select partitioning for `walker` and store the partition type in it
pub fn select_partition_for_walker(
    walker: &mut ComputeWalker,
    tile_count: u32,
    prefer_static: bool,
    uses_images: bool,
    policy: &SelectorPolicy,
) -> Result<PartitionSelection, TilepartError> {
    let selection = select_partition(
        &WorkloadExtents::from_walker(walker),
        tile_count,
        prefer_static,
        uses_images,
        policy,
    )?;
    walker.partition_type = selection.partition_type;
    Ok(selection)
}

#[test]
fn previous_power_of_two() {
    assert_eq!(prev_power_of_two(0), 0);
    assert_eq!(prev_power_of_two(1), 1);
    assert_eq!(prev_power_of_two(15), 8);
    assert_eq!(prev_power_of_two(16), 16);
}
