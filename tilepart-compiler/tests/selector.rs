use tilepart_compiler::{select_partition, select_partition_for_walker, SelectorPolicy, WorkloadExtents};
use tilepart_core::command::{ComputeWalker, PartitionType};
use tilepart_core::error::TilepartError;

fn dynamic(x: u32, y: u32, z: u32, tiles: u32, policy: &SelectorPolicy) -> (u32, PartitionType) {
    let selection = select_partition(&WorkloadExtents::new(x, y, z), tiles, false, false, policy).unwrap();
    assert!(!selection.static_partitioning);
    (selection.partition_count, selection.partition_type)
}

fn statically(x: u32, y: u32, z: u32, tiles: u32, policy: &SelectorPolicy) -> (u32, PartitionType) {
    let selection = select_partition(&WorkloadExtents::new(x, y, z), tiles, true, false, policy).unwrap();
    assert!(selection.static_partitioning);
    (selection.partition_count, selection.partition_type)
}

#[test]
fn dynamic_selection() {
    let policy = SelectorPolicy::default();
    assert_eq!(dynamic(16, 1, 1, 2, &policy), (2, PartitionType::X));
    assert_eq!(dynamic(64, 64, 64, 4, &policy), (4, PartitionType::X));
    assert_eq!(dynamic(64, 65, 64, 4, &policy), (4, PartitionType::Y));
    assert_eq!(dynamic(64, 64, 66, 4, &policy), (4, PartitionType::Z));
    assert_eq!(dynamic(32, 1024, 1, 2, &policy), (2, PartitionType::Y));
    assert_eq!(dynamic(16384, 1, 1, 2, &policy), (16, PartitionType::X));
    assert_eq!(dynamic(1, 1, 1, 4, &policy), (1, PartitionType::Disabled));
}

#[test]
fn minimal_partition_size() {
    let no_floor = SelectorPolicy {
        minimal_partition_size: 0,
        ..Default::default()
    };
    assert_eq!(dynamic(64, 64, 64, 4, &no_floor), (16, PartitionType::X));
    assert_eq!(dynamic(64, 65, 64, 4, &no_floor), (16, PartitionType::Y));
    assert_eq!(dynamic(64, 64, 66, 4, &no_floor), (16, PartitionType::Z));

    let big_floor = SelectorPolicy {
        minimal_partition_size: 4096,
        ..Default::default()
    };
    assert_eq!(dynamic(16384, 1, 1, 2, &big_floor), (4, PartitionType::X));
}

#[test]
fn largest_dimension_wins_when_nothing_splits_evenly() {
    let policy = SelectorPolicy::default();
    assert_eq!(dynamic(15, 7, 4, 4, &policy), (4, PartitionType::X));
    assert_eq!(dynamic(1, 7, 4, 4, &policy), (4, PartitionType::Y));
    assert_eq!(dynamic(1, 1, 4, 4, &policy), (4, PartitionType::Z));
}

#[test]
fn images_prefer_x() {
    let policy = SelectorPolicy::default();
    let extents = WorkloadExtents::new(8, 64, 16);
    let selection = select_partition(&extents, 4, false, false, &policy).unwrap();
    assert_eq!(selection.partition_type, PartitionType::Y);
    let selection = select_partition(&extents, 4, false, true, &policy).unwrap();
    assert_eq!(selection.partition_type, PartitionType::X);
}

#[test]
fn requested_partition_type() -> Result<(), TilepartError> {
    let extents = WorkloadExtents::new(8, 4, 2);
    let policy = SelectorPolicy::default();
    assert_eq!(select_partition(&extents, 4, false, false, &policy)?.partition_count, 4);
    for (code, expected_type, expected_count) in [
        (1, PartitionType::X, 4),
        (2, PartitionType::Y, 4),
        (3, PartitionType::Z, 2),
    ] {
        let policy = SelectorPolicy {
            partition_type: Some(code),
            ..Default::default()
        };
        let selection = select_partition(&extents, 4, false, false, &policy)?;
        assert_eq!(selection.partition_type, expected_type);
        assert_eq!(selection.partition_count, expected_count);
    }
    // a requested type survives a single partition
    let policy = SelectorPolicy {
        partition_type: Some(1),
        ..Default::default()
    };
    let selection = select_partition(&WorkloadExtents::new(1, 8, 8), 4, false, false, &policy)?;
    assert_eq!((selection.partition_count, selection.partition_type), (1, PartitionType::X));
    Ok(())
}

#[test]
fn invalid_requested_partition_type() {
    for code in [0, 4, 7] {
        let policy = SelectorPolicy {
            partition_type: Some(code),
            ..Default::default()
        };
        let result = select_partition(&WorkloadExtents::new(8, 4, 2), 4, false, false, &policy);
        assert!(matches!(result, Err(TilepartError::InvalidPartitionType(c)) if c == code));
    }
}

#[test]
fn static_selection() {
    let policy = SelectorPolicy::default();
    assert_eq!(statically(1, 1, 1, 4, &policy), (4, PartitionType::X));
    assert_eq!(statically(1, 2, 1, 4, &policy), (4, PartitionType::Y));
    assert_eq!(statically(1, 16384, 1, 4, &policy), (4, PartitionType::Y));
    assert_eq!(statically(1, 16384, 2, 2, &policy), (2, PartitionType::Z));
    assert_eq!(statically(16384, 2, 1, 2, &policy), (2, PartitionType::Y));
    assert_eq!(statically(512, 512, 513, 4, &policy), (4, PartitionType::Z));

    let highest = SelectorPolicy {
        prefer_highest_dimension: Some(false),
        ..Default::default()
    };
    assert_eq!(statically(1, 16384, 2, 2, &highest), (2, PartitionType::Y));
    assert_eq!(statically(16384, 2, 1, 2, &highest), (2, PartitionType::X));
}

#[test]
fn non_uniform_start_disables_partitioning() {
    let policy = SelectorPolicy::default();
    for start in [[1, 0, 0], [0, 1, 0], [0, 0, 1]] {
        let extents = WorkloadExtents {
            start,
            count: [16384, 16384, 16384],
        };
        for prefer_static in [false, true] {
            let selection = select_partition(&extents, 4, prefer_static, true, &policy).unwrap();
            assert_eq!(selection.partition_count, 1);
            assert_eq!(selection.partition_type, PartitionType::Disabled);
            assert!(!selection.static_partitioning);
            assert!(selection.is_disabled());
        }
    }
}

#[test]
fn walker_receives_partition_type() -> Result<(), TilepartError> {
    let mut walker = ComputeWalker::new([32, 1024, 1]);
    let selection = select_partition_for_walker(&mut walker, 2, false, false, &SelectorPolicy::default())?;
    assert_eq!(selection.partition_count, 2);
    assert_eq!(walker.partition_type, PartitionType::Y);
    Ok(())
}
