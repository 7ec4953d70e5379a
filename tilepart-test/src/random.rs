use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tilepart_compiler::program::wparid_mask;
use tilepart_compiler::{
    construct_dynamic, construct_static, estimate_space_required, select_partition_for_walker, PartitionArgs,
    SelectorPolicy,
};
use tilepart_core::command::ComputeWalker;
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

const GPU_BASE: u64 = 0x1_0000;

fn random_walker(rng: &mut SmallRng) -> ComputeWalker {
    ComputeWalker::new([
        rng.gen_range(1..=4096),
        rng.gen_range(1..=64),
        rng.gen_range(1..=8),
    ])
}

fn construct(
    stream: &mut CommandStream,
    isa: &dyn InstructionSet,
    hw: &HardwareInfo,
    walker: &ComputeWalker,
    args: &PartitionArgs,
) -> Result<usize, TilepartError> {
    if args.static_partitioning {
        construct_static(stream, isa, hw, walker, args)
    } else {
        construct_dynamic(stream, isa, hw, walker, args)
    }
}

/// Partitions picked by the selector always fit the estimated space
pub fn selected_walkers(isa: &dyn InstructionSet) -> Result<(), TilepartError> {
    let mut rng = SmallRng::seed_from_u64(0x7153);
    let hw = HardwareInfo::new(isa.family());
    for _ in 0..2000 {
        let mut walker = random_walker(&mut rng);
        let tile_count = rng.gen_range(1..=4);
        let prefer_static = rng.gen();
        let policy = SelectorPolicy {
            minimal_partition_size: [0, 64, 512][rng.gen_range(0..3)],
            ..Default::default()
        };
        let selection = select_partition_for_walker(&mut walker, tile_count, prefer_static, rng.gen(), &policy)?;
        if prefer_static {
            assert_eq!(selection.partition_count, tile_count);
        } else {
            assert!(selection.partition_count <= 16);
            assert!(selection.partition_count == 0 || selection.partition_count.is_power_of_two());
        }
        if selection.is_disabled() || (!prefer_static && wparid_mask(selection.partition_count).is_err()) {
            continue;
        }
        let args = PartitionArgs {
            partition_count: selection.partition_count,
            tile_count,
            static_partitioning: selection.static_partitioning,
            emit_self_cleanup: rng.gen(),
            emit_batch_buffer_end: rng.gen(),
            synchronize_before_execution: rng.gen(),
            ..Default::default()
        };
        let estimate = estimate_space_required(isa, &args);
        let mut buf = vec![0u8; estimate];
        let mut stream = CommandStream::new(&mut buf, GPU_BASE);
        let programmed = construct(&mut stream, isa, &hw, &walker, &args)?;
        assert_eq!(programmed, estimate, "{walker:?} {args:?}");
    }
    Ok(())
}

/// One byte short of the estimate fails without writing anything
pub fn exact_capacity(isa: &dyn InstructionSet) -> Result<(), TilepartError> {
    let mut rng = SmallRng::seed_from_u64(42);
    let hw = HardwareInfo::new(isa.family());
    for static_partitioning in [false, true] {
        let walker = random_walker(&mut rng);
        let args = PartitionArgs {
            partition_count: if static_partitioning { 2 } else { 8 },
            tile_count: 2,
            static_partitioning,
            emit_self_cleanup: true,
            ..Default::default()
        };
        let estimate = estimate_space_required(isa, &args);
        let mut buf = vec![0xCDu8; estimate - 1];
        let mut stream = CommandStream::new(&mut buf, GPU_BASE);
        match construct(&mut stream, isa, &hw, &walker, &args) {
            Err(TilepartError::BufferOverflow { required, available }) => {
                assert_eq!(required, estimate);
                assert_eq!(available, estimate - 1);
            }
            res => panic!("Expected overflow, got {res:?}"),
        }
        assert_eq!(stream.used(), 0);
        assert!(buf.iter().all(|b| *b == 0xCD));
    }
    Ok(())
}
