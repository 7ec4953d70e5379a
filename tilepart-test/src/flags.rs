use crate::check_layout;
use itertools::Itertools;
use tilepart_compiler::estimate::{
    barrier_control_section_offset, dynamic_control_section_offset, static_control_section_offset,
};
use tilepart_compiler::layout::{BarrierControlSection, DynamicControlSection, StaticControlSection};
use tilepart_compiler::{
    construct_barrier, construct_dynamic, construct_static, estimate_barrier_size, estimate_dynamic_size,
    estimate_static_size, FlushArgs, PartitionArgs,
};
use tilepart_core::command::{ComputeWalker, PartitionType};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

const GPU_BASE: u64 = 0xFF_0000_1000;

fn flag_space(flags: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..flags).map(|_| [false, true]).multi_cartesian_product()
}

fn walker() -> ComputeWalker {
    let mut walker = ComputeWalker::new([256, 4, 1]);
    walker.partition_type = PartitionType::X;
    walker
}

pub fn dynamic(isa: &dyn InstructionSet) -> Result<(), TilepartError> {
    let hw = HardwareInfo::new(isa.family());
    for flags in flag_space(10) {
        for (partition_count, tile_count) in [2, 4, 8, 16, 32].into_iter().cartesian_product([2, 4]) {
            let args = PartitionArgs {
                partition_count,
                tile_count,
                synchronize_before_execution: flags[0],
                cross_tile_atomic_synchronization: flags[1],
                semaphore_programming_required: flags[2],
                emit_self_cleanup: flags[3],
                use_atomics_for_self_cleanup: flags[4],
                emit_batch_buffer_end: flags[5],
                emit_pipe_control_stall: flags[6],
                preferred_static_partitioning: flags[7],
                secondary_batch_buffer: flags[8],
                initialize_wparid_register: flags[9],
                work_partition_allocation_gpu_va: 0xB000,
                ..Default::default()
            };
            let estimate = estimate_dynamic_size(isa, &args);
            let mut buf = vec![0xCDu8; estimate + 64];
            let mut stream = CommandStream::new(&mut buf, GPU_BASE);
            let programmed = construct_dynamic(&mut stream, isa, &hw, &walker(), &args)?;
            assert_eq!(programmed, estimate, "{args:?}");
            assert_eq!(stream.used(), estimate, "{args:?}");
            check_layout(
                isa,
                stream.as_bytes(),
                dynamic_control_section_offset(isa, &args),
                DynamicControlSection::SIZE,
            )?;
        }
    }
    Ok(())
}

pub fn static_partition(isa: &dyn InstructionSet) -> Result<(), TilepartError> {
    let hw = HardwareInfo::new(isa.family());
    for flags in flag_space(8) {
        for tile_count in [2, 3, 4] {
            let args = PartitionArgs {
                partition_count: tile_count,
                tile_count,
                static_partitioning: true,
                synchronize_before_execution: flags[0],
                cross_tile_atomic_synchronization: flags[1],
                semaphore_programming_required: flags[2],
                emit_self_cleanup: flags[3],
                use_atomics_for_self_cleanup: flags[4],
                emit_pipe_control_stall: flags[5],
                secondary_batch_buffer: flags[6],
                initialize_wparid_register: flags[7],
                work_partition_allocation_gpu_va: 0xB000,
                ..Default::default()
            };
            let estimate = estimate_static_size(isa, &args);
            let mut buf = vec![0xCDu8; estimate + 64];
            let mut stream = CommandStream::new(&mut buf, GPU_BASE);
            let programmed = construct_static(&mut stream, isa, &hw, &walker(), &args)?;
            assert_eq!(programmed, estimate, "{args:?}");
            check_layout(
                isa,
                stream.as_bytes(),
                static_control_section_offset(isa, &args),
                StaticControlSection::SIZE,
            )?;
        }
    }
    Ok(())
}

pub fn barrier(isa: &dyn InstructionSet) -> Result<(), TilepartError> {
    for flags in flag_space(6) {
        let mut hw = HardwareInfo::new(isa.family());
        hw.barrier_workaround_required = flags[0];
        for tile_count in [2, 4] {
            let args = PartitionArgs {
                tile_count,
                emit_self_cleanup: flags[1],
                use_atomics_for_self_cleanup: flags[2],
                use_post_sync: flags[3],
                post_sync_gpu_address: 0xDAAB00,
                post_sync_immediate_value: 0x421,
                secondary_batch_buffer: flags[4],
                ..Default::default()
            };
            let flush = FlushArgs { dc_flush: flags[5] };
            let estimate = estimate_barrier_size(isa, &args, &hw);
            let mut buf = vec![0xCDu8; estimate + 64];
            let mut stream = CommandStream::new(&mut buf, GPU_BASE);
            let programmed = construct_barrier(&mut stream, isa, &args, &flush, &hw)?;
            assert_eq!(programmed, estimate, "{args:?} {hw:?}");
            check_layout(
                isa,
                stream.as_bytes(),
                barrier_control_section_offset(isa, &args, &hw),
                BarrierControlSection::SIZE,
            )?;
        }
    }
    Ok(())
}
