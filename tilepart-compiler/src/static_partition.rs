//! Static partitioning, every tile runs its own partition id loaded from
//! a host filled allocation.

use crate::args::PartitionArgs;
use crate::estimate::{estimate_static_size, static_control_section_offset};
use crate::layout::StaticControlSection;
use crate::program::{
    cleanup_rendezvous_count, program_batch_buffer_start, program_load_register_mem, program_partitioned_walker,
    program_pipe_control, program_self_cleanup_end_section, program_self_cleanup_section,
    program_tiles_synchronization_with_atomics, program_tiles_synchronization_with_post_syncs,
};
use tilepart_core::command::{ComputeWalker, WPARID_CCS_OFFSET};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

/// Emit statically partitioned walker, returns bytes programmed
pub fn construct_static<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    hw: &HardwareInfo,
    walker: &ComputeWalker,
    args: &PartitionArgs,
) -> Result<usize, TilepartError> {
    if args.emit_self_cleanup {
        cleanup_rendezvous_count(args.tile_count)?;
    }
    stream.ensure_capacity(estimate_static_size(isa, args))?;

    let start = stream.used();
    let base = stream.current_gpu_address();
    let control_section = base + static_control_section_offset(isa, args) as u64;
    let after_control_section = control_section + StaticControlSection::SIZE as u64;

    if args.synchronize_before_execution {
        program_tiles_synchronization_with_atomics(
            stream,
            isa,
            control_section + StaticControlSection::SYNCHRONIZE_BEFORE_WALKER_OFFSET,
            args.tile_count,
        )?;
    }
    if args.initialize_wparid_register {
        program_load_register_mem(stream, isa, args.work_partition_allocation_gpu_va, WPARID_CCS_OFFSET)?;
    }
    program_partitioned_walker(stream, isa, walker, args.partition_count)?;

    if args.emit_self_cleanup {
        program_self_cleanup_section(
            stream,
            isa,
            control_section + StaticControlSection::FINAL_SYNC_TILE_COUNTER_OFFSET,
            args.use_atomics_for_self_cleanup,
        )?;
    }
    if args.emit_pipe_control_stall {
        // flush L3
        program_pipe_control(stream, isa, hw, true)?;
    }
    if args.semaphore_programming_required {
        program_tiles_synchronization_with_post_syncs(stream, isa, walker, args.partition_count)?;
    }
    if args.cross_tile_atomic_synchronization || args.emit_self_cleanup {
        program_tiles_synchronization_with_atomics(
            stream,
            isa,
            control_section + StaticControlSection::SYNCHRONIZE_AFTER_WALKER_OFFSET,
            args.tile_count,
        )?;
    }
    program_batch_buffer_start(stream, isa, after_control_section, false, args.secondary_batch_buffer)?;

    debug_assert_eq!(stream.current_gpu_address(), control_section);
    stream.append_zeroed(StaticControlSection::SIZE)?;

    if args.emit_self_cleanup {
        program_self_cleanup_end_section(
            stream,
            isa,
            control_section + StaticControlSection::FINAL_SYNC_TILE_COUNTER_OFFSET,
            control_section,
            StaticControlSection::FIELDS_FOR_CLEANUP,
            args.tile_count,
            args.use_atomics_for_self_cleanup,
        )?;
    }
    Ok(stream.used() - start)
}
