//! Dynamic partitioning, tiles pick partitions at execution time.
//!
//! Buffer layout for 16 partitions on 4 tiles:
//!
//! ```text
//! LOAD_REGISTER_IMM    predication mask
//! MI_ATOMIC            partition_count += 1, old value into GPR4
//! LOAD_REGISTER_REG    GPR4 -> WPARID
//! MI_SET_PREDICATE     noop on non zero WPARID
//! BATCH_BUFFER_START   walker section, skipped once ids run out
//! MI_SET_PREDICATE     disable
//! PIPE_CONTROL         dc flush
//! MI_ATOMIC            tile_count += 1
//! MI_SEMAPHORE_WAIT    tile_count >= 4
//! BATCH_BUFFER_START   end of control section
//! COMPUTE_WALKER       walker section
//! BATCH_BUFFER_START   buffer start
//! control section
//! BATCH_BUFFER_END
//! ```

use crate::args::PartitionArgs;
use crate::estimate::{dynamic_control_section_offset, estimate_dynamic_size, walker_section_start};
use crate::layout::DynamicControlSection;
use crate::program::{
    cleanup_rendezvous_count, program_batch_buffer_start, program_load_register_mem, program_load_register_reg,
    program_partitioned_walker, program_pipe_control, program_self_cleanup_end_section,
    program_self_cleanup_section, program_tiles_synchronization_with_atomics,
    program_tiles_synchronization_with_post_syncs, program_wparid_mask,
    program_wparid_predication, wparid_mask,
};
use tilepart_core::command::{
    Command, ComputeWalker, MiAtomic, GENERAL_PURPOSE_REGISTER_4, WPARID_CCS_OFFSET,
};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

/// Emit dynamically partitioned walker at the current stream position.
///
/// Returns bytes programmed. Nothing is written if the partition count has
/// no predication mask or the stream cannot hold the whole buffer.
pub fn construct_dynamic<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    hw: &HardwareInfo,
    walker: &ComputeWalker,
    args: &PartitionArgs,
) -> Result<usize, TilepartError> {
    wparid_mask(args.partition_count)?;
    if args.emit_self_cleanup {
        cleanup_rendezvous_count(args.tile_count)?;
    }
    stream.ensure_capacity(estimate_dynamic_size(isa, args))?;

    let start = stream.used();
    let base = stream.current_gpu_address();
    let control_section_offset = dynamic_control_section_offset(isa, args) as u64;
    let control_section = base + control_section_offset;

    if args.synchronize_before_execution {
        program_tiles_synchronization_with_atomics(
            stream,
            isa,
            control_section + DynamicControlSection::IN_TILE_COUNT_OFFSET,
            args.tile_count,
        )?;
    }

    program_wparid_mask(stream, isa, args.partition_count)?;
    stream.append(isa, &Command::Atomic(MiAtomic::increment(control_section, true)))?;
    program_load_register_reg(stream, isa, GENERAL_PURPOSE_REGISTER_4, WPARID_CCS_OFFSET)?;
    program_wparid_predication(stream, isa, true)?;
    program_batch_buffer_start(
        stream,
        isa,
        base + walker_section_start(isa, args) as u64,
        true,
        args.secondary_batch_buffer,
    )?;
    program_wparid_predication(stream, isa, false)?;

    if args.emit_self_cleanup {
        program_self_cleanup_section(
            stream,
            isa,
            control_section + DynamicControlSection::FINAL_SYNC_TILE_COUNT_OFFSET,
            args.use_atomics_for_self_cleanup,
        )?;
    }
    if args.emit_pipe_control_stall {
        program_pipe_control(stream, isa, hw, true)?;
    }
    if args.semaphore_programming_required {
        program_tiles_synchronization_with_post_syncs(stream, isa, walker, args.partition_count)?;
    }
    if args.cross_tile_atomic_synchronization || args.emit_self_cleanup {
        program_tiles_synchronization_with_atomics(
            stream,
            isa,
            control_section + DynamicControlSection::TILE_COUNT_OFFSET,
            args.tile_count,
        )?;
    }
    if args.preferred_static_partitioning {
        program_load_register_mem(stream, isa, args.work_partition_allocation_gpu_va, WPARID_CCS_OFFSET)?;
    }

    program_batch_buffer_start(
        stream,
        isa,
        control_section + DynamicControlSection::SIZE as u64,
        false,
        args.secondary_batch_buffer,
    )?;

    // walker section
    program_partitioned_walker(stream, isa, walker, args.partition_count)?;
    program_batch_buffer_start(stream, isa, base, false, args.secondary_batch_buffer)?;

    debug_assert_eq!(stream.current_gpu_address(), control_section);
    stream.append_zeroed(DynamicControlSection::SIZE)?;

    if args.emit_self_cleanup {
        program_self_cleanup_end_section(
            stream,
            isa,
            control_section + DynamicControlSection::FINAL_SYNC_TILE_COUNT_OFFSET,
            control_section,
            DynamicControlSection::FIELDS_FOR_CLEANUP,
            args.tile_count,
            args.use_atomics_for_self_cleanup,
        )?;
    }
    if args.emit_batch_buffer_end {
        stream.append(isa, &Command::BatchBufferEnd)?;
    }
    Ok(stream.used() - start)
}
