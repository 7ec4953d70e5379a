//! Cross tile barrier without a walker.

use crate::args::{FlushArgs, PartitionArgs};
use crate::estimate::{barrier_control_section_offset, estimate_barrier_size};
use crate::layout::BarrierControlSection;
use crate::program::{
    cleanup_rendezvous_count, program_barrier_with_post_sync, program_batch_buffer_start, program_self_cleanup_end_section,
    program_self_cleanup_section, program_tiles_synchronization_with_atomics,
};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

/// Emit barrier, returns bytes programmed
pub fn construct_barrier<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    args: &PartitionArgs,
    flush: &FlushArgs,
    hw: &HardwareInfo,
) -> Result<usize, TilepartError> {
    if args.emit_self_cleanup {
        cleanup_rendezvous_count(args.tile_count)?;
    }
    stream.ensure_capacity(estimate_barrier_size(isa, args, hw))?;

    let start = stream.used();
    let control_section = stream.current_gpu_address() + barrier_control_section_offset(isa, args, hw) as u64;
    let cross_tile_sync_count = control_section + BarrierControlSection::CROSS_TILE_SYNC_COUNT_OFFSET;
    let final_sync_tile_count = control_section + BarrierControlSection::FINAL_SYNC_TILE_COUNT_OFFSET;

    if args.emit_self_cleanup {
        program_self_cleanup_section(stream, isa, final_sync_tile_count, args.use_atomics_for_self_cleanup)?;
    }
    let post_sync = args
        .use_post_sync
        .then_some((args.post_sync_gpu_address, args.post_sync_immediate_value));
    program_barrier_with_post_sync(stream, isa, hw, flush.dc_flush, post_sync)?;
    program_tiles_synchronization_with_atomics(stream, isa, cross_tile_sync_count, args.tile_count)?;
    program_batch_buffer_start(
        stream,
        isa,
        control_section + BarrierControlSection::SIZE as u64,
        false,
        args.secondary_batch_buffer,
    )?;

    debug_assert_eq!(stream.current_gpu_address(), control_section);
    stream.append_zeroed(BarrierControlSection::SIZE)?;

    if args.emit_self_cleanup {
        program_self_cleanup_end_section(
            stream,
            isa,
            final_sync_tile_count,
            control_section,
            BarrierControlSection::FIELDS_FOR_CLEANUP,
            args.tile_count,
            args.use_atomics_for_self_cleanup,
        )?;
    }
    Ok(stream.used() - start)
}
