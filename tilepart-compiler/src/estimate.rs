//! Space estimators.
//!
//! Each function sums the same terms, in the same order, as the matching
//! constructor emits them. Control section offsets are computed here and
//! never discovered by walking the emitted buffer.

use crate::args::PartitionArgs;
use crate::layout::{BarrierControlSection, DynamicControlSection, StaticControlSection};
use tilepart_core::command::CommandKind;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;

pub fn tiles_synchronization_with_atomics_size<I: InstructionSet + ?Sized>(isa: &I) -> usize {
    isa.size_of(CommandKind::Atomic) + isa.size_of(CommandKind::SemaphoreWait)
}

/// One zeroing record
pub fn self_cleanup_section_size<I: InstructionSet + ?Sized>(isa: &I, use_atomics: bool) -> usize {
    if use_atomics {
        isa.size_of(CommandKind::Atomic)
    } else {
        isa.size_of(CommandKind::StoreDataImm)
    }
}

pub fn self_cleanup_end_section_size<I: InstructionSet + ?Sized>(
    isa: &I,
    fields: usize,
    use_atomics: bool,
) -> usize {
    fields * self_cleanup_section_size(isa, use_atomics) + 2 * tiles_synchronization_with_atomics_size(isa)
}

/// Walker followed by the jump back to the buffer start
pub fn walker_section_size<I: InstructionSet + ?Sized>(isa: &I) -> usize {
    isa.size_of(CommandKind::BatchBufferStart) + isa.size_of(CommandKind::ComputeWalker)
}

fn post_sync_semaphores_size<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    if args.semaphore_programming_required {
        isa.size_of(CommandKind::SemaphoreWait) * args.partition_count as usize
    } else {
        0
    }
}

fn after_walker_sync_size<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    if args.cross_tile_atomic_synchronization || args.emit_self_cleanup {
        tiles_synchronization_with_atomics_size(isa)
    } else {
        0
    }
}

fn optional(enabled: bool, size: usize) -> usize {
    if enabled {
        size
    } else {
        0
    }
}

/// Offset of the dynamic control section from the start of the buffer
pub fn dynamic_control_section_offset<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    let mut size = 0;
    size += optional(args.synchronize_before_execution, tiles_synchronization_with_atomics_size(isa));
    // predication mask
    size += isa.size_of(CommandKind::LoadRegisterImm);
    // current partition id
    size += isa.size_of(CommandKind::Atomic);
    // id into WPARID
    size += isa.size_of(CommandKind::LoadRegisterReg);
    size += isa.size_of(CommandKind::SetPredicate) * 2 + isa.size_of(CommandKind::BatchBufferStart) * 2;
    size += post_sync_semaphores_size(isa, args);
    size += walker_section_size(isa);
    size += optional(args.emit_pipe_control_stall, isa.size_of(CommandKind::PipeControl));
    size += after_walker_sync_size(isa, args);
    size += optional(args.emit_self_cleanup, self_cleanup_section_size(isa, args.use_atomics_for_self_cleanup));
    size += optional(args.preferred_static_partitioning, isa.size_of(CommandKind::LoadRegisterMem));
    size
}

/// Offset of the walker section, which ends where the control section starts
pub fn walker_section_start<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    dynamic_control_section_offset(isa, args) - walker_section_size(isa)
}

pub fn static_control_section_offset<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    optional(args.synchronize_before_execution, tiles_synchronization_with_atomics_size(isa))
        + optional(args.initialize_wparid_register, isa.size_of(CommandKind::LoadRegisterMem))
        + isa.size_of(CommandKind::ComputeWalker)
        + optional(args.emit_self_cleanup, self_cleanup_section_size(isa, args.use_atomics_for_self_cleanup))
        + optional(args.emit_pipe_control_stall, isa.size_of(CommandKind::PipeControl))
        + post_sync_semaphores_size(isa, args)
        + after_walker_sync_size(isa, args)
        + isa.size_of(CommandKind::BatchBufferStart)
}

/// Barrier pipe control, including the workaround pipe control if needed
pub fn barrier_with_post_sync_size<I: InstructionSet + ?Sized>(isa: &I, hw: &HardwareInfo) -> usize {
    let pipe_control = isa.size_of(CommandKind::PipeControl);
    pipe_control + optional(hw.barrier_workaround_required, pipe_control)
}

pub fn barrier_control_section_offset<I: InstructionSet + ?Sized>(
    isa: &I,
    args: &PartitionArgs,
    hw: &HardwareInfo,
) -> usize {
    optional(args.emit_self_cleanup, self_cleanup_section_size(isa, args.use_atomics_for_self_cleanup))
        + barrier_with_post_sync_size(isa, hw)
        + tiles_synchronization_with_atomics_size(isa)
        + isa.size_of(CommandKind::BatchBufferStart)
}

pub fn estimate_dynamic_size<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    dynamic_control_section_offset(isa, args)
        + DynamicControlSection::SIZE
        + optional(args.emit_batch_buffer_end, isa.size_of(CommandKind::BatchBufferEnd))
        + optional(
            args.emit_self_cleanup,
            self_cleanup_end_section_size(
                isa,
                DynamicControlSection::FIELDS_FOR_CLEANUP,
                args.use_atomics_for_self_cleanup,
            ),
        )
}

pub fn estimate_static_size<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    static_control_section_offset(isa, args)
        + StaticControlSection::SIZE
        + optional(
            args.emit_self_cleanup,
            self_cleanup_end_section_size(
                isa,
                StaticControlSection::FIELDS_FOR_CLEANUP,
                args.use_atomics_for_self_cleanup,
            ),
        )
}

pub fn estimate_barrier_size<I: InstructionSet + ?Sized>(
    isa: &I,
    args: &PartitionArgs,
    hw: &HardwareInfo,
) -> usize {
    barrier_control_section_offset(isa, args, hw)
        + BarrierControlSection::SIZE
        + optional(
            args.emit_self_cleanup,
            self_cleanup_end_section_size(
                isa,
                BarrierControlSection::FIELDS_FOR_CLEANUP,
                args.use_atomics_for_self_cleanup,
            ),
        )
}

/// Size of the partitioned walker buffer, static or dynamic per `args`
pub fn estimate_space_required<I: InstructionSet + ?Sized>(isa: &I, args: &PartitionArgs) -> usize {
    if args.static_partitioning {
        estimate_static_size(isa, args)
    } else {
        estimate_dynamic_size(isa, args)
    }
}
