//! Composite emitters shared by the partition constructors.

use tilepart_core::command::{
    BatchBufferStart, Command, CompareOperation, ComputeWalker, LoadRegisterImm, LoadRegisterMem,
    LoadRegisterReg, MiAtomic, PipeControl, SemaphoreWait, SetPredicate, StoreDataImm,
    WparidPredication, PREDICATION_MASK_CCS_OFFSET,
};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;

/// Predication mask for given partition count.
///
/// Only powers of two between 2 and 32 have a mask, partition ids at or
/// above the count are masked out.
pub fn wparid_mask(partition_count: u32) -> Result<u32, TilepartError> {
    if !partition_count.is_power_of_two() || !(2..=32).contains(&partition_count) {
        return Err(TilepartError::InvalidPartitionCount { partition_count });
    }
    Ok((0xFFFF << partition_count.trailing_zeros()) & 0xFFFF)
}

/// Load predication mask register, emits nothing on invalid partition count
pub fn program_wparid_mask<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    partition_count: u32,
) -> Result<(), TilepartError> {
    let mask = wparid_mask(partition_count)?;
    stream.append(
        isa,
        &Command::LoadRegisterImm(LoadRegisterImm {
            register_offset: PREDICATION_MASK_CCS_OFFSET,
            data: mask,
            mmio_remap: false,
        }),
    )?;
    Ok(())
}

pub fn program_wparid_predication<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    enabled: bool,
) -> Result<(), TilepartError> {
    let wparid = if enabled {
        WparidPredication::NoopOnNonZero
    } else {
        WparidPredication::NoopNever
    };
    stream.append(isa, &Command::SetPredicate(SetPredicate { wparid }))?;
    Ok(())
}

pub fn program_wait_for_semaphore<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    address: u64,
    data: u32,
    compare: CompareOperation,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::SemaphoreWait(SemaphoreWait {
            address,
            data,
            compare,
            polling: true,
        }),
    )?;
    Ok(())
}

pub fn program_batch_buffer_start<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    address: u64,
    predicated: bool,
    secondary: bool,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::BatchBufferStart(BatchBufferStart {
            address,
            predicated,
            second_level: secondary,
        }),
    )?;
    Ok(())
}

/// Copy register to register, remapped on both sides
pub fn program_load_register_reg<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    source_register: u32,
    destination_register: u32,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::LoadRegisterReg(LoadRegisterReg {
            source_register,
            destination_register,
            mmio_remap_source: true,
            mmio_remap_destination: true,
        }),
    )?;
    Ok(())
}

pub fn program_load_register_mem<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    memory_address: u64,
    register_offset: u32,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::LoadRegisterMem(LoadRegisterMem {
            register_offset,
            memory_address,
            mmio_remap: true,
        }),
    )?;
    Ok(())
}

/// Pipe control with CS stall, dc flush only if the hardware allows it
pub fn program_pipe_control<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    hw: &HardwareInfo,
    dc_flush: bool,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::PipeControl(PipeControl {
            cs_stall: true,
            dc_flush: hw.dc_flush(dc_flush),
            post_sync: None,
        }),
    )?;
    Ok(())
}

/// Barrier pipe control, preceded by a stalling pipe control on hardware
/// that needs the workaround
pub fn program_barrier_with_post_sync<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    hw: &HardwareInfo,
    dc_flush: bool,
    post_sync: Option<(u64, u64)>,
) -> Result<(), TilepartError> {
    if hw.barrier_workaround_required {
        stream.append(
            isa,
            &Command::PipeControl(PipeControl {
                cs_stall: true,
                dc_flush: false,
                post_sync: None,
            }),
        )?;
    }
    stream.append(
        isa,
        &Command::PipeControl(PipeControl {
            cs_stall: true,
            dc_flush: hw.dc_flush(dc_flush),
            post_sync,
        }),
    )?;
    Ok(())
}

/// Zero one counter with store data immediate or atomic move
pub fn program_self_cleanup_section<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    address: u64,
    use_atomics: bool,
) -> Result<(), TilepartError> {
    let command = if use_atomics {
        Command::Atomic(MiAtomic::clear(address))
    } else {
        Command::StoreDataImm(StoreDataImm { address, data: 0 })
    };
    stream.append(isa, &command)?;
    Ok(())
}

/// Increment counter and wait until it reaches `tile_count`
pub fn program_tiles_synchronization_with_atomics<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    address: u64,
    tile_count: u32,
) -> Result<(), TilepartError> {
    stream.append(isa, &Command::Atomic(MiAtomic::increment(address, false)))?;
    program_wait_for_semaphore(stream, isa, address, tile_count, CompareOperation::SadGreaterThanOrEqualSdd)
}

/// Wait for every partition's post-sync slot of the walker
pub fn program_tiles_synchronization_with_post_syncs<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    walker: &ComputeWalker,
    partition_count: u32,
) -> Result<(), TilepartError> {
    let post_sync_address = walker.post_sync.destination_address + 8;
    for partition_id in 0..u64::from(partition_count) {
        program_wait_for_semaphore(
            stream,
            isa,
            post_sync_address + partition_id * 16,
            1,
            CompareOperation::SadNotEqualSdd,
        )?;
    }
    Ok(())
}

/// Value the second cleanup rendezvous waits for, fails if it does not fit a dword
pub fn cleanup_rendezvous_count(tile_count: u32) -> Result<u32, TilepartError> {
    tile_count
        .checked_mul(2)
        .ok_or(TilepartError::InvalidTileCount { tile_count })
}

/// Rendezvous, zero `fields` leading counters, rendezvous again.
///
/// The second wait is for twice the tile count, no tile may touch the
/// counters of the next replay before all of them finished zeroing.
pub fn program_self_cleanup_end_section<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    final_sync_tile_count_address: u64,
    base_address_for_cleanup: u64,
    fields: usize,
    tile_count: u32,
    use_atomics: bool,
) -> Result<(), TilepartError> {
    program_tiles_synchronization_with_atomics(stream, isa, final_sync_tile_count_address, tile_count)?;
    for field in 0..fields as u64 {
        program_self_cleanup_section(stream, isa, base_address_for_cleanup + field * 4, use_atomics)?;
    }
    program_tiles_synchronization_with_atomics(
        stream,
        isa,
        final_sync_tile_count_address,
        cleanup_rendezvous_count(tile_count)?,
    )
}

/// Walker with partition fields set, untouched for a single partition
#[must_use]
pub fn partitioned_walker(walker: &ComputeWalker, partition_count: u32) -> ComputeWalker {
    let mut walker = *walker;
    if partition_count > 1 {
        if let Some(extent) = walker.partitioned_extent() {
            walker.workload_partition_enable = true;
            walker.partition_size = extent.div_ceil(partition_count);
        }
    }
    walker
}

pub fn program_partitioned_walker<I: InstructionSet + ?Sized>(
    stream: &mut CommandStream,
    isa: &I,
    walker: &ComputeWalker,
    partition_count: u32,
) -> Result<(), TilepartError> {
    stream.append(
        isa,
        &Command::ComputeWalker(partitioned_walker(walker, partition_count)),
    )?;
    Ok(())
}

#[test]
fn cleanup_rendezvous_fits_dword() {
    assert_eq!(cleanup_rendezvous_count(4).unwrap(), 8);
    assert_eq!(cleanup_rendezvous_count(u32::MAX / 2).unwrap(), u32::MAX - 1);
    assert!(matches!(
        cleanup_rendezvous_count(u32::MAX / 2 + 1),
        Err(TilepartError::InvalidTileCount { tile_count }) if tile_count == u32::MAX / 2 + 1
    ));
}

#[test]
fn mask_table() {
    assert_eq!(wparid_mask(2).unwrap(), 0xFFFE);
    assert_eq!(wparid_mask(4).unwrap(), 0xFFFC);
    assert_eq!(wparid_mask(8).unwrap(), 0xFFF8);
    assert_eq!(wparid_mask(16).unwrap(), 0xFFF0);
    assert_eq!(wparid_mask(32).unwrap(), 0xFFE0);
    for count in [0, 1, 3, 5, 12, 64] {
        assert!(matches!(
            wparid_mask(count),
            Err(TilepartError::InvalidPartitionCount { partition_count }) if partition_count == count
        ));
    }
}

#[test]
fn partition_size_rounds_up() {
    use tilepart_core::command::PartitionType;
    let mut walker = ComputeWalker::new([1, 17, 1]);
    walker.partition_type = PartitionType::Y;
    let partitioned = partitioned_walker(&walker, 4);
    assert!(partitioned.workload_partition_enable);
    assert_eq!(partitioned.partition_size, 5);
    assert_eq!(partitioned_walker(&walker, 1), walker);
}
