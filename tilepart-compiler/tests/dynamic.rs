mod common;

use common::{parse, walker};
use tilepart_compiler::estimate::dynamic_control_section_offset;
use tilepart_compiler::layout::DynamicControlSection;
use tilepart_compiler::{construct_dynamic, estimate_dynamic_size, PartitionArgs};
use tilepart_core::command::{
    AtomicOpcode, Command, CommandKind, CompareOperation, LoadRegisterImm, LoadRegisterReg,
    MiAtomic, PartitionType, SemaphoreWait, StoreDataImm, WparidPredication,
    GENERAL_PURPOSE_REGISTER_4, WPARID_CCS_OFFSET,
};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::{GpuFamily, HardwareInfo};
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;
use tilepart_core::xe_hp::XeHpCore;

const GPU_BASE: u64 = 0x80_0012_3000;

fn args(partition_count: u32, tile_count: u32) -> PartitionArgs {
    PartitionArgs {
        partition_count,
        tile_count,
        emit_batch_buffer_end: true,
        ..Default::default()
    }
}

#[test]
fn sixteen_partitions_on_four_tiles() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = args(16, 4);
    let walker = walker([64, 1, 1], PartitionType::X);

    let offset = dynamic_control_section_offset(&isa, &args);
    let expected_offset = isa.size_of(CommandKind::LoadRegisterImm)
        + 2 * isa.size_of(CommandKind::Atomic)
        + isa.size_of(CommandKind::LoadRegisterReg)
        + 2 * isa.size_of(CommandKind::SetPredicate)
        + 3 * isa.size_of(CommandKind::BatchBufferStart)
        + isa.size_of(CommandKind::PipeControl)
        + isa.size_of(CommandKind::ComputeWalker)
        + isa.size_of(CommandKind::SemaphoreWait);
    assert_eq!(offset, expected_offset);

    let mut buf = vec![0xCDu8; 4096];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let programmed = construct_dynamic(&mut stream, &isa, &hw, &walker, &args)?;
    assert_eq!(programmed, offset + DynamicControlSection::SIZE + isa.size_of(CommandKind::BatchBufferEnd));
    assert_eq!(programmed, estimate_dynamic_size(&isa, &args));

    let bytes = stream.as_bytes();
    let control_section = GPU_BASE + offset as u64;
    let parsed = parse(bytes, offset, DynamicControlSection::SIZE);
    let body: Vec<Command> = parsed.body.iter().map(|(_, c)| *c).collect();

    assert_eq!(
        body[0],
        Command::LoadRegisterImm(LoadRegisterImm { register_offset: 0x21FC, data: 0xFFF0, mmio_remap: false })
    );
    assert_eq!(body[1], Command::Atomic(MiAtomic::increment(control_section, true)));
    let Command::Atomic(atomic) = body[1] else { panic!() };
    assert!(atomic.return_data && atomic.cs_stall);
    assert_eq!(
        body[2],
        Command::LoadRegisterReg(LoadRegisterReg {
            source_register: GENERAL_PURPOSE_REGISTER_4,
            destination_register: WPARID_CCS_OFFSET,
            mmio_remap_source: true,
            mmio_remap_destination: true,
        })
    );
    let Command::SetPredicate(predicate) = body[3] else { panic!() };
    assert_eq!(predicate.wparid, WparidPredication::NoopOnNonZero);
    let Command::BatchBufferStart(jump) = body[4] else { panic!() };
    assert!(jump.predicated);
    assert_eq!(
        jump.address,
        control_section - (isa.size_of(CommandKind::BatchBufferStart) + isa.size_of(CommandKind::ComputeWalker)) as u64
    );
    let Command::SetPredicate(predicate) = body[5] else { panic!() };
    assert_eq!(predicate.wparid, WparidPredication::NoopNever);
    let Command::PipeControl(pipe_control) = body[6] else { panic!() };
    assert!(pipe_control.cs_stall && pipe_control.dc_flush);
    assert_eq!(body[7], Command::Atomic(MiAtomic::increment(control_section + 4, false)));
    assert_eq!(
        body[8],
        Command::SemaphoreWait(SemaphoreWait {
            address: control_section + 4,
            data: 4,
            compare: CompareOperation::SadGreaterThanOrEqualSdd,
            polling: true,
        })
    );
    let Command::BatchBufferStart(jump) = body[9] else { panic!() };
    assert!(!jump.predicated);
    assert_eq!(jump.address, control_section + 16);
    let Command::ComputeWalker(partitioned) = body[10] else { panic!() };
    assert!(partitioned.workload_partition_enable);
    assert_eq!(partitioned.partition_type, PartitionType::X);
    assert_eq!(partitioned.partition_size, 4);
    let Command::BatchBufferStart(jump) = body[11] else { panic!() };
    assert_eq!(jump.address, GPU_BASE);
    assert_eq!(body.len(), 12);

    assert_eq!(DynamicControlSection::parse(&bytes[offset..]), Some(DynamicControlSection::default()));
    assert_eq!(parsed.tail.len(), 1);
    assert_eq!(parsed.tail[0].1, Command::BatchBufferEnd);
    Ok(())
}

#[test]
fn invalid_partition_count_programs_nothing() {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let walker = walker([64, 1, 1], PartitionType::X);
    let mut buf = vec![0u8; 4096];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    for partition_count in [0, 1, 3, 6, 64] {
        let result = construct_dynamic(&mut stream, &isa, &hw, &walker, &args(partition_count, 2));
        assert!(matches!(result, Err(TilepartError::InvalidPartitionCount { .. })));
        assert_eq!(stream.used(), 0);
    }
}

#[test]
fn too_small_stream_programs_nothing() {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = args(4, 4);
    let size = estimate_dynamic_size(&isa, &args);
    let mut buf = vec![0u8; size - 1];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let result = construct_dynamic(&mut stream, &isa, &hw, &walker([16, 1, 1], PartitionType::X), &args);
    assert!(matches!(
        result,
        Err(TilepartError::BufferOverflow { required, available }) if required == size && available == size - 1
    ));
    assert_eq!(stream.used(), 0);
}

#[test]
fn self_cleanup_rendezvous_twice() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = PartitionArgs {
        emit_self_cleanup: true,
        cross_tile_atomic_synchronization: false,
        ..args(4, 4)
    };
    let mut buf = vec![0u8; 4096];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let programmed = construct_dynamic(&mut stream, &isa, &hw, &walker([16, 1, 1], PartitionType::X), &args)?;
    assert_eq!(programmed, estimate_dynamic_size(&isa, &args));

    let offset = dynamic_control_section_offset(&isa, &args);
    let control_section = GPU_BASE + offset as u64;
    let final_sync = control_section + DynamicControlSection::FINAL_SYNC_TILE_COUNT_OFFSET;
    let parsed = parse(stream.as_bytes(), offset, DynamicControlSection::SIZE);

    // final sync counter is zeroed right after predication is disabled
    assert_eq!(parsed.body[6].1, Command::StoreDataImm(StoreDataImm { address: final_sync, data: 0 }));
    // self-cleanup forces the after walker rendezvous
    assert_eq!(parsed.body[8].1, Command::Atomic(MiAtomic::increment(control_section + 4, false)));

    let tail: Vec<Command> = parsed.tail.iter().map(|(_, c)| *c).collect();
    let wait = |data| {
        Command::SemaphoreWait(SemaphoreWait {
            address: final_sync,
            data,
            compare: CompareOperation::SadGreaterThanOrEqualSdd,
            polling: true,
        })
    };
    assert_eq!(
        tail,
        [
            Command::Atomic(MiAtomic::increment(final_sync, false)),
            wait(4),
            Command::StoreDataImm(StoreDataImm { address: control_section, data: 0 }),
            Command::StoreDataImm(StoreDataImm { address: control_section + 4, data: 0 }),
            Command::StoreDataImm(StoreDataImm { address: control_section + 8, data: 0 }),
            Command::Atomic(MiAtomic::increment(final_sync, false)),
            wait(8),
            Command::BatchBufferEnd,
        ]
    );
    Ok(())
}

#[test]
fn atomic_self_cleanup_uses_moves() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = PartitionArgs {
        emit_self_cleanup: true,
        use_atomics_for_self_cleanup: true,
        emit_batch_buffer_end: false,
        ..args(8, 2)
    };
    let mut buf = vec![0u8; 4096];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let programmed = construct_dynamic(&mut stream, &isa, &hw, &walker([8, 8, 1], PartitionType::Y), &args)?;
    assert_eq!(programmed, estimate_dynamic_size(&isa, &args));

    let offset = dynamic_control_section_offset(&isa, &args);
    let parsed = parse(stream.as_bytes(), offset, DynamicControlSection::SIZE);
    let moves = parsed
        .tail
        .iter()
        .filter(|(_, c)| matches!(c, Command::Atomic(a) if a.opcode == AtomicOpcode::Move4B && a.inline_data == Some(0)))
        .count();
    assert_eq!(moves, DynamicControlSection::FIELDS_FOR_CLEANUP);
    assert_eq!(parsed.tail.len(), 7);
    Ok(())
}

#[test]
fn post_sync_semaphores_and_static_reload() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = PartitionArgs {
        semaphore_programming_required: true,
        synchronize_before_execution: true,
        preferred_static_partitioning: true,
        work_partition_allocation_gpu_va: 0xABC000,
        ..args(4, 2)
    };
    let walker = walker([1, 1, 64], PartitionType::Z);
    let mut buf = vec![0u8; 4096];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    construct_dynamic(&mut stream, &isa, &hw, &walker, &args)?;

    let offset = dynamic_control_section_offset(&isa, &args);
    let control_section = GPU_BASE + offset as u64;
    let parsed = parse(stream.as_bytes(), offset, DynamicControlSection::SIZE);
    let body: Vec<Command> = parsed.body.iter().map(|(_, c)| *c).collect();

    assert_eq!(body[0], Command::Atomic(MiAtomic::increment(control_section + 8, false)));
    let waits: Vec<SemaphoreWait> = body
        .iter()
        .filter_map(|c| match c {
            Command::SemaphoreWait(w) if w.compare == CompareOperation::SadNotEqualSdd => Some(*w),
            _ => None,
        })
        .collect();
    assert_eq!(waits.len(), 4);
    for (i, w) in waits.iter().enumerate() {
        assert_eq!(w.address, walker.post_sync.destination_address + 8 + 16 * i as u64);
        assert_eq!(w.data, 1);
    }
    let Command::LoadRegisterMem(reload) = body[body.len() - 4] else { panic!() };
    assert_eq!(reload.memory_address, 0xABC000);
    assert_eq!(reload.register_offset, WPARID_CCS_OFFSET);
    assert!(reload.mmio_remap);
    Ok(())
}
