mod common;

use common::parse;
use tilepart_compiler::estimate::barrier_control_section_offset;
use tilepart_compiler::layout::BarrierControlSection;
use tilepart_compiler::{construct_barrier, estimate_barrier_size, FlushArgs, PartitionArgs};
use tilepart_core::command::{Command, CommandKind, CompareOperation, MiAtomic, PipeControl, StoreDataImm};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::{GpuFamily, HardwareInfo};
use tilepart_core::isa::InstructionSet;
use tilepart_core::stream::CommandStream;
use tilepart_core::xe_hp::XeHpCore;

const GPU_BASE: u64 = 0xFF0000;

fn post_sync_args() -> PartitionArgs {
    PartitionArgs {
        tile_count: 4,
        use_post_sync: true,
        post_sync_gpu_address: 0xDAAB00,
        post_sync_immediate_value: 0x421,
        ..Default::default()
    }
}

#[test]
fn post_sync_barrier_without_cleanup() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = post_sync_args();

    let offset = barrier_control_section_offset(&isa, &args, &hw);
    assert_eq!(
        offset,
        isa.size_of(CommandKind::PipeControl)
            + isa.size_of(CommandKind::Atomic)
            + isa.size_of(CommandKind::SemaphoreWait)
            + isa.size_of(CommandKind::BatchBufferStart)
    );
    assert_eq!(estimate_barrier_size(&isa, &args, &hw), offset + BarrierControlSection::SIZE);

    let mut buf = vec![0x11u8; 1024];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let programmed = construct_barrier(&mut stream, &isa, &args, &FlushArgs { dc_flush: false }, &hw)?;
    assert_eq!(programmed, offset + BarrierControlSection::SIZE);

    let cross_tile = GPU_BASE + offset as u64;
    let parsed = parse(stream.as_bytes(), offset, BarrierControlSection::SIZE);
    let body: Vec<Command> = parsed.body.iter().map(|(_, c)| *c).collect();
    assert_eq!(
        body[0],
        Command::PipeControl(PipeControl {
            cs_stall: true,
            dc_flush: false,
            post_sync: Some((0xDAAB00, 0x421)),
        })
    );
    assert_eq!(body[1], Command::Atomic(MiAtomic::increment(cross_tile, false)));
    assert!(matches!(
        body[2],
        Command::SemaphoreWait(w) if w.address == cross_tile
            && w.data == 4
            && w.compare == CompareOperation::SadGreaterThanOrEqualSdd
    ));
    let Command::BatchBufferStart(jump) = body[3] else { panic!() };
    assert_eq!(jump.address, cross_tile + BarrierControlSection::SIZE as u64);
    assert!(!jump.second_level);
    assert_eq!(body.len(), 4);
    assert!(parsed.tail.is_empty());
    assert_eq!(
        BarrierControlSection::parse(&stream.as_bytes()[offset..]),
        Some(BarrierControlSection::default())
    );
    Ok(())
}

#[test]
fn post_sync_barrier_with_store_cleanup() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let args = PartitionArgs {
        emit_self_cleanup: true,
        secondary_batch_buffer: true,
        ..post_sync_args()
    };
    let offset = barrier_control_section_offset(&isa, &args, &hw);
    assert_eq!(
        estimate_barrier_size(&isa, &args, &hw),
        offset
            + BarrierControlSection::SIZE
            + 2 * (isa.size_of(CommandKind::Atomic) + isa.size_of(CommandKind::SemaphoreWait))
            + isa.size_of(CommandKind::StoreDataImm)
    );

    let mut buf = vec![0u8; 1024];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let programmed = construct_barrier(&mut stream, &isa, &args, &FlushArgs { dc_flush: true }, &hw)?;
    assert_eq!(programmed, estimate_barrier_size(&isa, &args, &hw));

    let cross_tile = GPU_BASE + offset as u64;
    let final_sync = cross_tile + BarrierControlSection::FINAL_SYNC_TILE_COUNT_OFFSET;
    let parsed = parse(stream.as_bytes(), offset, BarrierControlSection::SIZE);
    assert_eq!(parsed.body[0].1, Command::StoreDataImm(StoreDataImm { address: final_sync, data: 0 }));
    assert!(matches!(parsed.body[1].1, Command::PipeControl(pc) if pc.dc_flush));
    assert!(matches!(parsed.body[4].1, Command::BatchBufferStart(b) if b.second_level));

    let tail: Vec<Command> = parsed.tail.iter().map(|(_, c)| *c).collect();
    assert_eq!(tail.len(), 5);
    assert_eq!(tail[0], Command::Atomic(MiAtomic::increment(final_sync, false)));
    assert!(matches!(tail[1], Command::SemaphoreWait(w) if w.address == final_sync && w.data == 4));
    assert_eq!(tail[2], Command::StoreDataImm(StoreDataImm { address: cross_tile, data: 0 }));
    assert!(matches!(tail[4], Command::SemaphoreWait(w) if w.address == final_sync && w.data == 8));
    Ok(())
}

#[test]
fn workaround_adds_stalling_pipe_control() -> Result<(), TilepartError> {
    let isa = XeHpCore;
    let hw = HardwareInfo {
        barrier_workaround_required: true,
        ..HardwareInfo::new(GpuFamily::XeHpCore)
    };
    let args = post_sync_args();
    let plain = estimate_barrier_size(&isa, &args, &HardwareInfo::new(GpuFamily::XeHpCore));
    assert_eq!(
        estimate_barrier_size(&isa, &args, &hw),
        plain + isa.size_of(CommandKind::PipeControl)
    );

    let mut buf = vec![0u8; 1024];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    construct_barrier(&mut stream, &isa, &args, &FlushArgs::default(), &hw)?;
    let offset = barrier_control_section_offset(&isa, &args, &hw);
    let parsed = parse(stream.as_bytes(), offset, BarrierControlSection::SIZE);
    assert_eq!(
        parsed.body[0].1,
        Command::PipeControl(PipeControl { cs_stall: true, dc_flush: false, post_sync: None })
    );
    assert!(matches!(parsed.body[1].1, Command::PipeControl(pc) if pc.post_sync == Some((0xDAAB00, 0x421))));
    Ok(())
}

#[test]
fn cleanup_rejects_tile_count_without_room_to_double() {
    let isa = XeHpCore;
    let hw = HardwareInfo::new(GpuFamily::XeHpCore);
    let tile_count = u32::MAX / 2 + 1;
    let args = PartitionArgs {
        tile_count,
        emit_self_cleanup: true,
        ..post_sync_args()
    };
    let mut buf = vec![0xCDu8; 1024];
    let mut stream = CommandStream::new(&mut buf, GPU_BASE);
    let res = construct_barrier(&mut stream, &isa, &args, &FlushArgs::default(), &hw);
    assert!(matches!(res, Err(TilepartError::InvalidTileCount { tile_count: t }) if t == tile_count));
    assert_eq!(stream.used(), 0);

    let args = PartitionArgs {
        emit_self_cleanup: false,
        ..args
    };
    assert_eq!(
        construct_barrier(&mut stream, &isa, &args, &FlushArgs::default(), &hw).unwrap(),
        estimate_barrier_size(&isa, &args, &hw)
    );
}
