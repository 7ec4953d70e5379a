//! Xe-HP core command encoding.
//!
//! MI commands carry the client type 0 in bits 31:29, the opcode in bits
//! 28:23 and the dword length (record dwords minus two) in the low byte.
//! PIPE_CONTROL and COMPUTE_WALKER are 3D client (type 3) commands.

use crate::command::{
    AtomicOpcode, BatchBufferStart, Command, CommandKind, CompareOperation, ComputeWalker,
    LoadRegisterImm, LoadRegisterMem, LoadRegisterReg, MiAtomic, PartitionType, PipeControl,
    PostSync, PostSyncOperation, SemaphoreWait, SetPredicate, StoreDataImm, WparidPredication,
};
use crate::error::TilepartError;
use crate::hw::GpuFamily;
use crate::isa::InstructionSet;

// Record sizes in bytes
const LOAD_REGISTER_IMM_SIZE: usize = 12;
const LOAD_REGISTER_REG_SIZE: usize = 12;
const LOAD_REGISTER_MEM_SIZE: usize = 16;
const MI_ATOMIC_SIZE: usize = 44;
const SEMAPHORE_WAIT_SIZE: usize = 20;
const SET_PREDICATE_SIZE: usize = 4;
const PIPE_CONTROL_SIZE: usize = 24;
const STORE_DATA_IMM_SIZE: usize = 20;
const BATCH_BUFFER_START_SIZE: usize = 12;
const BATCH_BUFFER_END_SIZE: usize = 4;
const COMPUTE_WALKER_SIZE: usize = 156;

// MI opcodes, bits 28:23
const MI_SET_PREDICATE: u32 = 0x01;
const MI_BATCH_BUFFER_END: u32 = 0x0A;
const MI_SEMAPHORE_WAIT: u32 = 0x1C;
const MI_STORE_DATA_IMM: u32 = 0x20;
const MI_LOAD_REGISTER_IMM: u32 = 0x22;
const MI_LOAD_REGISTER_MEM: u32 = 0x29;
const MI_LOAD_REGISTER_REG: u32 = 0x2A;
const MI_ATOMIC: u32 = 0x2F;
const MI_BATCH_BUFFER_START: u32 = 0x31;

// 3D client sub-headers, pipeline (28:27), opcode (26:24), sub-opcode (23:16)
const GFX_PIPE_CONTROL: u32 = (3 << 11) | (2 << 8);
const GFX_COMPUTE_WALKER: u32 = (2 << 11) | (2 << 8) | 2;

const fn dword_length(size: usize) -> u32 {
    (size / 4).saturating_sub(2) as u32
}

const fn mi_header(opcode: u32, size: usize) -> u32 {
    (opcode << 23) | dword_length(size)
}

const fn gfx_header(sub: u32, size: usize) -> u32 {
    (3 << 29) | (sub << 16) | dword_length(size)
}

const fn bit(value: bool, shift: u32) -> u32 {
    (value as u32) << shift
}

fn put(out: &mut [u8], dword: usize, value: u32) {
    out[dword * 4..dword * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut [u8], dword: usize, value: u64) {
    put(out, dword, value as u32);
    put(out, dword + 1, (value >> 32) as u32);
}

fn get(bytes: &[u8], dword: usize) -> u32 {
    let mut v = [0u8; 4];
    v.copy_from_slice(&bytes[dword * 4..dword * 4 + 4]);
    u32::from_le_bytes(v)
}

fn get_u64(bytes: &[u8], dword: usize) -> u64 {
    u64::from(get(bytes, dword)) | (u64::from(get(bytes, dword + 1)) << 32)
}

const fn flag(value: u32, shift: u32) -> bool {
    (value >> shift) & 1 == 1
}

/// Xe-HP core instruction set
#[derive(Debug, Default, Clone, Copy)]
pub struct XeHpCore;

impl InstructionSet for XeHpCore {
    fn family(&self) -> GpuFamily {
        GpuFamily::XeHpCore
    }

    fn size_of(&self, kind: CommandKind) -> usize {
        match kind {
            CommandKind::LoadRegisterImm => LOAD_REGISTER_IMM_SIZE,
            CommandKind::LoadRegisterReg => LOAD_REGISTER_REG_SIZE,
            CommandKind::LoadRegisterMem => LOAD_REGISTER_MEM_SIZE,
            CommandKind::Atomic => MI_ATOMIC_SIZE,
            CommandKind::SemaphoreWait => SEMAPHORE_WAIT_SIZE,
            CommandKind::SetPredicate => SET_PREDICATE_SIZE,
            CommandKind::PipeControl => PIPE_CONTROL_SIZE,
            CommandKind::StoreDataImm => STORE_DATA_IMM_SIZE,
            CommandKind::BatchBufferStart => BATCH_BUFFER_START_SIZE,
            CommandKind::BatchBufferEnd => BATCH_BUFFER_END_SIZE,
            CommandKind::ComputeWalker => COMPUTE_WALKER_SIZE,
        }
    }

    fn encode(&self, command: &Command, out: &mut [u8]) {
        out.fill(0);
        match command {
            Command::LoadRegisterImm(c) => {
                put(out, 0, mi_header(MI_LOAD_REGISTER_IMM, LOAD_REGISTER_IMM_SIZE) | bit(c.mmio_remap, 17));
                put(out, 1, c.register_offset & 0x7F_FFFC);
                put(out, 2, c.data);
            }
            Command::LoadRegisterReg(c) => {
                put(
                    out,
                    0,
                    mi_header(MI_LOAD_REGISTER_REG, LOAD_REGISTER_REG_SIZE)
                        | bit(c.mmio_remap_source, 16)
                        | bit(c.mmio_remap_destination, 17),
                );
                put(out, 1, c.source_register & 0x7F_FFFC);
                put(out, 2, c.destination_register & 0x7F_FFFC);
            }
            Command::LoadRegisterMem(c) => {
                put(out, 0, mi_header(MI_LOAD_REGISTER_MEM, LOAD_REGISTER_MEM_SIZE) | bit(c.mmio_remap, 17));
                put(out, 1, c.register_offset & 0x7F_FFFC);
                put_u64(out, 2, c.memory_address);
            }
            Command::Atomic(c) => {
                put(
                    out,
                    0,
                    mi_header(MI_ATOMIC, MI_ATOMIC_SIZE)
                        | ((c.opcode as u32) << 8)
                        | bit(c.return_data, 17)
                        | bit(c.inline_data.is_some(), 18)
                        | bit(c.cs_stall, 21),
                );
                put_u64(out, 1, c.address);
                put(out, 3, c.inline_data.unwrap_or(0));
            }
            Command::SemaphoreWait(c) => {
                put(
                    out,
                    0,
                    mi_header(MI_SEMAPHORE_WAIT, SEMAPHORE_WAIT_SIZE)
                        | ((c.compare as u32) << 12)
                        | bit(c.polling, 15),
                );
                put(out, 1, c.data);
                put_u64(out, 2, c.address);
            }
            Command::SetPredicate(c) => {
                put(out, 0, (MI_SET_PREDICATE << 23) | ((c.wparid as u32) << 4));
            }
            Command::PipeControl(c) => {
                put(out, 0, gfx_header(GFX_PIPE_CONTROL, PIPE_CONTROL_SIZE));
                put(
                    out,
                    1,
                    bit(c.dc_flush, 5) | bit(c.post_sync.is_some(), 14) | bit(c.cs_stall, 20),
                );
                if let Some((address, data)) = c.post_sync {
                    put_u64(out, 2, address);
                    put_u64(out, 4, data);
                }
            }
            Command::StoreDataImm(c) => {
                put(out, 0, mi_header(MI_STORE_DATA_IMM, STORE_DATA_IMM_SIZE));
                put_u64(out, 1, c.address);
                put(out, 3, c.data);
            }
            Command::BatchBufferStart(c) => {
                put(
                    out,
                    0,
                    mi_header(MI_BATCH_BUFFER_START, BATCH_BUFFER_START_SIZE)
                        | bit(true, 8)
                        | bit(c.predicated, 15)
                        | bit(c.second_level, 22),
                );
                put_u64(out, 1, c.address);
            }
            Command::BatchBufferEnd => {
                put(out, 0, MI_BATCH_BUFFER_END << 23);
            }
            Command::ComputeWalker(c) => {
                put(out, 0, gfx_header(GFX_COMPUTE_WALKER, COMPUTE_WALKER_SIZE));
                put(
                    out,
                    2,
                    (c.partition_type as u32) | bit(c.workload_partition_enable, 2),
                );
                put(out, 3, c.partition_size);
                for i in 0..3 {
                    put(out, 4 + i, c.thread_group_count[i]);
                    put(out, 7 + i, c.thread_group_start[i]);
                }
                put(out, 10, c.post_sync.operation as u32);
                put_u64(out, 11, c.post_sync.destination_address);
                put_u64(out, 13, c.post_sync.immediate_data);
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Command, usize), TilepartError> {
        let err = |context| TilepartError::Decode { offset: 0, context };
        if bytes.len() < 4 {
            return Err(err("truncated header"));
        }
        let header = get(bytes, 0);
        let kind = match header >> 29 {
            0 => match (header >> 23) & 0x3F {
                MI_SET_PREDICATE => CommandKind::SetPredicate,
                MI_BATCH_BUFFER_END => CommandKind::BatchBufferEnd,
                MI_SEMAPHORE_WAIT => CommandKind::SemaphoreWait,
                MI_STORE_DATA_IMM => CommandKind::StoreDataImm,
                MI_LOAD_REGISTER_IMM => CommandKind::LoadRegisterImm,
                MI_LOAD_REGISTER_MEM => CommandKind::LoadRegisterMem,
                MI_LOAD_REGISTER_REG => CommandKind::LoadRegisterReg,
                MI_ATOMIC => CommandKind::Atomic,
                MI_BATCH_BUFFER_START => CommandKind::BatchBufferStart,
                _ => return Err(err("unknown MI opcode")),
            },
            3 => match (header >> 16) & 0x1FFF {
                GFX_PIPE_CONTROL => CommandKind::PipeControl,
                GFX_COMPUTE_WALKER => CommandKind::ComputeWalker,
                _ => return Err(err("unknown 3D command")),
            },
            _ => return Err(err("unknown command type")),
        };
        let size = self.size_of(kind);
        if bytes.len() < size {
            return Err(err("truncated record"));
        }
        if size > 4 && header & 0xFF != dword_length(size) {
            return Err(err("dword length does not match record size"));
        }
        let bytes = &bytes[..size];
        let command = match kind {
            CommandKind::LoadRegisterImm => Command::LoadRegisterImm(LoadRegisterImm {
                register_offset: get(bytes, 1),
                data: get(bytes, 2),
                mmio_remap: flag(header, 17),
            }),
            CommandKind::LoadRegisterReg => Command::LoadRegisterReg(LoadRegisterReg {
                source_register: get(bytes, 1),
                destination_register: get(bytes, 2),
                mmio_remap_source: flag(header, 16),
                mmio_remap_destination: flag(header, 17),
            }),
            CommandKind::LoadRegisterMem => Command::LoadRegisterMem(LoadRegisterMem {
                register_offset: get(bytes, 1),
                memory_address: get_u64(bytes, 2),
                mmio_remap: flag(header, 17),
            }),
            CommandKind::Atomic => Command::Atomic(MiAtomic {
                address: get_u64(bytes, 1),
                opcode: match (header >> 8) & 0xFF {
                    0x4 => AtomicOpcode::Move4B,
                    0x5 => AtomicOpcode::Increment4B,
                    _ => return Err(err("unknown atomic opcode")),
                },
                return_data: flag(header, 17),
                cs_stall: flag(header, 21),
                inline_data: flag(header, 18).then(|| get(bytes, 3)),
            }),
            CommandKind::SemaphoreWait => Command::SemaphoreWait(SemaphoreWait {
                address: get_u64(bytes, 2),
                data: get(bytes, 1),
                compare: match (header >> 12) & 0x7 {
                    0 => CompareOperation::SadGreaterThanSdd,
                    1 => CompareOperation::SadGreaterThanOrEqualSdd,
                    2 => CompareOperation::SadLessThanSdd,
                    3 => CompareOperation::SadLessThanOrEqualSdd,
                    4 => CompareOperation::SadEqualSdd,
                    5 => CompareOperation::SadNotEqualSdd,
                    _ => return Err(err("unknown compare operation")),
                },
                polling: flag(header, 15),
            }),
            CommandKind::SetPredicate => Command::SetPredicate(SetPredicate {
                wparid: match (header >> 4) & 0x3 {
                    0 => WparidPredication::NoopNever,
                    1 => WparidPredication::NoopOnZero,
                    2 => WparidPredication::NoopOnNonZero,
                    _ => return Err(err("unknown wparid predication")),
                },
            }),
            CommandKind::PipeControl => {
                let flags = get(bytes, 1);
                Command::PipeControl(PipeControl {
                    cs_stall: flag(flags, 20),
                    dc_flush: flag(flags, 5),
                    post_sync: flag(flags, 14).then(|| (get_u64(bytes, 2), get_u64(bytes, 4))),
                })
            }
            CommandKind::StoreDataImm => Command::StoreDataImm(StoreDataImm {
                address: get_u64(bytes, 1),
                data: get(bytes, 3),
            }),
            CommandKind::BatchBufferStart => Command::BatchBufferStart(BatchBufferStart {
                address: get_u64(bytes, 1),
                predicated: flag(header, 15),
                second_level: flag(header, 22),
            }),
            CommandKind::BatchBufferEnd => Command::BatchBufferEnd,
            CommandKind::ComputeWalker => {
                let partition = get(bytes, 2);
                let mut walker = ComputeWalker {
                    partition_type: PartitionType::from_code(partition & 0x3)
                        .ok_or_else(|| err("unknown partition type"))?,
                    workload_partition_enable: flag(partition, 2),
                    partition_size: get(bytes, 3),
                    post_sync: PostSync {
                        operation: match get(bytes, 10) & 0x3 {
                            0 => PostSyncOperation::NoWrite,
                            1 => PostSyncOperation::WriteImmediate,
                            3 => PostSyncOperation::WriteTimestamp,
                            _ => return Err(err("unknown post-sync operation")),
                        },
                        destination_address: get_u64(bytes, 11),
                        immediate_data: get_u64(bytes, 13),
                    },
                    ..Default::default()
                };
                for i in 0..3 {
                    walker.thread_group_count[i] = get(bytes, 4 + i);
                    walker.thread_group_start[i] = get(bytes, 7 + i);
                }
                Command::ComputeWalker(walker)
            }
        };
        Ok((command, size))
    }
}

#[test]
fn walker_survives_encoding() {
    let isa = XeHpCore;
    let mut walker = ComputeWalker::new([64, 2, 1]);
    walker.partition_type = PartitionType::X;
    walker.partition_size = 16;
    walker.workload_partition_enable = true;
    walker.post_sync.operation = PostSyncOperation::WriteTimestamp;
    walker.post_sync.destination_address = 0x8000_4560_00;
    let command = Command::ComputeWalker(walker);
    let mut buf = [0u8; COMPUTE_WALKER_SIZE];
    isa.encode(&command, &mut buf);
    assert_eq!(isa.decode(&buf).unwrap(), (command, COMPUTE_WALKER_SIZE));
}

#[test]
fn zeroed_dwords_are_not_commands() {
    let isa = XeHpCore;
    assert!(matches!(
        isa.decode(&[0u8; 16]),
        Err(TilepartError::Decode { context: "unknown MI opcode", .. })
    ));
}

#[test]
fn semaphore_keeps_compare_and_polling() {
    let isa = XeHpCore;
    let command = Command::SemaphoreWait(SemaphoreWait {
        address: 0xFF_0010,
        data: 8,
        compare: CompareOperation::SadGreaterThanOrEqualSdd,
        polling: true,
    });
    let mut buf = [0u8; SEMAPHORE_WAIT_SIZE];
    isa.encode(&command, &mut buf);
    assert_eq!(get(&buf, 0) & 0xFF, 3);
    assert_eq!(isa.decode(&buf).unwrap().0, command);
}
