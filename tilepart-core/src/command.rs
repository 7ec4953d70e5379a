//! Generation neutral command records.
//!
//! Each record describes one hardware instruction. Bit layout is owned by
//! [`InstructionSet`](crate::isa::InstructionSet) implementations, these
//! structs only carry the fields the partitioning code programs or inspects.

/// Predication mask register, selects which partition ids are active
pub const PREDICATION_MASK_CCS_OFFSET: u32 = 0x21FC;
/// Walker partition id register
pub const WPARID_CCS_OFFSET: u32 = 0x221C;
/// Address offset register
pub const ADDRESS_OFFSET_CCS_OFFSET: u32 = 0x23B4;

/// General purpose register 0
pub const GENERAL_PURPOSE_REGISTER_0: u32 = 0x2600;
/// General purpose register 1
pub const GENERAL_PURPOSE_REGISTER_1: u32 = 0x2608;
/// General purpose register 2
pub const GENERAL_PURPOSE_REGISTER_2: u32 = 0x2610;
/// General purpose register 3
pub const GENERAL_PURPOSE_REGISTER_3: u32 = 0x2618;
/// General purpose register 4, receives atomic return data
pub const GENERAL_PURPOSE_REGISTER_4: u32 = 0x2620;
/// General purpose register 5
pub const GENERAL_PURPOSE_REGISTER_5: u32 = 0x2628;
/// General purpose register 6
pub const GENERAL_PURPOSE_REGISTER_6: u32 = 0x2630;

/// Walker partition type, which dimension is split across partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PartitionType {
    /// No partitioning
    #[default]
    Disabled = 0,
    /// Split along X
    X = 1,
    /// Split along Y
    Y = 2,
    /// Split along Z
    Z = 3,
}

impl PartitionType {
    /// Partition type from its hardware code
    #[must_use]
    pub const fn from_code(code: u32) -> Option<PartitionType> {
        match code {
            0 => Some(PartitionType::Disabled),
            1 => Some(PartitionType::X),
            2 => Some(PartitionType::Y),
            3 => Some(PartitionType::Z),
            _ => None,
        }
    }

    /// Index into per dimension arrays, None for disabled
    #[must_use]
    pub const fn axis(self) -> Option<usize> {
        match self {
            PartitionType::Disabled => None,
            PartitionType::X => Some(0),
            PartitionType::Y => Some(1),
            PartitionType::Z => Some(2),
        }
    }
}

/// MI_LOAD_REGISTER_IMM, writes an immediate into a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadRegisterImm {
    /// MMIO offset of the register
    pub register_offset: u32,
    /// Value written
    pub data: u32,
    /// Offset is relative to the executing engine
    pub mmio_remap: bool,
}

/// MI_LOAD_REGISTER_REG, copies one register into another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadRegisterReg {
    /// Register read
    pub source_register: u32,
    /// Register written
    pub destination_register: u32,
    /// Source offset is engine relative
    pub mmio_remap_source: bool,
    /// Destination offset is engine relative
    pub mmio_remap_destination: bool,
}

/// MI_LOAD_REGISTER_MEM, loads a register from a dword in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadRegisterMem {
    /// Register written
    pub register_offset: u32,
    /// GPU address of the dword read
    pub memory_address: u64,
    /// Offset is engine relative
    pub mmio_remap: bool,
}

/// Atomic operation applied to a dword in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicOpcode {
    /// Overwrite with the inline operand
    Move4B = 0x4,
    /// Add one
    Increment4B = 0x5,
}

/// MI_ATOMIC on one dword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiAtomic {
    /// GPU address of the dword
    pub address: u64,
    /// Operation applied
    pub opcode: AtomicOpcode,
    /// Writes the pre operation value into GPR4
    pub return_data: bool,
    /// Wait for the result before parsing further commands
    pub cs_stall: bool,
    /// Operand carried in the command, used by [`AtomicOpcode::Move4B`]
    pub inline_data: Option<u32>,
}

impl MiAtomic {
    /// Plain dword increment
    #[must_use]
    pub const fn increment(address: u64, return_data: bool) -> MiAtomic {
        MiAtomic {
            address,
            opcode: AtomicOpcode::Increment4B,
            return_data,
            cs_stall: return_data,
            inline_data: None,
        }
    }

    /// Atomic store of zero
    #[must_use]
    pub const fn clear(address: u64) -> MiAtomic {
        MiAtomic {
            address,
            opcode: AtomicOpcode::Move4B,
            return_data: false,
            cs_stall: false,
            inline_data: Some(0),
        }
    }
}

/// Semaphore compare operation, SAD is memory value, SDD is inline data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperation {
    /// SAD > SDD
    SadGreaterThanSdd = 0,
    /// SAD >= SDD
    SadGreaterThanOrEqualSdd = 1,
    /// SAD < SDD
    SadLessThanSdd = 2,
    /// SAD <= SDD
    SadLessThanOrEqualSdd = 3,
    /// SAD == SDD
    SadEqualSdd = 4,
    /// SAD != SDD
    SadNotEqualSdd = 5,
}

/// MI_SEMAPHORE_WAIT, stalls until the memory dword satisfies `compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreWait {
    /// GPU address of the polled dword
    pub address: u64,
    /// Inline operand (SDD)
    pub data: u32,
    /// Condition that ends the wait
    pub compare: CompareOperation,
    /// Poll memory instead of waiting for a signal
    pub polling: bool,
}

/// How the walker partition id drives predication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WparidPredication {
    /// Predication disabled
    #[default]
    NoopNever = 0,
    /// Following commands are skipped while WPARID is zero
    NoopOnZero = 1,
    /// Following commands are skipped unless WPARID is zero
    NoopOnNonZero = 2,
}

/// MI_SET_PREDICATE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SetPredicate {
    /// Predication mode driven by WPARID
    pub wparid: WparidPredication,
}

/// PIPE_CONTROL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipeControl {
    /// Stall the command streamer until previous work completes
    pub cs_stall: bool,
    /// Flush the data cache
    pub dc_flush: bool,
    /// Immediate post-sync write, address and value
    pub post_sync: Option<(u64, u64)>,
}

/// MI_STORE_DATA_IMM, stores one dword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreDataImm {
    /// GPU address written
    pub address: u64,
    /// Value written
    pub data: u32,
}

/// MI_BATCH_BUFFER_START, jumps to `address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchBufferStart {
    /// Jump target
    pub address: u64,
    /// Jump only if the predicate allows it
    pub predicated: bool,
    /// Target is a second level batch buffer
    pub second_level: bool,
}

/// Operation performed by the walker once its thread groups finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostSyncOperation {
    /// Nothing is written
    #[default]
    NoWrite = 0,
    /// Write `immediate_data`
    WriteImmediate = 1,
    /// Write a timestamp
    WriteTimestamp = 3,
}

/// Walker post-sync write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PostSync {
    /// What is written
    pub operation: PostSyncOperation,
    /// Where partition 0 writes, every further partition writes 16 bytes after the previous one
    pub destination_address: u64,
    /// Value for [`PostSyncOperation::WriteImmediate`]
    pub immediate_data: u64,
}

/// Compute dispatch, built upstream and only partitioned here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComputeWalker {
    /// First thread group id per dimension
    pub thread_group_start: [u32; 3],
    /// Thread groups per dimension
    pub thread_group_count: [u32; 3],
    /// Dimension split across partitions
    pub partition_type: PartitionType,
    /// Thread groups per partition along the split dimension
    pub partition_size: u32,
    /// Walker reads WPARID to find its partition
    pub workload_partition_enable: bool,
    /// Write done when the walker finishes
    pub post_sync: PostSync,
}

impl ComputeWalker {
    /// Walker over given thread group counts starting at origin
    #[must_use]
    pub fn new(thread_group_count: [u32; 3]) -> ComputeWalker {
        ComputeWalker {
            thread_group_count,
            ..Default::default()
        }
    }

    /// Workgroup count along the partitioned dimension
    #[must_use]
    pub fn partitioned_extent(&self) -> Option<u32> {
        self.partition_type.axis().map(|a| self.thread_group_count[a])
    }
}

/// One hardware instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// See [`LoadRegisterImm`]
    LoadRegisterImm(LoadRegisterImm),
    /// See [`LoadRegisterReg`]
    LoadRegisterReg(LoadRegisterReg),
    /// See [`LoadRegisterMem`]
    LoadRegisterMem(LoadRegisterMem),
    /// See [`MiAtomic`]
    Atomic(MiAtomic),
    /// See [`SemaphoreWait`]
    SemaphoreWait(SemaphoreWait),
    /// See [`SetPredicate`]
    SetPredicate(SetPredicate),
    /// See [`PipeControl`]
    PipeControl(PipeControl),
    /// See [`StoreDataImm`]
    StoreDataImm(StoreDataImm),
    /// See [`BatchBufferStart`]
    BatchBufferStart(BatchBufferStart),
    /// MI_BATCH_BUFFER_END
    BatchBufferEnd,
    /// See [`ComputeWalker`]
    ComputeWalker(ComputeWalker),
}

/// Kind of command, used to query fixed record sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    /// [`Command::LoadRegisterImm`]
    LoadRegisterImm,
    /// [`Command::LoadRegisterReg`]
    LoadRegisterReg,
    /// [`Command::LoadRegisterMem`]
    LoadRegisterMem,
    /// [`Command::Atomic`]
    Atomic,
    /// [`Command::SemaphoreWait`]
    SemaphoreWait,
    /// [`Command::SetPredicate`]
    SetPredicate,
    /// [`Command::PipeControl`]
    PipeControl,
    /// [`Command::StoreDataImm`]
    StoreDataImm,
    /// [`Command::BatchBufferStart`]
    BatchBufferStart,
    /// [`Command::BatchBufferEnd`]
    BatchBufferEnd,
    /// [`Command::ComputeWalker`]
    ComputeWalker,
}

impl Command {
    /// Kind of this command
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Command::LoadRegisterImm(_) => CommandKind::LoadRegisterImm,
            Command::LoadRegisterReg(_) => CommandKind::LoadRegisterReg,
            Command::LoadRegisterMem(_) => CommandKind::LoadRegisterMem,
            Command::Atomic(_) => CommandKind::Atomic,
            Command::SemaphoreWait(_) => CommandKind::SemaphoreWait,
            Command::SetPredicate(_) => CommandKind::SetPredicate,
            Command::PipeControl(_) => CommandKind::PipeControl,
            Command::StoreDataImm(_) => CommandKind::StoreDataImm,
            Command::BatchBufferStart(_) => CommandKind::BatchBufferStart,
            Command::BatchBufferEnd => CommandKind::BatchBufferEnd,
            Command::ComputeWalker(_) => CommandKind::ComputeWalker,
        }
    }
}
