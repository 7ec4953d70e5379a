//! Implicit scaling, partitions walkers across all tiles of a device.

use crate::runtime::Runtime;
use tilepart_compiler::program::wparid_mask;
use tilepart_compiler::{
    construct_barrier, construct_dynamic, construct_static, estimate_barrier_size, estimate_space_required,
    select_partition_for_walker, FlushArgs, PartitionArgs, PartitionSelection,
};
use tilepart_core::command::{Command, CommandKind, ComputeWalker, PartitionType};
use tilepart_core::error::TilepartError;
use tilepart_core::hw::HardwareInfo;
use tilepart_core::isa::{iter_commands, InstructionSet};
use tilepart_core::registry::Registry;
use tilepart_core::stream::CommandStream;

/// Per dispatch options of the caller
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    pub emit_self_cleanup: bool,
    pub emit_batch_buffer_end: bool,
    pub secondary_batch_buffer: bool,
    /// Kernel accesses images, partition along X
    pub uses_images: bool,
    pub prefer_static: bool,
    /// Per tile partition ids for static partitioning
    pub work_partition_allocation_gpu_va: u64,
}

/// Per barrier options of the caller
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BarrierRequest {
    pub emit_self_cleanup: bool,
    pub secondary_batch_buffer: bool,
    /// Immediate write done by the barrier, address and value
    pub post_sync: Option<(u64, u64)>,
}

/// What was programmed for one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub partition_count: u32,
    pub partition_type: PartitionType,
    pub static_partitioning: bool,
    pub bytes_programmed: usize,
}

enum Plan {
    // Walker copied as a single record
    Single(ComputeWalker),
    Partitioned {
        walker: ComputeWalker,
        args: PartitionArgs,
    },
}

/// Implicit scaling dispatcher
#[derive(Debug)]
pub struct ImplicitScaling<'r> {
    runtime: Runtime,
    registry: &'r Registry,
}

impl<'r> ImplicitScaling<'r> {
    /// Dispatcher with given runtime, instruction sets come from `registry`
    #[must_use]
    pub fn new(runtime: Runtime, registry: &'r Registry) -> ImplicitScaling<'r> {
        ImplicitScaling { runtime, registry }
    }

    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    // Caches are never flushed when configuration says so
    fn hardware_info(&self, hw: &HardwareInfo) -> HardwareInfo {
        let mut hw = *hw;
        if self.runtime.config.do_not_flush_caches() {
            hw.dc_flush_allowed = false;
        }
        hw
    }

    fn plan(&self, tile_count: u32, walker: &ComputeWalker, request: &DispatchRequest) -> Result<Plan, TilepartError> {
        let config = &self.runtime.config;
        let mut walker = *walker;
        if !config.enable_walker_partition() || tile_count <= 1 {
            return Ok(Plan::Single(walker));
        }
        let prefer_static = config.static_partitioning(request.prefer_static);
        let selection = select_partition_for_walker(
            &mut walker,
            tile_count,
            prefer_static,
            request.uses_images,
            &config.selector_policy(),
        )?;
        if self.runtime.debug_select() {
            println!("Tiles {tile_count}, walker {:?}, selected {selection:?}", walker.thread_group_count);
        }
        if selection.is_disabled() {
            return Ok(Plan::Single(walker));
        }
        if !selection.static_partitioning && wparid_mask(selection.partition_count).is_err() {
            if self.runtime.debug_select() {
                println!("No predication mask for {} partitions, dispatching walker without partitioning.", selection.partition_count);
            }
            return Ok(Plan::Single(walker));
        }
        Ok(Plan::Partitioned {
            walker,
            args: self.partition_args(tile_count, &selection, request),
        })
    }

    fn partition_args(&self, tile_count: u32, selection: &PartitionSelection, request: &DispatchRequest) -> PartitionArgs {
        let config = &self.runtime.config;
        PartitionArgs {
            work_partition_allocation_gpu_va: request.work_partition_allocation_gpu_va,
            partition_count: selection.partition_count,
            tile_count,
            emit_batch_buffer_end: request.emit_batch_buffer_end,
            secondary_batch_buffer: request.secondary_batch_buffer,
            synchronize_before_execution: config.synchronize_before_execution(),
            cross_tile_atomic_synchronization: config.cross_tile_atomic_synchronization(),
            semaphore_programming_required: config.semaphore_programming_required(),
            static_partitioning: selection.static_partitioning,
            emit_self_cleanup: config.self_cleanup(request.emit_self_cleanup),
            use_atomics_for_self_cleanup: config.use_atomics_for_self_cleanup(),
            initialize_wparid_register: config.initialize_wparid_register(),
            emit_pipe_control_stall: config.pipe_control_after_walker(),
            preferred_static_partitioning: false,
            use_post_sync: false,
            post_sync_gpu_address: 0,
            post_sync_immediate_value: 0,
        }
    }

    fn barrier_args(&self, tile_count: u32, request: &BarrierRequest) -> PartitionArgs {
        let (post_sync_gpu_address, post_sync_immediate_value) = request.post_sync.unwrap_or_default();
        PartitionArgs {
            tile_count,
            secondary_batch_buffer: request.secondary_batch_buffer,
            emit_self_cleanup: self.runtime.config.self_cleanup(request.emit_self_cleanup),
            use_atomics_for_self_cleanup: self.runtime.config.use_atomics_for_self_cleanup(),
            use_post_sync: request.post_sync.is_some(),
            post_sync_gpu_address,
            post_sync_immediate_value,
            ..Default::default()
        }
    }

    /// Bytes [`dispatch`](ImplicitScaling::dispatch) programs for the same arguments
    pub fn estimate_dispatch(
        &self,
        hw: &HardwareInfo,
        tile_count: u32,
        walker: &ComputeWalker,
        request: &DispatchRequest,
    ) -> Result<usize, TilepartError> {
        let isa = self.registry.get(hw.family)?;
        let size = match self.plan(tile_count, walker, request)? {
            Plan::Single(_) => isa.size_of(CommandKind::ComputeWalker),
            Plan::Partitioned { args, .. } => estimate_space_required(isa, &args),
        };
        if self.runtime.debug_sizes() {
            println!("Dispatch on {tile_count} tiles needs {size} bytes");
        }
        Ok(size)
    }

    /// Program walker at the current position of `stream`
    pub fn dispatch(
        &self,
        stream: &mut CommandStream,
        hw: &HardwareInfo,
        tile_count: u32,
        walker: &ComputeWalker,
        request: &DispatchRequest,
    ) -> Result<DispatchOutcome, TilepartError> {
        let isa = self.registry.get(hw.family)?;
        let hw = self.hardware_info(hw);
        let start = stream.used();
        let outcome = match self.plan(tile_count, walker, request)? {
            Plan::Single(walker) => {
                stream.append(isa, &Command::ComputeWalker(walker))?;
                DispatchOutcome {
                    partition_count: 1,
                    partition_type: walker.partition_type,
                    static_partitioning: false,
                    bytes_programmed: stream.used() - start,
                }
            }
            Plan::Partitioned { walker, args } => {
                let bytes_programmed = if args.static_partitioning {
                    construct_static(stream, isa, &hw, &walker, &args)?
                } else {
                    construct_dynamic(stream, isa, &hw, &walker, &args)?
                };
                DispatchOutcome {
                    partition_count: args.partition_count,
                    partition_type: walker.partition_type,
                    static_partitioning: args.static_partitioning,
                    bytes_programmed,
                }
            }
        };
        if self.runtime.debug_sizes() {
            println!("Programmed {} bytes, {outcome:?}", outcome.bytes_programmed);
        }
        if self.runtime.debug_emit() {
            print_commands(isa, &stream.as_bytes()[start..]);
        }
        Ok(outcome)
    }

    /// Bytes [`dispatch_barrier`](ImplicitScaling::dispatch_barrier) programs for the same arguments
    pub fn estimate_barrier(
        &self,
        hw: &HardwareInfo,
        tile_count: u32,
        request: &BarrierRequest,
    ) -> Result<usize, TilepartError> {
        let isa = self.registry.get(hw.family)?;
        let hw = self.hardware_info(hw);
        let size = estimate_barrier_size(isa, &self.barrier_args(tile_count, request), &hw);
        if self.runtime.debug_sizes() {
            println!("Barrier on {tile_count} tiles needs {size} bytes");
        }
        Ok(size)
    }

    /// Program cross tile barrier, returns bytes programmed
    pub fn dispatch_barrier(
        &self,
        stream: &mut CommandStream,
        hw: &HardwareInfo,
        tile_count: u32,
        request: &BarrierRequest,
        flush: &FlushArgs,
    ) -> Result<usize, TilepartError> {
        let isa = self.registry.get(hw.family)?;
        let hw = self.hardware_info(hw);
        let start = stream.used();
        let bytes_programmed = construct_barrier(stream, isa, &self.barrier_args(tile_count, request), flush, &hw)?;
        if self.runtime.debug_emit() {
            print_commands(isa, &stream.as_bytes()[start..]);
        }
        Ok(bytes_programmed)
    }
}

// Prints records until the first control section
fn print_commands(isa: &dyn InstructionSet, bytes: &[u8]) {
    for record in iter_commands(isa, bytes) {
        match record {
            Ok((offset, command)) => println!("{offset:>6} {command:?}"),
            Err(_) => break,
        }
    }
}
