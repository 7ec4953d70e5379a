/// Arguments shared by dynamic, static and barrier constructors.
///
/// Built fresh for every dispatch and only read by the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionArgs {
    /// GPU address each tile loads its partition id from (static partitioning)
    pub work_partition_allocation_gpu_va: u64,
    pub partition_count: u32,
    pub tile_count: u32,
    pub emit_batch_buffer_end: bool,
    pub secondary_batch_buffer: bool,
    /// All tiles rendezvous before the walker runs
    pub synchronize_before_execution: bool,
    /// All tiles rendezvous after the walker finished
    pub cross_tile_atomic_synchronization: bool,
    /// Poll walker post-sync slots instead of relying on atomics only
    pub semaphore_programming_required: bool,
    pub static_partitioning: bool,
    /// Zero the control section again so the buffer can be replayed
    pub emit_self_cleanup: bool,
    /// Zero counters with atomic moves instead of store data immediate
    pub use_atomics_for_self_cleanup: bool,
    pub initialize_wparid_register: bool,
    pub emit_pipe_control_stall: bool,
    /// Dynamic buffer reloads WPARID from the static allocation before leaving
    pub preferred_static_partitioning: bool,
    /// Barrier pipe control writes `post_sync_immediate_value`
    pub use_post_sync: bool,
    pub post_sync_gpu_address: u64,
    pub post_sync_immediate_value: u64,
}

impl Default for PartitionArgs {
    fn default() -> Self {
        PartitionArgs {
            work_partition_allocation_gpu_va: 0,
            partition_count: 0,
            tile_count: 0,
            emit_batch_buffer_end: false,
            secondary_batch_buffer: false,
            synchronize_before_execution: false,
            cross_tile_atomic_synchronization: true,
            semaphore_programming_required: false,
            static_partitioning: false,
            emit_self_cleanup: false,
            use_atomics_for_self_cleanup: false,
            initialize_wparid_register: true,
            emit_pipe_control_stall: true,
            preferred_static_partitioning: false,
            use_post_sync: false,
            post_sync_gpu_address: 0,
            post_sync_immediate_value: 0,
        }
    }
}

/// Cache flushes requested by the caller of a barrier
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushArgs {
    pub dc_flush: bool,
}
