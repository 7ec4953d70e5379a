/// GPU families with tile partitioning support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum GpuFamily {
    /// Xe-HP core, first generation with multi-tile walkers
    XeHpCore,
}

/// Hardware information consumed when emitting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareInfo {
    /// Which instruction set encodes the commands
    pub family: GpuFamily,
    /// Can pipe controls flush the data cache?
    pub dc_flush_allowed: bool,
    /// Barriers need an extra CS stall pipe control before the post-sync one
    pub barrier_workaround_required: bool,
}

impl HardwareInfo {
    /// Default hardware info for given family
    #[must_use]
    pub const fn new(family: GpuFamily) -> HardwareInfo {
        HardwareInfo {
            family,
            dc_flush_allowed: true,
            barrier_workaround_required: false,
        }
    }

    /// Final dc flush bit for a pipe control that asks for a flush
    #[must_use]
    pub const fn dc_flush(&self, requested: bool) -> bool {
        requested && self.dc_flush_allowed
    }
}
