//! # tilepart
//!
//! Implicit scaling of compute walkers across GPU tiles.
//!
//! [`ImplicitScaling`] selects how a walker is partitioned, sizes the
//! command buffer and programs dynamic, static or non partitioned dispatches
//! and cross tile barriers. Configuration is read once by
//! [`Runtime::from_env`], set `TILEPART_DEBUG` to print what happens.

#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]

mod config;
mod dispatch;
mod runtime;

pub use config::ScalingConfig;
pub use dispatch::{BarrierRequest, DispatchOutcome, DispatchRequest, ImplicitScaling};
pub use runtime::{read_config, Runtime};

pub use tilepart_compiler::{
    construct_barrier, construct_dynamic, construct_static, estimate_barrier_size, estimate_dynamic_size,
    estimate_static_size, select_partition, FlushArgs, PartitionArgs, PartitionSelection, SelectorPolicy,
    WorkloadExtents,
};
pub use tilepart_core::command::{Command, CommandKind, ComputeWalker, PartitionType, PipeControl};
pub use tilepart_core::error::TilepartError;
pub use tilepart_core::hw::{GpuFamily, HardwareInfo};
pub use tilepart_core::isa::{iter_commands, InstructionSet};
pub use tilepart_core::registry::Registry;
pub use tilepart_core::stream::CommandStream;
pub use tilepart_core::xe_hp::XeHpCore;
