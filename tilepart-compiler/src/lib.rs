//! Tilepart walker partitioning compiler
//!
//! Splits one compute walker across GPU tiles. Constructors write into a
//! [`CommandStream`](tilepart_core::stream::CommandStream) and return the
//! number of bytes programmed, estimators return the same number without
//! writing anything.

#![no_std]
#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
//#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]
#![forbid(rustdoc::unescaped_backticks)]
#![forbid(rustdoc::redundant_explicit_links)]

#[cfg(feature = "std")]
extern crate std;

mod args;
mod barrier;
mod dynamic_partition;
pub mod estimate;
pub mod layout;
pub mod program;
mod selector;
mod static_partition;

pub use args::{FlushArgs, PartitionArgs};
pub use barrier::construct_barrier;
pub use dynamic_partition::construct_dynamic;
pub use estimate::{estimate_barrier_size, estimate_dynamic_size, estimate_space_required, estimate_static_size};
pub use selector::{
    select_partition, select_partition_for_walker, PartitionSelection, SelectorPolicy, WorkloadExtents,
};
pub use static_partition::construct_static;
