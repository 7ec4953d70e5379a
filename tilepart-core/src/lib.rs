#![no_std]
//! # tilepart-core
//!
//! tilepart-core is core part of tilepart walker partitioning library.
//! tilepart-core contains generation neutral command records, the
//! instruction set trait with its Xe-HP core encoding, linear command
//! streams over caller owned memory and the family registry.
//!
#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]
#![forbid(rustdoc::unescaped_backticks)]
#![forbid(rustdoc::redundant_explicit_links)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// See [Command](command::Command)
pub mod command;
/// See [TilepartError](error::TilepartError)
pub mod error;
/// See [HardwareInfo](hw::HardwareInfo)
pub mod hw;
/// See [InstructionSet](isa::InstructionSet)
pub mod isa;
/// See [Registry](registry::Registry)
pub mod registry;
/// See [CommandStream](stream::CommandStream)
pub mod stream;
/// See [XeHpCore](xe_hp::XeHpCore)
pub mod xe_hp;

#[cfg(feature = "std")]
impl std::error::Error for error::TilepartError {}

#[cfg(feature = "std")]
impl From<std::io::Error> for error::TilepartError {
    #[track_caller]
    fn from(value: std::io::Error) -> Self {
        Self::config_error(alloc::format!("IO {value}"))
    }
}
