use crate::hw::GpuFamily;
use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

/// TilepartError
#[derive(Debug)]
pub enum TilepartError {
    /// Partition count has no predication mask (not a power of two in 2..=32)
    InvalidPartitionCount {
        /// Requested partition count
        partition_count: u32,
    },
    /// Tile count too large for the cleanup rendezvous counter
    InvalidTileCount {
        /// Requested tile count
        tile_count: u32,
    },
    /// Requested walker partition type is not X, Y or Z
    InvalidPartitionType(u32),
    /// Command stream does not have enough space left
    BufferOverflow {
        /// Bytes that were about to be written
        required: usize,
        /// Bytes left in the stream
        available: usize,
    },
    /// No instruction set registered for this family
    UnsupportedFamily(GpuFamily),
    /// Bytes could not be decoded as a command record
    Decode {
        /// Offset of the undecodable record
        offset: usize,
        /// What went wrong
        context: &'static str,
    },
    /// Configuration could not be read or parsed
    Config(Box<str>),
}

impl TilepartError {
    /// Configuration error, remembers where it was raised
    #[track_caller]
    pub fn config_error(e: impl Into<String>) -> Self {
        use core::fmt::Write;
        let location = core::panic::Location::caller();
        let mut e: String = e.into();
        let _ = write!(e, ", {}:{}:{}", location.file(), location.line(), location.column());
        Self::Config(e.into())
    }
}

impl Display for TilepartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            TilepartError::InvalidPartitionCount { partition_count } => f.write_fmt(format_args!(
                "Partition count {partition_count} has no predication mask, expected a power of two between 2 and 32."
            )),
            TilepartError::InvalidTileCount { tile_count } => f.write_fmt(format_args!(
                "Tile count {tile_count} is too large, cleanup waits for twice the tile count."
            )),
            TilepartError::InvalidPartitionType(code) => f.write_fmt(format_args!(
                "Requested partition type {code} is not one of X (1), Y (2) or Z (3)."
            )),
            TilepartError::BufferOverflow { required, available } => f.write_fmt(format_args!(
                "Command stream overflow: {required} bytes required, but only {available} are available."
            )),
            TilepartError::UnsupportedFamily(family) => {
                f.write_fmt(format_args!("No instruction set registered for {family:?}"))
            }
            TilepartError::Decode { offset, context } => {
                f.write_fmt(format_args!("Decode error at offset {offset}: {context}"))
            }
            TilepartError::Config(e) => f.write_fmt(format_args!("Config {e}")),
        }
    }
}
