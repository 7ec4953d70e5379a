#![allow(dead_code)]

use tilepart_core::command::{Command, ComputeWalker, PartitionType, PostSyncOperation};
use tilepart_core::isa::iter_commands;
use tilepart_core::xe_hp::XeHpCore;

/// Records before and after a control section
pub struct Parsed {
    pub body: Vec<(usize, Command)>,
    pub tail: Vec<(usize, Command)>,
}

pub fn parse(bytes: &[u8], control_section_offset: usize, control_section_size: usize) -> Parsed {
    let mut commands = iter_commands(&XeHpCore, bytes);
    let mut body = Vec::new();
    while commands.offset() < control_section_offset {
        body.push(commands.next().unwrap().unwrap());
    }
    assert_eq!(commands.offset(), control_section_offset);
    commands.skip_bytes(control_section_size);
    let tail = commands.map(|c| c.unwrap()).collect();
    Parsed { body, tail }
}

pub fn walker(count: [u32; 3], partition_type: PartitionType) -> ComputeWalker {
    let mut walker = ComputeWalker::new(count);
    walker.partition_type = partition_type;
    walker.post_sync.operation = PostSyncOperation::WriteTimestamp;
    walker.post_sync.destination_address = 0x1234_5600;
    walker
}
