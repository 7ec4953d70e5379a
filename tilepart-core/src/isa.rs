use crate::command::{Command, CommandKind};
use crate::error::TilepartError;
use crate::hw::GpuFamily;

/// Implement this trait for every hardware generation.
///
/// Records have a fixed size per generation. Partitioning code is written
/// once against this trait and queries sizes through [`size_of`](InstructionSet::size_of).
pub trait InstructionSet {
    /// Family this instruction set encodes for
    fn family(&self) -> GpuFamily;
    /// Size of one record of given kind in bytes
    fn size_of(&self, kind: CommandKind) -> usize;
    /// Encode command into `out`, which is exactly `size_of(command.kind())` bytes long
    fn encode(&self, command: &Command, out: &mut [u8]);
    /// Decode one record from the start of `bytes`, returns the command and its length
    fn decode(&self, bytes: &[u8]) -> Result<(Command, usize), TilepartError>;
}

/// Iterator over records in an emitted stream
pub struct Commands<'a, I: ?Sized> {
    isa: &'a I,
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<I: InstructionSet + ?Sized> Commands<'_, I> {
    /// Current offset in bytes from the start of the slice
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Skip bytes that are not records, for example a control section
    pub fn skip_bytes(&mut self, bytes: usize) {
        self.offset += bytes;
    }
}

impl<I: InstructionSet + ?Sized> Iterator for Commands<'_, I> {
    type Item = Result<(usize, Command), TilepartError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match self.isa.decode(&self.bytes[self.offset..]) {
            Ok((command, len)) => {
                let offset = self.offset;
                self.offset += len;
                Some(Ok((offset, command)))
            }
            Err(TilepartError::Decode { offset, context }) => {
                self.failed = true;
                Some(Err(TilepartError::Decode {
                    offset: self.offset + offset,
                    context,
                }))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Walk records in `bytes` from the beginning
pub fn iter_commands<'a, I: InstructionSet + ?Sized>(isa: &'a I, bytes: &'a [u8]) -> Commands<'a, I> {
    Commands {
        isa,
        bytes,
        offset: 0,
        failed: false,
    }
}

#[test]
fn skip_bytes_steps_over_control_section() {
    use crate::xe_hp::XeHpCore;
    let isa = XeHpCore;
    let end = isa.size_of(CommandKind::BatchBufferEnd);
    let mut bytes = alloc::vec![0u8; 2 * end + 16];
    isa.encode(&Command::BatchBufferEnd, &mut bytes[..end]);
    isa.encode(&Command::BatchBufferEnd, &mut bytes[end + 16..]);

    let mut commands = iter_commands(&isa, &bytes);
    assert_eq!(commands.next().unwrap().unwrap(), (0, Command::BatchBufferEnd));
    commands.skip_bytes(16);
    assert_eq!(commands.offset(), end + 16);
    assert_eq!(commands.next().unwrap().unwrap(), (end + 16, Command::BatchBufferEnd));
    assert!(commands.next().is_none());
}
