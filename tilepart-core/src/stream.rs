use crate::command::Command;
use crate::error::TilepartError;
use crate::isa::InstructionSet;

/// Linear command stream over caller owned memory.
///
/// Bytes are written at increasing offsets. `gpu_base` is the GPU virtual
/// address of the first byte, so every offset has a known GPU address.
#[derive(Debug)]
pub struct CommandStream<'a> {
    buffer: &'a mut [u8],
    gpu_base: u64,
    used: usize,
}

impl<'a> CommandStream<'a> {
    /// Empty stream at the start of `buffer`
    pub fn new(buffer: &'a mut [u8], gpu_base: u64) -> CommandStream<'a> {
        CommandStream {
            buffer,
            gpu_base,
            used: 0,
        }
    }

    /// Bytes written so far
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len() - self.used
    }

    /// GPU address of the first byte
    #[must_use]
    pub const fn gpu_base(&self) -> u64 {
        self.gpu_base
    }

    /// GPU address of the next byte to be written
    #[must_use]
    pub const fn current_gpu_address(&self) -> u64 {
        self.gpu_base + self.used as u64
    }

    /// Fails with [`TilepartError::BufferOverflow`] if fewer than `bytes` are left
    pub fn ensure_capacity(&self, bytes: usize) -> Result<(), TilepartError> {
        if bytes > self.remaining() {
            return Err(TilepartError::BufferOverflow {
                required: bytes,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Encode one command at the current position, returns its GPU address
    pub fn append<I: InstructionSet + ?Sized>(
        &mut self,
        isa: &I,
        command: &Command,
    ) -> Result<u64, TilepartError> {
        let size = isa.size_of(command.kind());
        self.ensure_capacity(size)?;
        let address = self.current_gpu_address();
        isa.encode(command, &mut self.buffer[self.used..self.used + size]);
        self.used += size;
        Ok(address)
    }

    /// Reserve `bytes` zeroed bytes, returns their GPU address
    pub fn append_zeroed(&mut self, bytes: usize) -> Result<u64, TilepartError> {
        self.ensure_capacity(bytes)?;
        let address = self.current_gpu_address();
        self.buffer[self.used..self.used + bytes].fill(0);
        self.used += bytes;
        Ok(address)
    }

    /// Written part of the buffer
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.used]
    }
}

#[test]
fn overflow_leaves_stream_untouched() {
    use crate::command::Command;
    use crate::xe_hp::XeHpCore;
    let mut buf = [0xAAu8; 6];
    let mut stream = CommandStream::new(&mut buf, 0x1000);
    assert_eq!(stream.append(&XeHpCore, &Command::BatchBufferEnd).unwrap(), 0x1000);
    assert!(matches!(
        stream.append_zeroed(4),
        Err(TilepartError::BufferOverflow { required: 4, available: 2 })
    ));
    assert_eq!(stream.used(), 4);
    assert_eq!(stream.current_gpu_address(), 0x1004);
    assert_eq!(buf[4..], [0xAA, 0xAA]);
}
