use crate::error::SerdeErr;

/// Reads bits back out of a buffer produced by a `BitWriter`
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bit_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte_index = (self.bit_index / 8) as usize;
        let Some(byte) = self.buffer.get(byte_index) else {
            return Err(SerdeErr::Exhausted {
                bits_read: self.bit_index,
            });
        };
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output: u8 = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    /// Bits consumed so far
    pub fn bits_read(&self) -> u32 {
        self.bit_index
    }

    /// Whole bytes not yet touched by the reader
    pub fn bytes_remaining(&self) -> usize {
        let consumed = self.bit_index.div_ceil(8) as usize;
        self.buffer.len().saturating_sub(consumed)
    }
}
