use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A type that can be written to and read from a bit stream
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value into the given stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads a value from the given stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` will write for this value
    fn bit_length(&self) -> u32 {
        let mut counter = crate::BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}
