use thiserror::Error;

/// Errors produced while reading from a bit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The stream ended before the value was complete
    #[error("bit stream exhausted after {bits_read} bits")]
    Exhausted { bits_read: u32 },

    /// A variable-length integer did not fit into its target type
    #[error("variable-length integer overflows {bits} bits")]
    IntegerOverflow { bits: u8 },

    /// A decoded string was not valid UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}
