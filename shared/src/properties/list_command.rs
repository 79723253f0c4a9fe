use kgame_serde::{BitReader, BitWrite, Serde, UnsignedVariableInteger};

use super::{error::ListCommandError, ids::PropertyId, message::PropertyHeader};

pub const CMD_INSERT: u8 = 5;
pub const CMD_REMOVE: u8 = 6;
pub const CMD_CLEAR: u8 = 7;
pub const CMD_APPEND: u8 = 8;

type Index = UnsignedVariableInteger<7>;

/// A replicated mutation of a list property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand<T> {
    Insert { index: u64, item: T },
    Append(T),
    Remove { index: u64 },
    Clear,
}

impl<T: Serde> ListCommand<T> {
    pub fn code(&self) -> u8 {
        match self {
            ListCommand::Insert { .. } => CMD_INSERT,
            ListCommand::Append(_) => CMD_APPEND,
            ListCommand::Remove { .. } => CMD_REMOVE,
            ListCommand::Clear => CMD_CLEAR,
        }
    }

    pub fn write_operands(&self, writer: &mut dyn BitWrite) {
        match self {
            ListCommand::Insert { index, item } => {
                Index::new(*index).ser(writer);
                item.ser(writer);
            }
            ListCommand::Append(item) => item.ser(writer),
            ListCommand::Remove { index } => Index::new(*index).ser(writer),
            ListCommand::Clear => {}
        }
    }

    pub fn read(code: u8, reader: &mut BitReader) -> Result<Self, ListCommandError> {
        match code {
            CMD_INSERT => {
                let index = Index::de(reader)?.get();
                let item = T::de(reader)?;
                Ok(ListCommand::Insert { index, item })
            }
            CMD_APPEND => Ok(ListCommand::Append(T::de(reader)?)),
            CMD_REMOVE => Ok(ListCommand::Remove {
                index: Index::de(reader)?.get(),
            }),
            CMD_CLEAR => Ok(ListCommand::Clear),
            code => Err(ListCommandError::UnknownCommand { code }),
        }
    }

    /// Full command message for `property_id`
    pub fn encode(&self, property_id: PropertyId) -> Vec<u8> {
        PropertyHeader::Command {
            property_id,
            code: self.code(),
        }
        .encode(|writer| self.write_operands(writer))
    }

    /// Applies the command. An out-of-range index leaves `items` untouched.
    pub fn apply(self, items: &mut Vec<T>) -> Result<(), ListCommandError> {
        match self {
            ListCommand::Insert { index, item } => {
                let position = checked_index(index, items.len(), true)?;
                items.insert(position, item);
            }
            ListCommand::Append(item) => items.push(item),
            ListCommand::Remove { index } => {
                let position = checked_index(index, items.len(), false)?;
                items.remove(position);
            }
            ListCommand::Clear => items.clear(),
        }
        Ok(())
    }
}

// Insertion may target one past the end; removal may not
fn checked_index(index: u64, len: usize, allow_end: bool) -> Result<usize, ListCommandError> {
    let out_of_range = ListCommandError::IndexOutOfRange { index, len };
    let position = usize::try_from(index).map_err(|_| out_of_range.clone())?;
    if position < len || (allow_end && position == len) {
        Ok(position)
    } else {
        Err(out_of_range)
    }
}
