use kgame_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr};

use super::ids::{PropertyId, ID_COMMAND};

/// Leading part of every property message.
///
/// A value update is `[property id][payload]`. A command is
/// `[ID_COMMAND][property id][command code][operands]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyHeader {
    Value { property_id: PropertyId },
    Command { property_id: PropertyId, code: u8 },
}

impl PropertyHeader {
    pub fn property_id(&self) -> PropertyId {
        match self {
            PropertyHeader::Value { property_id } | PropertyHeader::Command { property_id, .. } => {
                *property_id
            }
        }
    }

    /// Builds a complete message: this header followed by `payload`
    pub fn encode(&self, payload: impl FnOnce(&mut dyn BitWrite)) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        payload(&mut writer);
        writer.to_bytes()
    }
}

impl Serde for PropertyHeader {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            PropertyHeader::Value { property_id } => {
                property_id.ser(writer);
            }
            PropertyHeader::Command { property_id, code } => {
                ID_COMMAND.ser(writer);
                property_id.ser(writer);
                code.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let property_id = PropertyId::de(reader)?;
        if property_id != ID_COMMAND {
            return Ok(PropertyHeader::Value { property_id });
        }
        let property_id = PropertyId::de(reader)?;
        let code = u8::de(reader)?;
        Ok(PropertyHeader::Command { property_id, code })
    }
}
