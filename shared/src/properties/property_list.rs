use std::sync::Arc;

use log::{debug, error};

use kgame_serde::{BitReader, BitWrite, Serde, SerdeErr};

use super::{
    config::PropertyConfig,
    error::{HandlerError, ListCommandError, PropertyError},
    handler::{HandlerLink, PropertyHandler},
    ids::PropertyId,
    list_command::ListCommand,
    message::PropertyHeader,
    policy::PropertyPolicy,
    slot::{PropertyCell, PropertyFlags, PropertySlot},
    value::PropertyValue,
};

/// A replicated ordered sequence.
///
/// Each mutation travels as a small command instead of the whole sequence.
/// Clean and Dirty forward the command; Dirty and Local apply it locally
/// right away, by decoding the very bytes that were forwarded.
pub struct PropertyList<T: PropertyValue> {
    cell: Arc<ListCell<T>>,
}

pub(crate) struct ListCell<T> {
    cell: PropertyCell<Vec<T>>,
}

impl<T: PropertyValue> PropertyList<T> {
    pub fn new(id: PropertyId, handler: &PropertyHandler) -> Result<Self, HandlerError> {
        Self::with_config(id, handler, PropertyConfig::default())
    }

    pub fn with_config(
        id: PropertyId,
        handler: &PropertyHandler,
        config: PropertyConfig,
    ) -> Result<Self, HandlerError> {
        let flags = PropertyFlags {
            policy: config.policy.unwrap_or_else(|| handler.policy()),
            read_only: config.read_only,
            emits_signal: config.emits_signal,
            optimized: config.optimized,
            dirty: false,
        };
        let cell = Arc::new(ListCell {
            cell: PropertyCell::new(id, Vec::new(), flags),
        });
        let slot: Arc<dyn PropertySlot> = cell.clone();
        handler.register(&slot, config.name)?;
        Ok(Self { cell })
    }

    pub fn id(&self) -> PropertyId {
        self.cell.cell.id()
    }

    // Mutation

    pub fn insert(&self, index: usize, item: T) -> Result<(), PropertyError> {
        self.issue(ListCommand::Insert {
            index: index as u64,
            item,
        })
    }

    pub fn prepend(&self, item: T) -> Result<(), PropertyError> {
        self.insert(0, item)
    }

    pub fn append(&self, item: T) -> Result<(), PropertyError> {
        self.issue(ListCommand::Append(item))
    }

    pub fn remove(&self, index: usize) -> Result<(), PropertyError> {
        self.issue(ListCommand::Remove {
            index: index as u64,
        })
    }

    /// Removes the first element equal to `item`. Returns `Ok(false)` without
    /// issuing a command if there is none.
    pub fn remove_value(&self, item: &T) -> Result<bool, PropertyError> {
        let Some(index) = self.position(item) else {
            return Ok(false);
        };
        self.remove(index)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), PropertyError> {
        self.issue(ListCommand::Clear)
    }

    fn issue(&self, command: ListCommand<T>) -> Result<(), PropertyError> {
        let property_id = self.id();
        let flags = self.flags();
        if flags.read_only {
            return Err(PropertyError::ReadOnly { property_id });
        }

        // Under Clean the local sequence may still be waiting for earlier
        // commands, so every participant validates on delivery instead
        if flags.policy.applies_locally() {
            let len = self.len();
            let index = match &command {
                ListCommand::Insert { index, .. } if *index > len as u64 => Some(*index),
                ListCommand::Remove { index } if *index >= len as u64 => Some(*index),
                _ => None,
            };
            if let Some(index) = index {
                return Err(PropertyError::IndexOutOfRange {
                    property_id,
                    index: index as usize,
                    len,
                });
            }
        }

        let message = command.encode(property_id);

        let mut result = Ok(());
        if flags.policy.transmits() {
            result = self.cell.cell.forward(&message);
        }
        if flags.policy.applies_locally() {
            self.apply_local(&message)?;
        }
        result
    }

    fn apply_local(&self, message: &[u8]) -> Result<(), PropertyError> {
        let property_id = self.id();
        let mut reader = BitReader::new(message);
        let code = match PropertyHeader::de(&mut reader) {
            Ok(PropertyHeader::Command { code, .. }) => code,
            Ok(PropertyHeader::Value { .. }) => {
                return Err(PropertyError::Command {
                    property_id,
                    cause: ListCommandError::UnknownCommand { code: 0 },
                })
            }
            Err(err) => {
                return Err(PropertyError::Command {
                    property_id,
                    cause: ListCommandError::Decode(err),
                })
            }
        };
        PropertySlot::command(self.cell.as_ref(), &mut reader, code, true)
            .map_err(|cause| PropertyError::Command { property_id, cause })?;
        self.cell.cell.update_flags(|flags| flags.dirty = true);
        Ok(())
    }

    /// Forwards the whole sequence as a value update
    pub fn send_current(&self) -> bool {
        PropertySlot::send_current(self.cell.as_ref()).is_ok()
    }

    // Access

    pub fn get(&self, index: usize) -> Option<T> {
        self.cell.cell.read().value.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.cell.cell.read().value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.cell.read().value.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.cell.cell.read().value.contains(item)
    }

    pub fn position(&self, item: &T) -> Option<usize> {
        self.cell.cell.read().value.iter().position(|x| x == item)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.cell.cell.read().value.clone()
    }

    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.cell.cell.read().value)
    }

    // Serialization / deserialization

    pub fn load(&self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        PropertySlot::load(self.cell.as_ref(), reader)
    }

    pub fn save(&self, writer: &mut dyn BitWrite) {
        PropertySlot::save(self.cell.as_ref(), writer)
    }

    // Flags

    pub fn flags(&self) -> PropertyFlags {
        self.cell.cell.flags()
    }

    pub fn policy(&self) -> PropertyPolicy {
        self.flags().policy
    }

    pub fn set_policy(&self, policy: PropertyPolicy) {
        self.cell.cell.update_flags(|flags| flags.policy = policy);
    }

    pub fn is_read_only(&self) -> bool {
        self.flags().read_only
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.cell.cell.update_flags(|flags| flags.read_only = read_only);
    }

    pub fn set_emitting_signal(&self, emits_signal: bool) {
        self.cell
            .cell
            .update_flags(|flags| flags.emits_signal = emits_signal);
    }

    pub fn is_dirty(&self) -> bool {
        self.flags().dirty
    }

    pub fn is_registered(&self) -> bool {
        self.cell.cell.link().is_some_and(|link| link.is_alive())
    }
}

impl<T: PropertyValue> Drop for PropertyList<T> {
    fn drop(&mut self) {
        if let Some(link) = self.cell.cell.take_link() {
            link.forget(self.id());
        }
    }
}

impl<T: PropertyValue + std::fmt::Debug> std::fmt::Debug for PropertyList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.cell.cell.read();
        f.debug_struct("PropertyList")
            .field("id", &self.id())
            .field("items", &state.value)
            .field("flags", &state.flags)
            .finish()
    }
}

impl<T: PropertyValue> PropertySlot for ListCell<T> {
    fn id(&self) -> PropertyId {
        self.cell.id()
    }

    fn flags(&self) -> PropertyFlags {
        self.cell.flags()
    }

    fn set_policy(&self, policy: PropertyPolicy) {
        self.cell.update_flags(|flags| flags.policy = policy);
    }

    fn set_read_only(&self, read_only: bool) {
        self.cell.update_flags(|flags| flags.read_only = read_only);
    }

    fn attach(&self, link: HandlerLink) {
        self.cell.attach(link);
    }

    fn detach(&self) {
        self.cell.take_link();
    }

    fn load(&self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        let items = Vec::<T>::de(reader)?;
        {
            let mut state = self.cell.write();
            state.value = items;
            state.flags.dirty = false;
        }
        debug!("PropertyList {} loaded", self.cell.id());
        self.cell.notify();
        Ok(())
    }

    fn save(&self, writer: &mut dyn BitWrite) {
        self.cell.read().value.ser(writer);
    }

    fn command(
        &self,
        reader: &mut BitReader,
        code: u8,
        is_sender: bool,
    ) -> Result<(), ListCommandError> {
        let command = ListCommand::<T>::read(code, reader)?;
        debug!(
            "PropertyList {} got command {} (sender: {})",
            self.cell.id(),
            code,
            is_sender
        );
        let result = command.apply(&mut self.cell.write().value);
        if let Err(err) = &result {
            error!("PropertyList {}: {}", self.cell.id(), err);
            return result;
        }
        self.cell.notify();
        Ok(())
    }

    fn send_current(&self) -> Result<(), PropertyError> {
        let message = PropertyHeader::Value {
            property_id: self.cell.id(),
        }
        .encode(|writer| self.cell.read().value.ser(writer));
        self.cell.forward(&message)
    }

    fn debug_value(&self) -> Option<String> {
        self.cell.read().value.debug_value()
    }
}
