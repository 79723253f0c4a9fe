use std::sync::Arc;

use log::debug;

use kgame_serde::{BitReader, BitWrite, Serde, SerdeErr};

use super::{
    config::PropertyConfig,
    error::{HandlerError, PropertyError},
    handler::{HandlerLink, PropertyHandler},
    ids::PropertyId,
    message::PropertyHeader,
    policy::PropertyPolicy,
    slot::{PropertyCell, PropertyFlags, PropertySlot},
    value::PropertyValue,
};

pub type PropertyInt = Property<i32>;
pub type PropertyUInt = Property<u32>;
pub type PropertyString = Property<String>;
pub type PropertyBool = Property<bool>;

/// A typed value kept consistent across participants.
///
/// The property is owned by whoever created it; its handler only indexes it.
/// Dropping the property removes it from the handler.
pub struct Property<T: PropertyValue> {
    cell: Arc<PropertyCell<T>>,
}

impl<T: PropertyValue> Property<T> {
    /// Create a Property and register it with `handler`, using the handler's
    /// default policy
    pub fn new(id: PropertyId, handler: &PropertyHandler, value: T) -> Result<Self, HandlerError> {
        Self::with_config(id, handler, value, PropertyConfig::default())
    }

    /// Create a Property with an id handed out by the handler
    pub fn new_automatic(handler: &PropertyHandler, value: T) -> Result<Self, HandlerError> {
        let id = handler
            .unique_property_id()
            .ok_or_else(|| HandlerError::AutomaticIdsExhausted {
                handler_id: handler.id(),
            })?;
        Self::new(id, handler, value)
    }

    pub fn with_config(
        id: PropertyId,
        handler: &PropertyHandler,
        value: T,
        config: PropertyConfig,
    ) -> Result<Self, HandlerError> {
        let flags = PropertyFlags {
            policy: config.policy.unwrap_or_else(|| handler.policy()),
            read_only: config.read_only,
            emits_signal: config.emits_signal,
            optimized: config.optimized,
            dirty: false,
        };
        let cell = Arc::new(PropertyCell::new(id, value, flags));
        let slot: Arc<dyn PropertySlot> = cell.clone();
        handler.register(&slot, config.name)?;
        Ok(Self { cell })
    }

    pub fn id(&self) -> PropertyId {
        self.cell.id()
    }

    pub fn value(&self) -> T {
        self.cell.read().value.clone()
    }

    /// Runs `f` against the stored value without cloning it
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.read().value)
    }

    // Assignment

    /// Assign according to the property's policy. Clean only transmits, Dirty
    /// stores and transmits, Local only stores.
    ///
    /// Returns false if the property is read-only or the value could not be
    /// forwarded. A Dirty property keeps its local store in the latter case.
    pub fn set_value(&self, value: T) -> bool {
        self.try_set_value(value).is_ok()
    }

    pub fn try_set_value(&self, value: T) -> Result<(), PropertyError> {
        match self.policy() {
            PropertyPolicy::Clean => self.try_send(&value),
            PropertyPolicy::Dirty => self.try_change_value(value),
            PropertyPolicy::Local => self.try_set_local(value),
        }
    }

    /// Forwards `value` without touching the stored value
    pub fn send(&self, value: &T) -> bool {
        self.try_send(value).is_ok()
    }

    pub fn try_send(&self, value: &T) -> Result<(), PropertyError> {
        let message = {
            let state = self.cell.read();
            if state.flags.read_only {
                return Err(PropertyError::ReadOnly {
                    property_id: self.id(),
                });
            }
            if state.flags.optimized && state.value == *value {
                return Ok(());
            }
            encode_value(self.id(), value)
        };
        self.cell.forward(&message)
    }

    /// Stores `value` immediately and marks the property dirty
    pub fn set_local(&self, value: T) -> bool {
        self.try_set_local(value).is_ok()
    }

    pub fn try_set_local(&self, value: T) -> Result<(), PropertyError> {
        {
            let mut state = self.cell.write();
            if state.flags.read_only {
                return Err(PropertyError::ReadOnly {
                    property_id: self.id(),
                });
            }
            if state.flags.optimized && state.value == value {
                return Ok(());
            }
            state.value = value;
            state.flags.dirty = true;
        }
        self.cell.notify();
        Ok(())
    }

    /// Forwards and stores, whatever the policy
    pub fn change_value(&self, value: T) -> bool {
        self.try_change_value(value).is_ok()
    }

    pub fn try_change_value(&self, value: T) -> Result<(), PropertyError> {
        let sent = self.try_send(&value);
        if let Err(err @ PropertyError::ReadOnly { .. }) = sent {
            return Err(err);
        }
        self.try_set_local(value)?;
        sent
    }

    /// Forwards the stored value
    pub fn send_current(&self) -> bool {
        PropertySlot::send_current(self.cell.as_ref()).is_ok()
    }

    // Serialization / deserialization

    /// Replaces the stored value with one read from `reader`, clears the dirty
    /// flag and notifies listeners
    pub fn load(&self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        PropertySlot::load(self.cell.as_ref(), reader)
    }

    pub fn save(&self, writer: &mut dyn BitWrite) {
        PropertySlot::save(self.cell.as_ref(), writer)
    }

    // Flags

    pub fn flags(&self) -> PropertyFlags {
        self.cell.flags()
    }

    pub fn policy(&self) -> PropertyPolicy {
        self.cell.flags().policy
    }

    pub fn set_policy(&self, policy: PropertyPolicy) {
        self.cell.update_flags(|flags| flags.policy = policy);
    }

    pub fn is_read_only(&self) -> bool {
        self.cell.flags().read_only
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.cell.update_flags(|flags| flags.read_only = read_only);
    }

    pub fn is_emitting_signal(&self) -> bool {
        self.cell.flags().emits_signal
    }

    pub fn set_emitting_signal(&self, emits_signal: bool) {
        self.cell.update_flags(|flags| flags.emits_signal = emits_signal);
    }

    pub fn is_optimized(&self) -> bool {
        self.cell.flags().optimized
    }

    pub fn set_optimized(&self, optimized: bool) {
        self.cell.update_flags(|flags| flags.optimized = optimized);
    }

    pub fn is_dirty(&self) -> bool {
        self.cell.flags().dirty
    }

    /// Whether the property is still indexed by a live handler
    pub fn is_registered(&self) -> bool {
        self.cell.link().is_some_and(|link| link.is_alive())
    }
}

impl<T: PropertyValue> Drop for Property<T> {
    fn drop(&mut self) {
        if let Some(link) = self.cell.take_link() {
            link.forget(self.id());
        }
    }
}

impl<T: PropertyValue + std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.cell.read();
        f.debug_struct("Property")
            .field("id", &self.id())
            .field("value", &state.value)
            .field("flags", &state.flags)
            .finish()
    }
}

fn encode_value<T: Serde>(property_id: PropertyId, value: &T) -> Vec<u8> {
    PropertyHeader::Value { property_id }.encode(|writer| value.ser(writer))
}

impl<T: PropertyValue> PropertySlot for PropertyCell<T> {
    fn id(&self) -> PropertyId {
        PropertyCell::id(self)
    }

    fn flags(&self) -> PropertyFlags {
        PropertyCell::flags(self)
    }

    fn set_policy(&self, policy: PropertyPolicy) {
        self.update_flags(|flags| flags.policy = policy);
    }

    fn set_read_only(&self, read_only: bool) {
        self.update_flags(|flags| flags.read_only = read_only);
    }

    fn attach(&self, link: HandlerLink) {
        PropertyCell::attach(self, link);
    }

    fn detach(&self) {
        self.take_link();
    }

    fn load(&self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        let value = T::de(reader)?;
        {
            let mut state = self.write();
            state.value = value;
            state.flags.dirty = false;
        }
        debug!("Property {} loaded", PropertyCell::id(self));
        self.notify();
        Ok(())
    }

    fn save(&self, writer: &mut dyn BitWrite) {
        self.read().value.ser(writer);
    }

    fn send_current(&self) -> Result<(), PropertyError> {
        let message = encode_value(PropertyCell::id(self), &self.read().value);
        self.forward(&message)
    }

    fn debug_value(&self) -> Option<String> {
        self.read().value.debug_value()
    }
}
