use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kgame_serde::{BitReader, BitWrite, SerdeErr};

use super::{
    error::{ListCommandError, PropertyError},
    handler::HandlerLink,
    ids::PropertyId,
    policy::PropertyPolicy,
};

/// Per-property settings and state, as shown by `PropertyHandler::log_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    pub policy: PropertyPolicy,
    pub read_only: bool,
    pub emits_signal: bool,
    pub optimized: bool,
    /// Set by a local store, cleared when the transport delivers a value
    pub dirty: bool,
}

/// What a handler needs from a registered property, whatever its value type
pub(crate) trait PropertySlot: Send + Sync {
    fn id(&self) -> PropertyId;

    fn flags(&self) -> PropertyFlags;

    fn set_policy(&self, policy: PropertyPolicy);

    fn set_read_only(&self, read_only: bool);

    fn attach(&self, link: HandlerLink);

    fn detach(&self);

    /// Replaces the stored value with one read from a delivered message
    fn load(&self, reader: &mut BitReader) -> Result<(), SerdeErr>;

    /// Writes the stored value, as `load` expects to read it
    fn save(&self, writer: &mut dyn BitWrite);

    /// Applies a delivered command. Plain values accept none.
    fn command(
        &self,
        _reader: &mut BitReader,
        code: u8,
        _is_sender: bool,
    ) -> Result<(), ListCommandError> {
        Err(ListCommandError::UnknownCommand { code })
    }

    /// Forwards the stored value as a value update
    fn send_current(&self) -> Result<(), PropertyError>;

    fn debug_value(&self) -> Option<String>;
}

pub(crate) struct PropertyState<V> {
    pub flags: PropertyFlags,
    pub value: V,
    pub link: Option<HandlerLink>,
}

/// Storage shared between a property handle and its handler's registry
pub(crate) struct PropertyCell<V> {
    id: PropertyId,
    state: RwLock<PropertyState<V>>,
}

impl<V> PropertyCell<V> {
    pub fn new(id: PropertyId, value: V, flags: PropertyFlags) -> Self {
        Self {
            id,
            state: RwLock::new(PropertyState {
                flags,
                value,
                link: None,
            }),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PropertyState<V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PropertyState<V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn flags(&self) -> PropertyFlags {
        self.read().flags
    }

    pub fn update_flags(&self, update: impl FnOnce(&mut PropertyFlags)) {
        update(&mut self.write().flags);
    }

    pub fn link(&self) -> Option<HandlerLink> {
        self.read().link.clone()
    }

    pub fn attach(&self, link: HandlerLink) {
        self.write().link = Some(link);
    }

    pub fn take_link(&self) -> Option<HandlerLink> {
        self.write().link.take()
    }

    /// Hands a complete message to the handler. No lock is held while the
    /// transport runs.
    pub fn forward(&self, message: &[u8]) -> Result<(), PropertyError> {
        let Some(link) = self.link() else {
            return Err(PropertyError::Detached {
                property_id: self.id,
            });
        };
        link.forward(self.id, message)
    }

    /// Raises a change notification if the property emits signals. Listeners
    /// run after the state lock is released.
    pub fn notify(&self) {
        let link = {
            let state = self.read();
            if !state.flags.emits_signal {
                return;
            }
            state.link.clone()
        };
        if let Some(link) = link {
            link.emit(self.id);
        }
    }
}
