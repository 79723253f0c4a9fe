use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use log::{debug, error, info, warn};

use kgame_serde::{BitReader, BitWrite, Serde, UnsignedVariableInteger};

use crate::transport::Transport;

use super::{
    config::HandlerConfig,
    error::{HandlerError, PropertyError},
    ids::{HandlerId, PropertyId, ID_AUTOMATIC, ID_COMMAND, ID_USER, LOAD_SENTINEL},
    message::PropertyHeader,
    policy::PropertyPolicy,
    signal_queue::{call_listener, EmitMode, ListenerKey, Listeners, SignalQueue},
    slot::{PropertyFlags, PropertySlot},
};

type Count = UnsignedVariableInteger<7>;

/// Owner-scoped registry of properties.
///
/// Routes delivered messages to the property they address, forwards
/// outgoing messages to the transport tagged with the handler id, and
/// delivers change notifications to listeners. The handler does not own its
/// properties: dropping a property unregisters it, dropping the handler
/// detaches every property still registered.
pub struct PropertyHandler {
    inner: Arc<HandlerInner>,
}

pub(crate) struct HandlerInner {
    state: RwLock<HandlerState>,
    signals: Mutex<SignalQueue>,
    listeners: Mutex<Listeners>,
}

struct HandlerState {
    id: HandlerId,
    slots: BTreeMap<PropertyId, Weak<dyn PropertySlot>>,
    names: BTreeMap<PropertyId, String>,
    default_policy: PropertyPolicy,
    default_userspace: bool,
    next_unique_id: PropertyId,
    transport: Option<Arc<dyn Transport>>,
}

impl HandlerState {
    fn slot(&self, property_id: PropertyId) -> Option<Arc<dyn PropertySlot>> {
        self.slots.get(&property_id).and_then(Weak::upgrade)
    }

    fn live_slots(&self) -> Vec<Arc<dyn PropertySlot>> {
        self.slots.values().filter_map(Weak::upgrade).collect()
    }
}

impl PropertyHandler {
    pub fn new(id: HandlerId) -> Self {
        Self::with_config(id, HandlerConfig::default())
    }

    pub fn with_config(id: HandlerId, config: HandlerConfig) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                state: RwLock::new(HandlerState {
                    id,
                    slots: BTreeMap::new(),
                    names: BTreeMap::new(),
                    default_policy: config.default_policy,
                    default_userspace: config.default_userspace,
                    next_unique_id: ID_AUTOMATIC,
                    transport: None,
                }),
                signals: Mutex::new(SignalQueue::default()),
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.inner.read().id
    }

    pub fn set_id(&self, id: HandlerId) {
        self.inner.write().id = id;
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        self.inner.write().transport = Some(transport);
    }

    pub fn clear_transport(&self) {
        self.inner.write().transport = None;
    }

    pub fn has_transport(&self) -> bool {
        self.inner.read().transport.is_some()
    }

    // Registry

    pub(crate) fn register(
        &self,
        slot: &Arc<dyn PropertySlot>,
        name: Option<String>,
    ) -> Result<(), HandlerError> {
        let property_id = slot.id();
        if property_id == ID_COMMAND {
            error!("Cannot add property {}: id reserved for commands", property_id);
            return Err(HandlerError::ReservedId { property_id });
        }
        {
            let mut state = self.inner.write();
            if state.slot(property_id).is_some() {
                error!(
                    "Cannot add property {} to handler {}: id already registered",
                    property_id, state.id
                );
                return Err(HandlerError::DuplicateProperty {
                    handler_id: state.id,
                    property_id,
                });
            }
            state.slots.insert(property_id, Arc::downgrade(slot));
            match name {
                Some(name) => {
                    state.names.insert(property_id, name);
                }
                None => {
                    state.names.remove(&property_id);
                }
            }
        }
        slot.attach(HandlerLink {
            inner: Arc::downgrade(&self.inner),
        });
        Ok(())
    }

    /// Unregisters a property. It keeps its value but can no longer send.
    pub fn remove_property(&self, property_id: PropertyId) -> bool {
        let removed = {
            let mut state = self.inner.write();
            state.names.remove(&property_id);
            state.slots.remove(&property_id)
        };
        match removed.and_then(|slot| slot.upgrade()) {
            Some(slot) => {
                slot.detach();
                true
            }
            None => false,
        }
    }

    /// Unregisters every property
    pub fn clear(&self) {
        let slots = {
            let mut state = self.inner.write();
            state.names.clear();
            std::mem::take(&mut state.slots)
        };
        for slot in slots.values().filter_map(Weak::upgrade) {
            slot.detach();
        }
    }

    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.inner.read().slot(property_id).is_some()
    }

    /// Registered ids in ascending order
    pub fn property_ids(&self) -> Vec<PropertyId> {
        let state = self.inner.read();
        state
            .slots
            .iter()
            .filter(|(_, slot)| slot.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.property_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn property_flags(&self, property_id: PropertyId) -> Option<PropertyFlags> {
        let slot = self.inner.read().slot(property_id)?;
        Some(slot.flags())
    }

    /// Hands out ids from `ID_AUTOMATIC` upwards, skipping ids in use. After
    /// `u16::MAX` the search wraps around once. Returns `None` if every
    /// automatic id is taken.
    pub fn unique_property_id(&self) -> Option<PropertyId> {
        let mut state = self.inner.write();
        let candidates = u32::from(PropertyId::MAX - ID_AUTOMATIC) + 1;
        for _ in 0..candidates {
            let id = state.next_unique_id;
            state.next_unique_id = id.checked_add(1).unwrap_or(ID_AUTOMATIC);
            if state.slot(id).is_none() {
                return Some(id);
            }
        }
        warn!("Handler {} ran out of automatic property ids", state.id);
        None
    }

    // Inbound

    /// Applies a delivered message addressed to `target`. Returns false if it
    /// is addressed to another handler. Malformed messages, unknown ids and
    /// rejected commands are logged and dropped.
    pub fn process_message(&self, reader: &mut BitReader, target: HandlerId, is_sender: bool) -> bool {
        match self.try_process_message(reader, target, is_sender) {
            Ok(handled) => handled,
            Err(err) => {
                error!("{}", err);
                true
            }
        }
    }

    pub fn try_process_message(
        &self,
        reader: &mut BitReader,
        target: HandlerId,
        is_sender: bool,
    ) -> Result<bool, HandlerError> {
        let handler_id = self.id();
        if target != handler_id {
            return Ok(false);
        }

        let header =
            PropertyHeader::de(reader).map_err(|cause| HandlerError::Decode { handler_id, cause })?;
        let property_id = header.property_id();
        let Some(slot) = self.inner.read().slot(property_id) else {
            return Err(HandlerError::UnknownProperty {
                handler_id,
                property_id,
            });
        };

        // Dirty and Local senders already applied the change themselves
        if !slot.flags().policy.accepts_delivery(is_sender) {
            return Ok(true);
        }

        match header {
            PropertyHeader::Value { .. } => slot
                .load(reader)
                .map_err(|cause| HandlerError::Decode { handler_id, cause })?,
            PropertyHeader::Command { code, .. } => slot
                .command(reader, code, is_sender)
                .map_err(|cause| HandlerError::Command { property_id, cause })?,
        }
        Ok(true)
    }

    // Outbound

    /// Forwards a complete property message to the transport. Every property
    /// send goes through here.
    pub fn send_property(&self, message: &[u8]) -> bool {
        self.try_send_property(message).is_ok()
    }

    pub fn try_send_property(&self, message: &[u8]) -> Result<(), HandlerError> {
        self.inner
            .send_property(message)
            .map_err(|handler_id| HandlerError::TransportUnavailable { handler_id })
    }

    /// Forwards the current value of every dirty property
    pub fn flush(&self) {
        let slots = self.inner.read().live_slots();
        for slot in slots {
            if !slot.flags().dirty {
                continue;
            }
            if let Err(err) = slot.send_current() {
                warn!("Flush of property {} failed: {}", slot.id(), err);
            }
        }
    }

    // Bulk transfer

    /// Writes every registered property in ascending id order, followed by
    /// the load sentinel
    pub fn save(&self, writer: &mut dyn BitWrite) {
        let slots = self.inner.read().live_slots();
        debug!("Handler {} saving {} properties", self.id(), slots.len());

        Count::new(slots.len() as u64).ser(writer);
        for slot in &slots {
            PropertyHeader::Value {
                property_id: slot.id(),
            }
            .ser(writer);
            slot.save(writer);
        }
        LOAD_SENTINEL.ser(writer);
    }

    /// Reads a stream written by `save`. Notifications are held back until the
    /// whole stream is applied. State applied before an error stands.
    pub fn load(&self, reader: &mut BitReader) -> Result<(), HandlerError> {
        self.lock_direct_emit();
        let result = self.load_records(reader);
        self.unlock_direct_emit();
        result
    }

    fn load_records(&self, reader: &mut BitReader) -> Result<(), HandlerError> {
        let handler_id = self.id();
        let decode = |cause| HandlerError::Decode { handler_id, cause };

        let expected = Count::de(reader).map_err(decode)?.get();
        debug!("Handler {} loading {} properties", handler_id, expected);
        for loaded in 0..expected {
            // values carry no length, so nothing after a bad record can be read
            if let Err(cause) = self.try_process_message(reader, handler_id, false) {
                return Err(HandlerError::LoadIncomplete {
                    handler_id,
                    loaded,
                    expected,
                    cause: Box::new(cause),
                });
            }
        }

        let found = i16::de(reader).map_err(decode)?;
        if found != LOAD_SENTINEL {
            warn!(
                "Handler {} loading error, probably format error: sentinel {}",
                handler_id, found
            );
            return Err(HandlerError::LoadSentinelMismatch {
                handler_id,
                found,
                expected: LOAD_SENTINEL,
            });
        }
        info!("Handler {} loaded properly", handler_id);
        Ok(())
    }

    // Handler-wide settings

    pub fn policy(&self) -> PropertyPolicy {
        self.inner.read().default_policy
    }

    pub fn is_userspace_default(&self) -> bool {
        self.inner.read().default_userspace
    }

    /// Sets the default policy and applies it to registered properties. With
    /// `userspace` set, ids below `ID_USER` keep their policy.
    pub fn set_policy(&self, policy: PropertyPolicy, userspace: bool) {
        let slots = {
            let mut state = self.inner.write();
            state.default_policy = policy;
            state.default_userspace = userspace;
            state.live_slots()
        };
        for slot in slots {
            if !userspace || slot.id() >= ID_USER {
                slot.set_policy(policy);
            }
        }
    }

    /// Makes every registered property read-only
    pub fn lock_properties(&self) {
        self.set_all_read_only(true);
    }

    pub fn unlock_properties(&self) {
        self.set_all_read_only(false);
    }

    fn set_all_read_only(&self, read_only: bool) {
        let slots = self.inner.read().live_slots();
        for slot in slots {
            slot.set_read_only(read_only);
        }
    }

    // Notifications

    /// Registers a listener called with the id of every property that changes
    /// and emits signals
    pub fn on_property_changed(
        &self,
        listener: impl FnMut(PropertyId) + Send + 'static,
    ) -> ListenerKey {
        self.inner.listeners().insert(listener)
    }

    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        self.inner.listeners().remove(key)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    /// Holds back notifications until a matching `unlock_direct_emit`. Locks
    /// nest.
    pub fn lock_direct_emit(&self) {
        self.inner.signals().lock();
    }

    /// Releases one emit lock. Releasing the last one delivers the held back
    /// notifications in the order they were raised.
    pub fn unlock_direct_emit(&self) {
        let dispatch = {
            let mut signals = self.inner.signals();
            if !signals.is_locked() {
                warn!("Handler {}: unbalanced unlock_direct_emit", self.id());
                return;
            }
            signals.unlock()
        };
        if dispatch {
            self.inner.dispatch();
        }
    }

    pub fn emit_mode(&self) -> EmitMode {
        self.inner.signals().mode()
    }

    // Diagnostics

    pub fn property_name(&self, property_id: PropertyId) -> String {
        let state = self.inner.read();
        if state.slot(property_id).is_none() {
            return format!("{} unregistered", property_id);
        }
        match state.names.get(&property_id) {
            Some(name) => format!("{} ({})", name, property_id),
            None => format!("Unnamed - ID: {}", property_id),
        }
    }

    /// Human readable value, or `None` if no such property is registered
    pub fn property_value(&self, property_id: PropertyId) -> Option<String> {
        let slot = self.inner.read().slot(property_id)?;
        Some(slot.debug_value().unwrap_or_else(|| "Unknown".to_string()))
    }

    /// Dumps every registered property's flags at debug level
    pub fn log_state(&self) {
        let (handler_id, slots) = {
            let state = self.inner.read();
            (state.id, state.live_slots())
        };
        debug!("-----------------------------------------------------------");
        debug!("PropertyHandler {}", handler_id);
        debug!("  Registered properties: (Policy, Lock, Emit, Optimized, Dirty)");
        for slot in slots {
            let flags = slot.flags();
            debug!(
                "  {}: ({}, {}, {}, {}, {}) = {}",
                self.property_name(slot.id()),
                flags.policy.name(),
                flags.read_only,
                flags.emits_signal,
                flags.optimized,
                flags.dirty,
                slot.debug_value().unwrap_or_else(|| "Unknown".to_string())
            );
        }
        debug!(
            "  Queued notifications: {}",
            self.inner.signals().queued_len()
        );
        debug!("-----------------------------------------------------------");
    }
}

impl Drop for PropertyHandler {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PropertyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("PropertyHandler")
            .field("id", &state.id)
            .field("properties", &state.slots.keys().collect::<Vec<_>>())
            .field("default_policy", &state.default_policy)
            .finish()
    }
}

impl HandlerInner {
    fn read(&self) -> RwLockReadGuard<'_, HandlerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandlerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn signals(&self) -> MutexGuard<'_, SignalQueue> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails with the handler id if there is no transport or it refused the
    /// message
    fn send_property(&self, message: &[u8]) -> Result<(), HandlerId> {
        let (handler_id, transport) = {
            let state = self.read();
            (state.id, state.transport.clone())
        };
        let Some(transport) = transport else {
            error!("Handler {} has no transport", handler_id);
            return Err(handler_id);
        };
        if transport.forward(handler_id, message) {
            Ok(())
        } else {
            Err(handler_id)
        }
    }

    fn emit(&self, property_id: PropertyId) {
        let dispatch = self.signals().enqueue(property_id);
        if dispatch {
            self.dispatch();
        }
    }

    fn dispatch(&self) {
        let _guard = DispatchGuard { inner: self };
        loop {
            let next = self.signals().next_pending();
            let Some(property_id) = next else {
                return;
            };
            let listeners = self.listeners().snapshot();
            for listener in &listeners {
                call_listener(listener, property_id);
            }
        }
    }
}

/// Releases the dispatch if a listener panics, so later notifications are
/// still delivered
struct DispatchGuard<'a> {
    inner: &'a HandlerInner,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!("Listener panicked, aborting notification dispatch");
            self.inner.signals().abort_dispatch();
        }
    }
}

/// A property's way back to the handler it is registered with
#[derive(Clone)]
pub(crate) struct HandlerLink {
    inner: Weak<HandlerInner>,
}

impl HandlerLink {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn forward(&self, property_id: PropertyId, message: &[u8]) -> Result<(), PropertyError> {
        let Some(inner) = self.inner.upgrade() else {
            return Err(PropertyError::Detached { property_id });
        };
        inner
            .send_property(message)
            .map_err(|handler_id| PropertyError::TransportUnavailable {
                handler_id,
                property_id,
            })
    }

    pub fn emit(&self, property_id: PropertyId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.emit(property_id);
        }
    }

    /// Drops the registry entry of a property that is going away
    pub fn forget(&self, property_id: PropertyId) {
        if let Some(inner) = self.inner.upgrade() {
            let mut state = inner.write();
            state.slots.remove(&property_id);
            state.names.remove(&property_id);
        }
    }
}
