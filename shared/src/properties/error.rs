use thiserror::Error;

use kgame_serde::SerdeErr;

use super::ids::{HandlerId, PropertyId};

/// Errors that can occur while a handler registers or routes properties
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// A property with this id is already registered
    #[error("Cannot add property {property_id} to handler {handler_id}: id already registered")]
    DuplicateProperty {
        handler_id: HandlerId,
        property_id: PropertyId,
    },

    /// The id is reserved for command messages
    #[error("Property id {property_id} is reserved for command messages")]
    ReservedId { property_id: PropertyId },

    /// Every id from `ID_AUTOMATIC` upwards is registered
    #[error("Handler {handler_id} has no automatic property id left")]
    AutomaticIdsExhausted { handler_id: HandlerId },

    /// A message addressed a property that is not registered
    #[error("Property {property_id} not found on handler {handler_id}")]
    UnknownProperty {
        handler_id: HandlerId,
        property_id: PropertyId,
    },

    /// A message could not be decoded
    #[error("Malformed property message for handler {handler_id}: {cause}")]
    Decode {
        handler_id: HandlerId,
        #[source]
        cause: SerdeErr,
    },

    /// The handler has no transport, or the transport refused the message
    #[error("Handler {handler_id} could not forward a property message")]
    TransportUnavailable { handler_id: HandlerId },

    /// A list property rejected a command
    #[error("Property {property_id} rejected command: {cause}")]
    Command {
        property_id: PropertyId,
        #[source]
        cause: ListCommandError,
    },

    /// A bulk stream did not end with the expected sentinel
    #[error("Handler {handler_id} loading error, probably format error: sentinel {found}, expected {expected}")]
    LoadSentinelMismatch {
        handler_id: HandlerId,
        found: i16,
        expected: i16,
    },

    /// A bulk stream stopped at a record that could not be applied
    #[error("Handler {handler_id} loaded {loaded} of {expected} properties before: {cause}")]
    LoadIncomplete {
        handler_id: HandlerId,
        loaded: u64,
        expected: u64,
        #[source]
        cause: Box<HandlerError>,
    },
}

/// Errors that can occur while a list property decodes or applies a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListCommandError {
    #[error("Unknown list command {code}")]
    UnknownCommand { code: u8 },

    #[error("List index {index} out of range for length {len}")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("Malformed list command operands: {0}")]
    Decode(#[from] SerdeErr),
}

/// Errors returned by the `try_*` mutation methods of properties
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// Mutations of a read-only property are ignored
    #[error("Property {property_id} is read-only")]
    ReadOnly { property_id: PropertyId },

    /// The property's handler was dropped, or the property was removed from it
    #[error("Property {property_id} is not registered with a handler")]
    Detached { property_id: PropertyId },

    /// The handler has no transport, or the transport refused the message
    #[error("Handler {handler_id} could not forward property {property_id}")]
    TransportUnavailable {
        handler_id: HandlerId,
        property_id: PropertyId,
    },

    /// A list mutation addressed an index outside the local sequence
    #[error("Property {property_id}: index {index} out of range for length {len}")]
    IndexOutOfRange {
        property_id: PropertyId,
        index: usize,
        len: usize,
    },

    /// Applying a list command locally failed
    #[error("Property {property_id} could not apply command: {cause}")]
    Command {
        property_id: PropertyId,
        #[source]
        cause: ListCommandError,
    },
}
