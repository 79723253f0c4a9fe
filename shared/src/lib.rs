//! # KGame Shared
//! Replicated game properties: typed values and lists kept consistent across
//! every participant of a game through a central relay. Also carries the
//! sprite render cache and the difficulty level manager games build on.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use kgame_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, Serde, SerdeErr, SerdeInteger,
    SignedVariableInteger, UnsignedVariableInteger,
};

mod difficulty;
mod player;
mod properties;
mod render;
mod settings;
mod transport;

pub use difficulty::{
    Difficulty, DifficultyError, DifficultyEvent, DifficultyLevel, StandardLevel,
};
pub use player::{Player, PlayerError};
pub use properties::{
    EmitMode, HandlerConfig, HandlerError, HandlerId, ListCommand, ListCommandError, ListenerKey,
    Property, PropertyBool, PropertyConfig, PropertyError, PropertyFlags, PropertyHandler,
    PropertyHeader, PropertyId, PropertyInt, PropertyList, PropertyPolicy, PropertyString,
    PropertyUInt, PropertyValue, CMD_APPEND, CMD_CLEAR, CMD_INSERT, CMD_REMOVE, ID_ASYNC_INPUT,
    ID_AUTOMATIC, ID_COMMAND, ID_GAME_STATUS, ID_GROUP, ID_MAX_PLAYER, ID_MIN_PLAYER, ID_NAME,
    ID_TURN, ID_USER, ID_USER_ID, LOAD_SENTINEL,
};
pub use render::{
    Delivery, ImageStore, MemoryImageStore, RenderCache, RenderConfig, RenderError, RenderStatus,
    Renderer, Size, SpriteId,
};
pub use settings::{MemorySettings, SettingsStore};
pub use transport::{ClientId, Envelope, LocalRelay, RelayError, RelayLink, Transport};
