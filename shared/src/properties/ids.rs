/// Identifies a property within its handler
pub type PropertyId = u16;

/// Identifies a handler; transport messages are tagged with it
pub type HandlerId = u32;

// Ids below `ID_USER` belong to players and games

pub const ID_GROUP: PropertyId = 1;
pub const ID_NAME: PropertyId = 2;
pub const ID_ASYNC_INPUT: PropertyId = 3;
pub const ID_TURN: PropertyId = 4;
pub const ID_USER_ID: PropertyId = 5;
pub const ID_GAME_STATUS: PropertyId = 6;
pub const ID_MAX_PLAYER: PropertyId = 7;
pub const ID_MIN_PLAYER: PropertyId = 8;

/// Marks a command message on the wire. Never a real property.
pub const ID_COMMAND: PropertyId = 9;

/// First id available to user properties
pub const ID_USER: PropertyId = 256;

/// First id handed out by `PropertyHandler::unique_property_id`
pub const ID_AUTOMATIC: PropertyId = 0x7000;

/// Trailing value of a bulk property stream
pub const LOAD_SENTINEL: i16 = 6239;
