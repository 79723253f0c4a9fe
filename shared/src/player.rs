use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use kgame_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    properties::{
        HandlerConfig, HandlerError, HandlerId, PropertyBool, PropertyConfig, PropertyHandler,
        PropertyInt, PropertyPolicy, PropertyString, ID_ASYNC_INPUT, ID_GROUP, ID_NAME, ID_TURN,
        ID_USER_ID,
    },
    transport::Transport,
};

/// Errors that can occur while restoring a player
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("Stream holds player {found}, cannot load it into player {expected}")]
    IdMismatch {
        expected: HandlerId,
        found: HandlerId,
    },

    #[error("Malformed player stream: {0}")]
    Decode(#[from] SerdeErr),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// A participant in a game.
///
/// Owns a property handler whose id is the player id. Player properties are
/// Clean, so every participant sees the same name, group and turn state.
pub struct Player {
    // fields drop in order, the properties before their handler
    name: PropertyString,
    group: PropertyString,
    async_input: PropertyBool,
    my_turn: PropertyBool,
    user_id: PropertyInt,
    handler: PropertyHandler,
    active: bool,
    is_virtual: bool,
}

impl Player {
    pub fn new(id: HandlerId) -> Result<Self, HandlerError> {
        let handler = PropertyHandler::with_config(
            id,
            HandlerConfig {
                default_policy: PropertyPolicy::Clean,
                ..HandlerConfig::default()
            },
        );
        let named = |name: &str| PropertyConfig::default().named(name);

        Ok(Self {
            name: PropertyString::with_config(ID_NAME, &handler, String::new(), named("Name"))?,
            group: PropertyString::with_config(ID_GROUP, &handler, String::new(), named("Group"))?,
            async_input: PropertyBool::with_config(
                ID_ASYNC_INPUT,
                &handler,
                false,
                named("AsyncInput"),
            )?,
            my_turn: PropertyBool::with_config(ID_TURN, &handler, false, named("myTurn"))?,
            user_id: PropertyInt::with_config(ID_USER_ID, &handler, 0, named("UserId"))?,
            handler,
            active: true,
            is_virtual: false,
        })
    }

    pub fn id(&self) -> HandlerId {
        self.handler.id()
    }

    /// The handler holding this player's properties. Game specific properties
    /// are registered here too, with ids from `ID_USER` upwards.
    pub fn data_handler(&self) -> &PropertyHandler {
        &self.handler
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        self.handler.set_transport(transport);
    }

    // Properties

    pub fn name(&self) -> String {
        self.name.value()
    }

    pub fn set_name(&self, name: impl Into<String>) -> bool {
        self.name.set_value(name.into())
    }

    pub fn group(&self) -> String {
        self.group.value()
    }

    pub fn set_group(&self, group: impl Into<String>) -> bool {
        self.group.set_value(group.into())
    }

    pub fn async_input(&self) -> bool {
        self.async_input.value()
    }

    pub fn set_async_input(&self, async_input: bool) -> bool {
        self.async_input.set_value(async_input)
    }

    pub fn my_turn(&self) -> bool {
        self.my_turn.value()
    }

    pub fn set_turn(&self, my_turn: bool) -> bool {
        debug!("Player {} turn: {}", self.id(), my_turn);
        self.my_turn.set_value(my_turn)
    }

    pub fn user_id(&self) -> i32 {
        self.user_id.value()
    }

    pub fn set_user_id(&self, user_id: i32) -> bool {
        self.user_id.set_value(user_id)
    }

    // Local state, never transmitted

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the player is a stand-in for one on another participant
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn set_virtual(&mut self, is_virtual: bool) {
        self.is_virtual = is_virtual;
    }

    // Messages

    /// Applies a delivered property message. Returns false if it is meant
    /// for another player.
    pub fn network_transmission(&self, payload: &[u8], is_sender: bool) -> bool {
        let mut reader = BitReader::new(payload);
        self.handler
            .process_message(&mut reader, self.id(), is_sender)
    }

    /// Writes the player id followed by all of its properties
    pub fn save(&self, writer: &mut dyn BitWrite) {
        self.id().ser(writer);
        self.handler.save(writer);
    }

    /// Restores a player written by `save`. A stream for a different player
    /// is refused before anything is applied.
    pub fn load(&self, reader: &mut BitReader) -> Result<(), PlayerError> {
        let expected = self.id();
        let found = HandlerId::de(reader)?;
        if found != expected {
            warn!("Refusing to load player {} into player {}", found, expected);
            return Err(PlayerError::IdMismatch { expected, found });
        }
        self.handler.load(reader)?;
        Ok(())
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("group", &self.group())
            .field("my_turn", &self.my_turn())
            .field("active", &self.active)
            .field("virtual", &self.is_virtual)
            .finish()
    }
}
