mod config;
mod error;
mod handler;
mod ids;
mod list_command;
mod message;
mod policy;
mod property;
mod property_list;
mod signal_queue;
mod slot;
mod value;

pub use config::{HandlerConfig, PropertyConfig};
pub use error::{HandlerError, ListCommandError, PropertyError};
pub use handler::PropertyHandler;
pub use ids::*;
pub use list_command::{ListCommand, CMD_APPEND, CMD_CLEAR, CMD_INSERT, CMD_REMOVE};
pub use message::PropertyHeader;
pub use policy::PropertyPolicy;
pub use property::{Property, PropertyBool, PropertyInt, PropertyString, PropertyUInt};
pub use property_list::PropertyList;
pub use signal_queue::{EmitMode, ListenerKey};
pub use slot::PropertyFlags;
pub use value::PropertyValue;
