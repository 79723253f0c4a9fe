use thiserror::Error;

use super::local_relay::ClientId;

/// Errors that can occur while relaying property messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The link was disconnected from its relay
    #[error("Relay client {client_id} is disconnected, message of {len} bytes dropped")]
    Disconnected { client_id: ClientId, len: usize },
}
