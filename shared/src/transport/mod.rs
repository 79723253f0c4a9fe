mod error;
mod local_relay;

pub use error::RelayError;
pub use local_relay::{ClientId, Envelope, LocalRelay, RelayLink};

use crate::properties::HandlerId;

/// Carries property messages from a handler to every participant, the
/// sender included. Delivery must be reliable and ordered.
pub trait Transport: Send + Sync {
    /// Returns false if the message could not be accepted for delivery
    fn forward(&self, handler_id: HandlerId, payload: &[u8]) -> bool;
}
