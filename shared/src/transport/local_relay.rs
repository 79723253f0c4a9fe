//! In-process relay for running several participants inside one process.
//! Every message a participant forwards is queued for every connected
//! participant, the sender included, in the order the relay received it.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{trace, warn};

use crate::properties::HandlerId;

use super::{error::RelayError, Transport};

pub type ClientId = u32;

/// A message as delivered by the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: ClientId,
    pub handler_id: HandlerId,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Whether `client` forwarded this message, i.e. the `is_sender` flag
    /// to process it with
    pub fn is_from(&self, client: ClientId) -> bool {
        self.sender == client
    }
}

#[derive(Default)]
struct RelayState {
    next_client: ClientId,
    queues: BTreeMap<ClientId, VecDeque<Envelope>>,
}

/// Central relay shared by all participants
#[derive(Clone, Default)]
pub struct LocalRelay {
    state: Arc<Mutex<RelayState>>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a new participant
    pub fn connect(&self) -> RelayLink {
        let mut state = self.lock();
        let client_id = state.next_client;
        state.next_client += 1;
        state.queues.insert(client_id, VecDeque::new());
        trace!("Relay client {} connected", client_id);
        RelayLink {
            relay: self.clone(),
            client_id,
        }
    }

    pub fn client_count(&self) -> usize {
        self.lock().queues.len()
    }

    /// Messages still queued across all participants
    pub fn pending(&self) -> usize {
        self.lock().queues.values().map(VecDeque::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn broadcast(&self, envelope: Envelope) -> Result<(), RelayError> {
        let mut state = self.lock();
        if !state.queues.contains_key(&envelope.sender) {
            return Err(RelayError::Disconnected {
                client_id: envelope.sender,
                len: envelope.payload.len(),
            });
        }
        for queue in state.queues.values_mut() {
            queue.push_back(envelope.clone());
        }
        Ok(())
    }
}

/// One participant's connection to a `LocalRelay`
pub struct RelayLink {
    relay: LocalRelay,
    client_id: ClientId,
}

impl RelayLink {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.relay.lock().queues.contains_key(&self.client_id)
    }

    pub fn try_forward(&self, handler_id: HandlerId, payload: &[u8]) -> Result<(), RelayError> {
        self.relay.broadcast(Envelope {
            sender: self.client_id,
            handler_id,
            payload: payload.to_vec(),
        })
    }

    /// Next message for this participant, in relay order
    pub fn receive(&self) -> Option<Envelope> {
        self.relay
            .lock()
            .queues
            .get_mut(&self.client_id)
            .and_then(VecDeque::pop_front)
    }

    /// Takes every queued message at once
    pub fn drain(&self) -> Vec<Envelope> {
        self.relay
            .lock()
            .queues
            .get_mut(&self.client_id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Leaves the relay. Queued messages are discarded and later forwards
    /// fail.
    pub fn disconnect(&self) {
        if self.relay.lock().queues.remove(&self.client_id).is_some() {
            trace!("Relay client {} disconnected", self.client_id);
        }
    }
}

impl Transport for RelayLink {
    fn forward(&self, handler_id: HandlerId, payload: &[u8]) -> bool {
        match self.try_forward(handler_id, payload) {
            Ok(()) => true,
            Err(err) => {
                warn!("{}", err);
                false
            }
        }
    }
}

impl Drop for RelayLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::{RelayError, Transport};

    use super::LocalRelay;

    #[test]
    fn every_client_receives_in_order() {
        let relay = LocalRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();

        assert!(alice.forward(1, &[1]));
        assert!(bob.forward(1, &[2]));
        assert!(alice.forward(2, &[3]));

        for link in [&alice, &bob] {
            let payloads: Vec<_> = link.drain().into_iter().map(|e| e.payload).collect();
            assert_eq!(payloads, vec![vec![1], vec![2], vec![3]]);
        }
        assert_eq!(relay.pending(), 0);
    }

    #[test]
    fn sender_flag() {
        let relay = LocalRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();

        alice.forward(5, &[0xAB]);

        let own = alice.receive().unwrap();
        assert!(own.is_from(alice.client_id()));
        assert_eq!(own.handler_id, 5);

        let other = bob.receive().unwrap();
        assert!(!other.is_from(bob.client_id()));
        assert!(bob.receive().is_none());
    }

    #[test]
    fn disconnected_link_refuses() {
        let relay = LocalRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();

        alice.disconnect();
        assert!(!alice.is_connected());
        assert!(!alice.forward(1, &[1, 2]));
        assert_eq!(
            alice.try_forward(1, &[1, 2]),
            Err(RelayError::Disconnected {
                client_id: alice.client_id(),
                len: 2
            })
        );
        assert_eq!(bob.receive(), None);
        assert_eq!(relay.client_count(), 1);

        drop(bob);
        assert_eq!(relay.client_count(), 0);
    }
}
