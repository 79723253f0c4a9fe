//! In-process game sessions for integration testing.
//! Every participant owns a handler with the same id, connected to one
//! `LocalRelay`, so a property registered under the same id on each
//! participant is the same replicated property.

use std::sync::Arc;

use kgame_shared::{
    BitReader, HandlerConfig, HandlerId, LocalRelay, PropertyHandler, PropertyPolicy, RelayLink,
};

/// One process taking part in a session
pub struct Participant {
    handler: PropertyHandler,
    link: Arc<RelayLink>,
}

impl Participant {
    pub fn connect(relay: &LocalRelay, handler_id: HandlerId, policy: PropertyPolicy) -> Self {
        let link = Arc::new(relay.connect());
        let handler = PropertyHandler::with_config(
            handler_id,
            HandlerConfig {
                default_policy: policy,
                ..HandlerConfig::default()
            },
        );
        handler.set_transport(link.clone());
        Self { handler, link }
    }

    pub fn handler(&self) -> &PropertyHandler {
        &self.handler
    }

    pub fn link(&self) -> &RelayLink {
        &self.link
    }

    /// Processes every message queued for this participant. Returns how many
    /// were processed.
    pub fn receive_all(&self) -> usize {
        let mut count = 0;
        while let Some(envelope) = self.link.receive() {
            let mut reader = BitReader::new(&envelope.payload);
            self.handler.process_message(
                &mut reader,
                envelope.handler_id,
                envelope.is_from(self.link.client_id()),
            );
            count += 1;
        }
        count
    }
}

/// A relay with a fixed set of participants
pub struct TestSession {
    // participants drop before the relay they are connected to
    participants: Vec<Participant>,
    relay: LocalRelay,
}

impl TestSession {
    pub fn new(participant_count: usize, handler_id: HandlerId, policy: PropertyPolicy) -> Self {
        let relay = LocalRelay::new();
        let participants = (0..participant_count)
            .map(|_| Participant::connect(&relay, handler_id, policy))
            .collect();
        Self {
            participants,
            relay,
        }
    }

    pub fn participant(&self, index: usize) -> &Participant {
        &self.participants[index]
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn relay(&self) -> &LocalRelay {
        &self.relay
    }

    /// Delivers messages until every participant's queue is empty, including
    /// messages sent by listeners while delivering. Relay clients outside the
    /// session keep their queues.
    pub fn pump(&self) {
        loop {
            let processed: usize = self
                .participants
                .iter()
                .map(Participant::receive_all)
                .sum();
            if processed == 0 {
                break;
            }
        }
    }

    /// Delivers only what `index` has queued, simulating a participant that
    /// is ahead of the others
    pub fn pump_one(&self, index: usize) -> usize {
        self.participants[index].receive_all()
    }
}
