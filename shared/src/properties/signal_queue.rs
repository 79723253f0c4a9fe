use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use super::ids::PropertyId;

/// How a handler currently delivers change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Listeners run as soon as a property changes
    Direct,
    /// Notifications wait until every emit lock is released
    Queued,
}

/// Change notifications waiting for delivery.
///
/// `queued` collects notifications raised while direct emission is locked.
/// `pending` holds notifications ready to be delivered by whoever is
/// currently dispatching, so a listener that changes another property never
/// runs listeners re-entrantly.
#[derive(Default)]
pub(crate) struct SignalQueue {
    lock_count: u32,
    queued: VecDeque<PropertyId>,
    pending: VecDeque<PropertyId>,
    dispatching: bool,
}

impl SignalQueue {
    pub fn mode(&self) -> EmitMode {
        if self.lock_count > 0 {
            EmitMode::Queued
        } else {
            EmitMode::Direct
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    pub fn lock(&mut self) {
        self.lock_count += 1;
    }

    /// Releases one lock. Returns true if the caller should start dispatching.
    pub fn unlock(&mut self) -> bool {
        if self.lock_count == 0 {
            return false;
        }
        self.lock_count -= 1;
        if self.lock_count > 0 {
            return false;
        }
        self.pending.extend(self.queued.drain(..));
        self.begin_dispatch()
    }

    /// Records a notification. Returns true if the caller should start
    /// dispatching.
    pub fn enqueue(&mut self, property_id: PropertyId) -> bool {
        if self.lock_count > 0 {
            self.queued.push_back(property_id);
            return false;
        }
        self.pending.push_back(property_id);
        self.begin_dispatch()
    }

    /// Next notification to deliver. Ends the dispatch once nothing is left.
    pub fn next_pending(&mut self) -> Option<PropertyId> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.dispatching = false;
        }
        next
    }

    /// Ends a dispatch that was cut short by a panicking listener. Pending
    /// notifications stay queued for the next dispatch.
    pub fn abort_dispatch(&mut self) {
        self.dispatching = false;
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    fn begin_dispatch(&mut self) -> bool {
        if self.dispatching || self.pending.is_empty() {
            return false;
        }
        self.dispatching = true;
        true
    }
}

/// Returned by `PropertyHandler::on_property_changed`, used to remove the
/// listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey(u64);

type Listener = Arc<Mutex<dyn FnMut(PropertyId) + Send>>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_key: u64,
    entries: Vec<(ListenerKey, Listener)>,
}

impl Listeners {
    pub fn insert(&mut self, listener: impl FnMut(PropertyId) + Send + 'static) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        let listener: Listener = Arc::new(Mutex::new(listener));
        self.entries.push((key, listener));
        key
    }

    pub fn remove(&mut self, key: ListenerKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_key, _)| *entry_key != key);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copies out the listeners so they can run without the set locked
    pub fn snapshot(&self) -> Vec<Listener> {
        self.entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

pub(crate) fn call_listener(listener: &Listener, property_id: PropertyId) {
    let mut listener = listener.lock().unwrap_or_else(PoisonError::into_inner);
    (&mut *listener)(property_id);
}

#[cfg(test)]
mod tests {
    use super::{EmitMode, SignalQueue};

    #[test]
    fn direct_mode_dispatches_immediately() {
        let mut queue = SignalQueue::default();
        assert_eq!(queue.mode(), EmitMode::Direct);

        assert!(queue.enqueue(3));
        // a nested notification joins the running dispatch
        assert!(!queue.enqueue(4));

        assert_eq!(queue.next_pending(), Some(3));
        assert_eq!(queue.next_pending(), Some(4));
        assert_eq!(queue.next_pending(), None);

        assert!(queue.enqueue(5));
    }

    #[test]
    fn locked_queue_holds_notifications_in_order() {
        let mut queue = SignalQueue::default();
        queue.lock();
        queue.lock();
        assert_eq!(queue.mode(), EmitMode::Queued);

        assert!(!queue.enqueue(1));
        assert!(!queue.enqueue(2));
        assert_eq!(queue.queued_len(), 2);

        assert!(!queue.unlock());
        assert_eq!(queue.next_pending(), None);

        assert!(queue.unlock());
        assert_eq!(queue.mode(), EmitMode::Direct);
        assert_eq!(queue.next_pending(), Some(1));
        assert_eq!(queue.next_pending(), Some(2));
        assert_eq!(queue.next_pending(), None);
    }

    #[test]
    fn aborted_dispatch_can_restart() {
        let mut queue = SignalQueue::default();
        assert!(queue.enqueue(1));
        assert!(!queue.enqueue(2));
        assert_eq!(queue.next_pending(), Some(1));

        queue.abort_dispatch();
        assert!(queue.enqueue(3));
        assert_eq!(queue.next_pending(), Some(2));
        assert_eq!(queue.next_pending(), Some(3));
        assert_eq!(queue.next_pending(), None);
    }

    #[test]
    fn unbalanced_unlock_is_ignored() {
        let mut queue = SignalQueue::default();
        assert!(!queue.unlock());
        assert!(!queue.is_locked());

        queue.lock();
        assert!(queue.is_locked());
    }
}
