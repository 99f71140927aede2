/// Event bus for stepper change notifications
///
/// Each subscriber gets its own unbounded channel, optionally behind a
/// filter, so a slow reader never blocks a commit.
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::events::StepperEvent;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(usize);

type EventFilter = Box<dyn Fn(&StepperEvent) -> bool + Send + Sync>;

struct Subscription {
    sender: Sender<StepperEvent>,
    filter: Option<EventFilter>,
}

impl Subscription {
    fn wants(&self, event: &StepperEvent) -> bool {
        self.filter.as_ref().map_or(true, |accept| accept(event))
    }
}

/// Broadcasts [`StepperEvent`]s; clones share the same subscriber set
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<RwLock<BTreeMap<SubscriberId, Subscription>>>,
    next_id: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event
    pub fn subscribe(&self) -> (Receiver<StepperEvent>, SubscriberId) {
        self.register(None)
    }

    /// Receive only the events accepted by `filter`
    pub fn subscribe_filtered<F>(&self, filter: F) -> (Receiver<StepperEvent>, SubscriberId)
    where
        F: Fn(&StepperEvent) -> bool + Send + Sync + 'static,
    {
        self.register(Some(Box::new(filter)))
    }

    fn register(&self, filter: Option<EventFilter>) -> (Receiver<StepperEvent>, SubscriberId) {
        let (sender, receiver) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .insert(id, Subscription { sender, filter });
        (receiver, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscriptions.write().remove(&id);
    }

    /// Deliver `event` to every interested subscriber
    ///
    /// Subscriptions whose receiver was dropped are removed.
    pub fn publish(&self, event: StepperEvent) {
        let closed: Vec<SubscriberId> = self
            .subscriptions
            .read()
            .iter()
            .filter(|(_, sub)| sub.wants(&event))
            .filter(|(_, sub)| sub.sender.send(event.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        if !closed.is_empty() {
            tracing::trace!(count = closed.len(), "Dropping closed event subscriptions");
            let mut subscriptions = self.subscriptions.write();
            for id in closed {
                subscriptions.remove(&id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
