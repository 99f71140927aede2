/// Stepper state store
///
/// Single owner of the live state snapshot and the current step index.
/// Every write replaces the whole snapshot and notifies subscribers.
use parking_lot::RwLock;
use std::sync::Arc;

use crate::messaging::{EventBus, StepperEvent};
use crate::wizard::state::{Payload, StepperState};

struct StoreInner<P> {
    state: Arc<StepperState<P>>,
    current_step: usize,
    revision: u64,
}

/// Shared handle to the live stepper state
pub struct StateStore<P: Payload> {
    inner: Arc<RwLock<StoreInner<P>>>,
    bus: EventBus,
}

impl<P: Payload> StateStore<P> {
    /// Create a store holding an empty state, positioned on the first step
    pub fn new(bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                state: Arc::new(StepperState::new()),
                current_step: 0,
                revision: 0,
            })),
            bus,
        }
    }

    /// Get the current snapshot
    pub fn snapshot(&self) -> Arc<StepperState<P>> {
        Arc::clone(&self.inner.read().state)
    }

    /// Get the current step index
    pub fn current_step(&self) -> usize {
        self.inner.read().current_step
    }

    /// Number of commits since creation
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Get the event bus notified on every change
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Atomically replace the state, returns the committed snapshot
    pub fn replace(&self, state: StepperState<P>) -> Arc<StepperState<P>> {
        let state = Arc::new(state);
        let revision = {
            let mut inner = self.inner.write();
            inner.state = Arc::clone(&state);
            inner.revision += 1;
            inner.revision
        };

        tracing::debug!(revision, steps = state.steps.len(), "Committed stepper state");
        self.bus.publish(StepperEvent::StateCommitted { revision });
        state
    }

    /// Move to another step; no event when the index does not change
    pub fn set_current_step(&self, index: usize) {
        let previous = {
            let mut inner = self.inner.write();
            std::mem::replace(&mut inner.current_step, index)
        };

        if previous != index {
            self.bus.publish(StepperEvent::CurrentStepChanged {
                from: previous,
                to: index,
            });
        }
    }
}

impl<P: Payload> Clone for StateStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            bus: self.bus.clone(),
        }
    }
}

impl<P: Payload> std::fmt::Debug for StateStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("StateStore")
            .field("current_step", &inner.current_step)
            .field("revision", &inner.revision)
            .field("total_steps", &inner.state.steps.len())
            .finish()
    }
}
