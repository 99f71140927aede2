/// Wizard actions
///
/// Pure reducers that build a new state from a snapshot, plus
/// [`StepActions`], the only component that commits them to the store.
use parking_lot::RwLock;
use std::sync::Arc;

use super::persistence::StatePersistence;
use super::state::{GeneralInfo, Payload, StepError, StepperState};
use super::steps::{FlagPatch, StepDefinition, StepUpdate};
use crate::config::{NavigationConfig, NavigationConfigUpdate, TransitionPolicy};
use crate::error::StepperError;
use crate::messaging::{StepperCommand, StepperEvent};
use crate::state::StateStore;

/// Flags set on the step being left when the policy leaves them unset
pub const CURRENT_STEP_DEFAULTS: FlagPatch = FlagPatch {
    can_access: Some(true),
    can_edit: None,
    is_optional: None,
    is_completed: Some(true),
};

/// Flags set on the step being entered when the policy leaves them unset
pub const DESTINATION_STEP_DEFAULTS: FlagPatch = FlagPatch {
    can_access: Some(true),
    can_edit: None,
    is_optional: None,
    is_completed: None,
};

/// Reduce a command against a snapshot
pub fn reduce<P: Payload>(
    state: &StepperState<P>,
    command: StepperCommand<P>,
) -> Result<StepperState<P>, StepperError> {
    match command {
        StepperCommand::SetSteps { steps } => Ok(set_steps(state, &steps)),
        StepperCommand::UpdateSteps { updates } => apply_step_updates(state, &updates),
        StepperCommand::UpdateGeneralState { patch } => Ok(merge_general_state(state, patch)),
        StepperCommand::AddError {
            step_index,
            message,
        } => Ok(push_error(state, step_index, message)),
        StepperCommand::Restore { state: restored } => Ok(normalize_restored(restored)),
    }
}

/// Replace the step sequence; progress is zeroed
pub fn set_steps<P: Clone>(state: &StepperState<P>, steps: &[StepDefinition]) -> StepperState<P> {
    StepperState {
        general_info: GeneralInfo::reset(steps.len()),
        steps: steps.iter().map(StepDefinition::to_flags).collect(),
        general_state: state.general_state.clone(),
        errors: state.errors.clone(),
    }
}

/// Apply flag updates against a single snapshot
///
/// Every index is validated before any update is applied.
pub fn apply_step_updates<P: Clone>(
    state: &StepperState<P>,
    updates: &[StepUpdate],
) -> Result<StepperState<P>, StepperError> {
    let total = state.steps.len();
    if let Some(bad) = updates.iter().find(|u| u.step_index >= total) {
        return Err(StepperError::IndexOutOfRange {
            index: bad.step_index,
            total,
        });
    }

    let mut next = state.clone();
    for update in updates {
        let step = &next.steps[update.step_index];
        next.steps[update.step_index] = update.data.apply(step);
    }
    Ok(next)
}

/// Shallow-merge a payload patch
pub fn merge_general_state<P: Payload>(state: &StepperState<P>, patch: P::Patch) -> StepperState<P> {
    let mut next = state.clone();
    next.general_state.merge(patch);
    next
}

/// Append an error unless an identical one is logged
pub fn push_error<P: Clone>(
    state: &StepperState<P>,
    step_index: usize,
    message: String,
) -> StepperState<P> {
    let mut next = state.clone();
    if !state.has_error(step_index, &message) {
        next.errors.push(StepError {
            step_index,
            message,
        });
    }
    next
}

/// Bring a persisted state back in line with its step sequence
///
/// Stored progress values are kept as-is.
pub fn normalize_restored<P>(mut state: StepperState<P>) -> StepperState<P> {
    state.general_info.total_steps = state.steps.len();
    state
}

/// Apply a transition policy to the step being left and the step entered
///
/// The destination is applied last, so it wins if both indices coincide.
pub fn apply_transition<P: Clone>(
    state: &StepperState<P>,
    current: usize,
    destination: Option<usize>,
    policy: &TransitionPolicy,
) -> StepperState<P> {
    let mut next = state.clone();

    if let Some(step) = next.steps.get(current) {
        let patch = policy.current_step.or(CURRENT_STEP_DEFAULTS);
        next.steps[current] = patch.apply(step);
    }

    if let Some(index) = destination {
        if let Some(step) = next.steps.get(index) {
            let patch = policy.destination_step.or(DESTINATION_STEP_DEFAULTS);
            next.steps[index] = patch.apply(step);
        }
    }

    next
}

/// Recompute progress with `position` as the positional numerator
pub fn with_progress<P>(mut state: StepperState<P>, position: usize) -> StepperState<P> {
    state.general_info = GeneralInfo::recompute(&state.steps, position);
    state
}

/// Side effect run once a command is committed
enum FollowUp {
    None,
    FirstStep,
    FirstIncompleteStep,
    ErrorRecorded { step_index: usize, message: String },
}

impl FollowUp {
    fn of<P: Payload>(command: &StepperCommand<P>) -> Self {
        match command {
            StepperCommand::SetSteps { .. } => FollowUp::FirstStep,
            StepperCommand::Restore { .. } => FollowUp::FirstIncompleteStep,
            StepperCommand::AddError {
                step_index,
                message,
            } => FollowUp::ErrorRecorded {
                step_index: *step_index,
                message: message.clone(),
            },
            StepperCommand::UpdateSteps { .. } | StepperCommand::UpdateGeneralState { .. } => {
                FollowUp::None
            }
        }
    }
}

/// Validated mutators over the shared store
///
/// Holds the store, the live navigation config and the optional durable
/// storage; every mutation commits a new snapshot and, when enabled,
/// persists it.
pub struct StepActions<P: Payload> {
    store: StateStore<P>,
    config: Arc<RwLock<NavigationConfig>>,
    persistence: Option<StatePersistence>,
}

impl<P: Payload> StepActions<P> {
    pub fn new(
        store: StateStore<P>,
        config: Arc<RwLock<NavigationConfig>>,
        persistence: Option<StatePersistence>,
    ) -> Self {
        Self {
            store,
            config,
            persistence,
        }
    }

    pub fn store(&self) -> &StateStore<P> {
        &self.store
    }

    /// Get a copy of the live navigation config
    pub fn config(&self) -> NavigationConfig {
        *self.config.read()
    }

    /// Reduce `command` against the current snapshot and commit the result
    ///
    /// Index moves and error events follow the commit.
    pub fn dispatch(&self, command: StepperCommand<P>) -> Result<Arc<StepperState<P>>, StepperError> {
        tracing::debug!("Dispatching: {}", command.description());

        let persists = command.persists();
        let follow_up = FollowUp::of(&command);
        let next = reduce(&self.store.snapshot(), command)?;

        let committed = self.store.replace(next);
        if persists {
            self.persist(&committed);
        }
        self.follow_up(follow_up, &committed);
        Ok(committed)
    }

    /// Dispatch a command whose reducer has no failure path
    fn dispatch_infallible(&self, command: StepperCommand<P>) -> Arc<StepperState<P>> {
        let description = command.description();
        self.dispatch(command).unwrap_or_else(|e| {
            tracing::error!("{} rejected: {}", description, e);
            self.store.snapshot()
        })
    }

    fn follow_up(&self, follow_up: FollowUp, committed: &StepperState<P>) {
        match follow_up {
            FollowUp::None => {}
            FollowUp::FirstStep => {
                self.store.set_current_step(0);
                tracing::info!(total_steps = committed.steps.len(), "Stepper steps configured");
            }
            FollowUp::FirstIncompleteStep => {
                let index = committed
                    .completed_count()
                    .min(committed.steps.len().saturating_sub(1));
                self.store.set_current_step(index);
                tracing::info!(current_step = index, "Restored stepper state");
            }
            FollowUp::ErrorRecorded {
                step_index,
                message,
            } => {
                tracing::warn!(step_index, "{}", message);
                self.store.bus().publish(StepperEvent::ErrorRecorded {
                    step_index,
                    message,
                });
            }
        }
    }

    /// Replace the steps and go back to the first step
    pub fn set_steps_info(&self, steps: Vec<StepDefinition>) -> Arc<StepperState<P>> {
        self.dispatch_infallible(StepperCommand::SetSteps { steps })
    }

    pub fn update_steps(&self, updates: Vec<StepUpdate>) -> Result<Arc<StepperState<P>>, StepperError> {
        self.dispatch(StepperCommand::UpdateSteps { updates })
    }

    pub fn update_general_state(&self, patch: P::Patch) -> Arc<StepperState<P>> {
        self.dispatch_infallible(StepperCommand::UpdateGeneralState { patch })
    }

    /// Record an error, returns false when an identical one already exists
    pub fn add_error(&self, step_index: usize, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.store.snapshot().has_error(step_index, &message) {
            return false;
        }

        self.dispatch_infallible(StepperCommand::AddError {
            step_index,
            message,
        });
        true
    }

    /// Shallow-merge into the live navigation config
    pub fn update_config(&self, update: NavigationConfigUpdate) {
        self.config.write().merge(update);
        tracing::debug!("Navigation config updated");
    }

    /// Commit a state composed by the navigation engine and persist it
    pub fn commit(&self, state: StepperState<P>) -> Arc<StepperState<P>> {
        let committed = self.store.replace(state);
        self.persist(&committed);
        committed
    }

    /// Adopt a previously persisted state
    ///
    /// The current index moves to the number of completed steps, clamped to
    /// the last step.
    pub fn restore(&self, state: StepperState<P>) -> Arc<StepperState<P>> {
        self.dispatch_infallible(StepperCommand::Restore { state })
    }

    /// Whether a durable storage backend is attached
    pub fn has_storage(&self) -> bool {
        self.persistence.is_some()
    }

    /// Load the durable copy, if persistence is configured and one exists
    pub fn load_persisted(&self) -> Option<StepperState<P>> {
        let persistence = self.persistence.as_ref()?;
        match persistence.load() {
            Ok(state) => state,
            Err(e) => {
                self.report_persistence_failure("load", &e);
                None
            }
        }
    }

    /// Write the durable copy when `save_local_storage` is enabled
    pub fn persist(&self, state: &StepperState<P>) {
        if !self.config.read().save_local_storage {
            return;
        }
        let Some(persistence) = &self.persistence else {
            return;
        };

        if let Err(e) = persistence.save(state) {
            self.report_persistence_failure("save", &e);
        }
    }

    /// Remove the durable copy
    pub fn clear_storage(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        match persistence.clear() {
            Ok(()) => tracing::debug!("Cleared persisted stepper state"),
            Err(e) => self.report_persistence_failure("clear", &e),
        }
    }

    fn report_persistence_failure(&self, operation: &str, error: &crate::error::PersistenceError) {
        tracing::warn!("Failed to {} stepper state: {}", operation, error);
        self.store.bus().publish(StepperEvent::PersistenceFailed {
            message: format!("{operation}: {error}"),
        });
    }
}

impl<P: Payload> Clone for StepActions<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: Arc::clone(&self.config),
            persistence: self.persistence.clone(),
        }
    }
}
