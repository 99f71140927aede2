/// Wizard flow management
///
/// The navigation engine: validates a move, applies the configured
/// transition policy, recomputes progress, commits (and optionally
/// persists), awaits the caller's completion callback and finally moves the
/// current step index.
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::actions::{apply_step_updates, apply_transition, with_progress, StepActions};
use super::persistence::{StateStorage, StatePersistence};
use super::state::{JsonPayload, Payload, StepperState};
use super::steps::{ActiveStep, StepDefinition, StepUpdate};
use crate::config::{NavigationConfig, NavigationConfigUpdate, StepperConfig, TransitionPolicy};
use crate::error::{AccessDenied, StepperError};
use crate::messaging::{EventBus, StepperEvent};
use crate::state::StateStore;

/// Completion callback invoked with the committed state before the index moves
pub type StepCallback<P> =
    Box<dyn FnOnce(Arc<StepperState<P>>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Optional inputs of a navigation call
pub struct NavigationArgs<P: Payload = JsonPayload> {
    on_complete_step: Option<StepCallback<P>>,
    update_steps_status: Vec<StepUpdate>,
    update_general_state: Option<P::Patch>,
}

impl<P: Payload> NavigationArgs<P> {
    pub fn new() -> Self {
        Self {
            on_complete_step: None,
            update_steps_status: Vec::new(),
            update_general_state: None,
        }
    }

    /// Await `callback` with the committed state before moving
    pub fn on_complete_step<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(Arc<StepperState<P>>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_complete_step = Some(Box::new(move |state| callback(state).boxed()));
        self
    }

    /// Explicit flag overrides applied before the transition policy
    pub fn update_steps_status(mut self, updates: Vec<StepUpdate>) -> Self {
        self.update_steps_status = updates;
        self
    }

    /// Payload patch merged before anything else
    pub fn update_general_state(mut self, patch: P::Patch) -> Self {
        self.update_general_state = Some(patch);
        self
    }
}

impl<P: Payload> Default for NavigationArgs<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a navigation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The current step index moved
    Moved { from: usize, to: usize },

    /// The move was applied but the index stayed (`on_next` on the last step)
    Stayed { index: usize },

    /// `go_to_step` targeted the current step
    Unchanged,

    /// The move was refused and recorded in the error log
    Blocked(AccessDenied),

    /// Validation or the completion callback failed; the index did not move
    Failed { reason: String },

    /// Another navigation is still in flight
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Next,
    Prev,
    GoTo(usize),
}

impl Move {
    fn label(self) -> &'static str {
        match self {
            Move::Next => "onNext",
            Move::Prev => "onPrev",
            Move::GoTo(_) => "goToStep",
        }
    }

    fn policy(self, config: &NavigationConfig) -> TransitionPolicy {
        match self {
            Move::Next => config.next,
            Move::Prev => config.prev,
            Move::GoTo(_) => config.go_to_step,
        }
    }

    /// Step receiving the destination overrides
    fn destination(self, from: usize, total: usize) -> Option<usize> {
        let index = match self {
            Move::Next => from + 1,
            Move::Prev => from.checked_sub(1)?,
            Move::GoTo(target) => target,
        };
        (index < total).then_some(index)
    }

    /// Numerator of `current_progress` after the move
    fn position(self, from: usize) -> usize {
        match self {
            Move::Next => from + 1,
            Move::Prev => from.saturating_sub(1),
            Move::GoTo(target) => target,
        }
    }

    /// Index once the callback resolved
    fn landing(self, from: usize, total: usize) -> usize {
        match self {
            Move::Next if from + 1 < total => from + 1,
            Move::Next => from,
            Move::Prev => from.saturating_sub(1),
            Move::GoTo(target) => target,
        }
    }
}

/// Holds the loading flag for the duration of a navigation
///
/// Dropping the guard clears the flag on every exit path.
struct LoadingGuard {
    flag: Arc<AtomicBool>,
    bus: EventBus,
}

impl LoadingGuard {
    fn acquire(flag: &Arc<AtomicBool>, bus: &EventBus) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        bus.publish(StepperEvent::LoadingChanged { loading: true });

        Some(Self {
            flag: Arc::clone(flag),
            bus: bus.clone(),
        })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.bus.publish(StepperEvent::LoadingChanged { loading: false });
    }
}

/// Wizard stepper: state store, action layer and navigation engine
pub struct Stepper<P: Payload = JsonPayload> {
    actions: StepActions<P>,
    loading: Arc<AtomicBool>,
}

impl<P: Payload> Stepper<P> {
    /// Create a stepper with `config` and no durable storage
    pub fn new(config: NavigationConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> StepperBuilder<P> {
        StepperBuilder::new()
    }

    /// Apply a setup file: config, steps, then the durable copy if enabled
    pub fn initialize(&self, setup: StepperConfig) -> Arc<StepperState<P>> {
        let StepperConfig { steps, navigation } = setup;
        self.update_config(NavigationConfigUpdate {
            validations: Some(navigation.validations),
            next: Some(navigation.next),
            prev: Some(navigation.prev),
            go_to_step: Some(navigation.go_to_step),
            save_local_storage: Some(navigation.save_local_storage),
        });

        let state = self.set_steps_info(steps);
        if !navigation.save_local_storage {
            return state;
        }
        if !self.actions.has_storage() {
            tracing::warn!("saveLocalStorage is enabled but no storage is configured, state will not be persisted");
            return state;
        }

        match self.actions.load_persisted() {
            Some(saved) => self.actions.restore(saved),
            None => state,
        }
    }

    /// Get the current snapshot
    pub fn snapshot(&self) -> Arc<StepperState<P>> {
        self.actions.store().snapshot()
    }

    /// Get the current step index
    pub fn current_step(&self) -> usize {
        self.actions.store().current_step()
    }

    /// Whether a navigation is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Get a copy of the live navigation config
    pub fn config(&self) -> NavigationConfig {
        self.actions.config()
    }

    /// Get the event bus for change notifications
    pub fn event_bus(&self) -> &EventBus {
        self.actions.store().bus()
    }

    /// View of the current step, `None` until steps are configured
    pub fn active_step(&self) -> Option<ActiveStep> {
        let state = self.snapshot();
        let index = self.current_step();
        let flags = state.steps.get(index)?.clone();

        Some(ActiveStep {
            flags,
            index,
            is_first_step: index == 0,
            is_last_step: index + 1 == state.steps.len(),
        })
    }

    pub fn set_steps_info(&self, steps: Vec<StepDefinition>) -> Arc<StepperState<P>> {
        self.actions.set_steps_info(steps)
    }

    pub fn update_steps(&self, updates: Vec<StepUpdate>) -> Result<Arc<StepperState<P>>, StepperError> {
        self.actions.update_steps(updates)
    }

    pub fn update_general_state(&self, patch: P::Patch) -> Arc<StepperState<P>> {
        self.actions.update_general_state(patch)
    }

    pub fn add_error(&self, step_index: usize, message: impl Into<String>) -> bool {
        self.actions.add_error(step_index, message)
    }

    pub fn update_config(&self, update: NavigationConfigUpdate) {
        self.actions.update_config(update)
    }

    /// Adopt a previously persisted state
    pub fn restore(&self, state: StepperState<P>) -> Arc<StepperState<P>> {
        self.actions.restore(state)
    }

    /// Whether a durable storage backend is attached
    pub fn has_storage(&self) -> bool {
        self.actions.has_storage()
    }

    /// Remove the durable copy
    pub fn clear_storage(&self) {
        self.actions.clear_storage()
    }

    /// Complete the current step and move forward
    ///
    /// On the last step the flags and progress are still updated but the
    /// index does not move.
    pub async fn on_next(&self, args: NavigationArgs<P>) -> NavigationOutcome {
        let from = self.current_step();
        self.navigate(Move::Next, from, args).await
    }

    /// Move back one step
    pub async fn on_prev(&self, args: NavigationArgs<P>) -> NavigationOutcome {
        let from = self.current_step();
        if from == 0 {
            return self.deny(from, AccessDenied::FirstStep);
        }
        self.navigate(Move::Prev, from, args).await
    }

    /// Jump to `target`
    ///
    /// Fails with [`StepperError::StepNotFound`] when `target` is past the
    /// last step. Forward jumps to an inaccessible step are recorded in the
    /// error log when access validation is enabled.
    pub async fn go_to_step(
        &self,
        target: usize,
        args: NavigationArgs<P>,
    ) -> Result<NavigationOutcome, StepperError> {
        let from = self.current_step();
        if target == from {
            return Ok(NavigationOutcome::Unchanged);
        }

        let state = self.snapshot();
        let total = state.steps.len();
        if target >= total {
            return Err(StepperError::StepNotFound { target, total });
        }

        if target > from && self.config().validates_access() && !state.steps[target].can_access {
            return Ok(self.deny(from, AccessDenied::StepLocked { target }));
        }

        Ok(self.navigate(Move::GoTo(target), from, args).await)
    }

    fn deny(&self, from: usize, reason: AccessDenied) -> NavigationOutcome {
        self.actions.add_error(from, reason.to_string());
        NavigationOutcome::Blocked(reason)
    }

    async fn navigate(&self, mv: Move, from: usize, args: NavigationArgs<P>) -> NavigationOutcome {
        let Some(_loading) = LoadingGuard::acquire(&self.loading, self.event_bus()) else {
            tracing::warn!("{} ignored: another navigation is in flight", mv.label());
            return NavigationOutcome::Busy;
        };

        match self.transition(mv, from, args).await {
            Ok(to) if to == from => NavigationOutcome::Stayed { index: from },
            Ok(to) => {
                tracing::info!(from, to, "{} moved to step {}", mv.label(), to);
                NavigationOutcome::Moved { from, to }
            }
            Err(e) => {
                tracing::error!("Error in {}: {:#}", mv.label(), e);
                NavigationOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// Compose, commit, persist, await the callback, then move the index
    async fn transition(
        &self,
        mv: Move,
        from: usize,
        args: NavigationArgs<P>,
    ) -> anyhow::Result<usize> {
        let NavigationArgs {
            on_complete_step,
            update_steps_status,
            update_general_state,
        } = args;
        let config = self.config();

        // The payload delta is kept even when the flag updates are rejected
        if let Some(patch) = update_general_state {
            self.actions.update_general_state(patch);
        }
        let mut state = apply_step_updates(&self.snapshot(), &update_steps_status)?;

        let total = state.steps.len();
        state = apply_transition(&state, from, mv.destination(from, total), &mv.policy(&config));
        state = with_progress(state, mv.position(from));

        let committed = self.actions.commit(state);
        if mv == Move::Next && from + 1 >= total && config.save_local_storage {
            self.actions.clear_storage();
        }

        if let Some(callback) = on_complete_step {
            callback(Arc::clone(&committed)).await?;
        }

        let to = mv.landing(from, total);
        self.actions.store().set_current_step(to);
        Ok(to)
    }
}

impl<P: Payload> Clone for Stepper<P> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            loading: Arc::clone(&self.loading),
        }
    }
}

impl<P: Payload> Default for Stepper<P> {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

impl<P: Payload> std::fmt::Debug for Stepper<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepper")
            .field("store", self.actions.store())
            .field("loading", &self.is_loading())
            .finish()
    }
}

/// Builder wiring the store, config and durable storage together
pub struct StepperBuilder<P: Payload> {
    config: NavigationConfig,
    storage: Option<Arc<dyn StateStorage>>,
    bus: EventBus,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Payload> StepperBuilder<P> {
    pub fn new() -> Self {
        Self {
            config: NavigationConfig::default(),
            storage: None,
            bus: EventBus::new(),
            _payload: PhantomData,
        }
    }

    pub fn config(mut self, config: NavigationConfig) -> Self {
        self.config = config;
        self
    }

    /// Durable storage used when `save_local_storage` is enabled
    pub fn storage(mut self, storage: Arc<dyn StateStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn build(self) -> Stepper<P> {
        let store = StateStore::new(self.bus);
        let persistence = self.storage.map(StatePersistence::new);

        Stepper {
            actions: StepActions::new(store, Arc::new(RwLock::new(self.config)), persistence),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<P: Payload> Default for StepperBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::persistence::MemoryStorage;
    use crate::wizard::steps::FlagPatch;
    use serde_json::json;

    fn stepper(n: usize) -> Stepper {
        let stepper = Stepper::default();
        stepper.set_steps_info((0..n).map(|i| StepDefinition::new(format!("step-{i}"))).collect());
        stepper
    }

    #[tokio::test]
    async fn test_new_flow() {
        let stepper = stepper(3);
        let active = stepper.active_step().unwrap();

        assert_eq!(active.index, 0);
        assert!(active.is_first_step);
        assert!(!active.is_last_step);
        assert!(!stepper.is_loading());
    }

    #[tokio::test]
    async fn test_next_navigation() {
        let stepper = stepper(3);

        let outcome = stepper.on_next(NavigationArgs::new()).await;
        assert_eq!(outcome, NavigationOutcome::Moved { from: 0, to: 1 });

        let state = stepper.snapshot();
        assert!(state.steps[0].can_access && state.steps[0].is_completed);
        assert!(state.steps[1].can_access);
        assert!(!state.steps[1].is_completed);
        assert_eq!(state.general_info.current_progress, 1.0 / 3.0);
        assert_eq!(state.general_info.completed_progress, 1.0 / 3.0);
        assert_eq!(state.general_info.can_access_progress, 2.0 / 3.0);
    }

    #[tokio::test]
    async fn test_next_at_last_step_stays() {
        let stepper = stepper(2);
        stepper.on_next(NavigationArgs::new()).await;

        let outcome = stepper.on_next(NavigationArgs::new()).await;
        assert_eq!(outcome, NavigationOutcome::Stayed { index: 1 });
        assert_eq!(stepper.current_step(), 1);

        let state = stepper.snapshot();
        assert!(state.steps[1].is_completed);
        assert_eq!(state.general_info.current_progress, 1.0);
        assert_eq!(state.general_info.completed_progress, 1.0);
        assert!(stepper.active_step().unwrap().is_last_step);
    }

    #[tokio::test]
    async fn test_back_navigation() {
        let stepper = stepper(3);
        stepper.on_next(NavigationArgs::new()).await;
        stepper.on_next(NavigationArgs::new()).await;

        let outcome = stepper.on_prev(NavigationArgs::new()).await;
        assert_eq!(outcome, NavigationOutcome::Moved { from: 2, to: 1 });
        assert_eq!(stepper.snapshot().general_info.current_progress, 1.0 / 3.0);
    }

    #[tokio::test]
    async fn test_back_at_first_step() {
        let stepper = stepper(3);
        let before = stepper.snapshot();

        let outcome = stepper.on_prev(NavigationArgs::new()).await;
        assert_eq!(outcome, NavigationOutcome::Blocked(AccessDenied::FirstStep));
        stepper.on_prev(NavigationArgs::new()).await;

        let after = stepper.snapshot();
        assert_eq!(after.errors.len(), 1);
        assert_eq!(after.steps, before.steps);
        assert_eq!(after.general_info, before.general_info);
        assert_eq!(stepper.current_step(), 0);
    }

    #[tokio::test]
    async fn test_prev_policy_overrides() {
        let stepper = stepper(3);
        stepper.on_next(NavigationArgs::new()).await;
        stepper.update_config(NavigationConfigUpdate::new().prev(TransitionPolicy::new(
            FlagPatch::new().is_completed(false),
            FlagPatch::new().can_edit(true),
        )));

        stepper.on_prev(NavigationArgs::new()).await;
        let state = stepper.snapshot();
        assert!(!state.steps[1].is_completed);
        assert!(state.steps[1].can_access);
        assert!(state.steps[0].can_edit);
    }

    #[tokio::test]
    async fn test_next_applies_next_policy() {
        let stepper = stepper(3);
        stepper.update_config(NavigationConfigUpdate::new().next(TransitionPolicy::new(
            FlagPatch::new().can_edit(true),
            FlagPatch::new().is_optional(true),
        )));

        stepper.on_next(NavigationArgs::new()).await;
        let state = stepper.snapshot();
        assert!(state.steps[0].can_edit);
        assert!(state.steps[0].is_completed);
        assert!(state.steps[1].is_optional);
        assert!(state.steps[1].can_access);
    }

    #[tokio::test]
    async fn test_go_to_applies_go_to_policy() {
        let stepper = stepper(3);
        stepper.on_next(NavigationArgs::new()).await;
        stepper.update_config(
            NavigationConfigUpdate::new()
                .validate_access(false)
                .next(TransitionPolicy::new(
                    FlagPatch::new().is_optional(true),
                    FlagPatch::new().is_optional(true),
                ))
                .go_to_step(TransitionPolicy::new(
                    FlagPatch::new().is_completed(false),
                    FlagPatch::new().can_edit(true),
                )),
        );

        stepper.go_to_step(2, NavigationArgs::new()).await.unwrap();
        let state = stepper.snapshot();
        assert!(!state.steps[1].is_completed);
        assert!(!state.steps[1].is_optional);
        assert!(state.steps[2].can_edit);
        assert!(!state.steps[2].is_optional);
    }

    #[tokio::test]
    async fn test_go_to_locked_step_is_blocked() {
        let stepper = stepper(3);
        let before = stepper.snapshot();

        let outcome = stepper.go_to_step(2, NavigationArgs::new()).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Blocked(AccessDenied::StepLocked { target: 2 }));
        assert_eq!(stepper.current_step(), 0);

        let after = stepper.snapshot();
        assert_eq!(after.errors.len(), 1);
        assert_eq!(after.errors[0].step_index, 0);
        assert!(after.errors[0].message.contains("not accessible"));
        assert_eq!(after.steps, before.steps);
    }

    #[tokio::test]
    async fn test_go_to_without_access_validation() {
        let stepper = stepper(4);
        stepper.update_config(NavigationConfigUpdate::new().validate_access(false));

        let outcome = stepper.go_to_step(2, NavigationArgs::new()).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Moved { from: 0, to: 2 });

        let state = stepper.snapshot();
        assert!(state.steps[0].is_completed);
        assert!(state.steps[2].can_access);
        // Progress is measured against the destination index
        assert_eq!(state.general_info.current_progress, 0.5);
    }

    #[tokio::test]
    async fn test_go_to_missing_step() {
        let stepper = stepper(3);
        let before = stepper.snapshot();

        let err = stepper.go_to_step(3, NavigationArgs::new()).await.unwrap_err();
        assert_eq!(err, StepperError::StepNotFound { target: 3, total: 3 });
        assert!(Arc::ptr_eq(&before, &stepper.snapshot()));
    }

    #[tokio::test]
    async fn test_go_to_current_step_is_noop() {
        let stepper = stepper(3);
        let before = stepper.snapshot();

        let outcome = stepper.go_to_step(0, NavigationArgs::new()).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Unchanged);
        assert!(Arc::ptr_eq(&before, &stepper.snapshot()));
    }

    #[tokio::test]
    async fn test_go_back_skips_access_check() {
        let stepper = stepper(3);
        stepper.on_next(NavigationArgs::new()).await;
        stepper.on_next(NavigationArgs::new()).await;
        stepper
            .update_steps(vec![StepUpdate::new(0, FlagPatch::new().can_access(false))])
            .unwrap();

        let outcome = stepper.go_to_step(0, NavigationArgs::new()).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Moved { from: 2, to: 0 });
        assert_eq!(stepper.snapshot().general_info.current_progress, 0.0);
    }

    #[tokio::test]
    async fn test_callback_receives_committed_state() {
        let stepper = stepper(3);
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);

        stepper
            .on_next(NavigationArgs::new().on_complete_step(move |state| async move {
                *sink.lock() = Some(state.general_info.current_progress);
                Ok(())
            }))
            .await;

        assert_eq!(*seen.lock(), Some(1.0 / 3.0));
    }

    #[tokio::test]
    async fn test_callback_failure_does_not_advance() {
        let stepper = stepper(3);

        let outcome = stepper
            .on_next(
                NavigationArgs::new()
                    .on_complete_step(|_| async { Err(anyhow::anyhow!("server rejected step")) }),
            )
            .await;

        assert!(matches!(outcome, NavigationOutcome::Failed { ref reason } if reason.contains("server rejected")));
        assert_eq!(stepper.current_step(), 0);
        assert!(!stepper.is_loading());
        // The composed state was committed before the callback ran
        assert!(stepper.snapshot().steps[0].is_completed);
    }

    #[tokio::test]
    async fn test_invalid_status_update_is_swallowed() {
        let stepper = stepper(3);
        let before = stepper.snapshot();

        let outcome = stepper
            .on_next(
                NavigationArgs::new()
                    .update_steps_status(vec![StepUpdate::new(9, FlagPatch::new().can_edit(true))]),
            )
            .await;

        assert!(matches!(outcome, NavigationOutcome::Failed { .. }));
        assert!(Arc::ptr_eq(&before, &stepper.snapshot()));
        assert_eq!(stepper.current_step(), 0);
    }

    #[tokio::test]
    async fn test_payload_kept_when_status_update_is_rejected() {
        let stepper = stepper(3);
        let patch: JsonPayload = serde_json::from_value(json!({ "email": "a@b" })).unwrap();

        let outcome = stepper
            .on_next(
                NavigationArgs::new()
                    .update_general_state(patch)
                    .update_steps_status(vec![StepUpdate::new(9, FlagPatch::new().can_edit(true))]),
            )
            .await;

        assert_eq!(
            outcome,
            NavigationOutcome::Failed {
                reason: "Invalid stepIndex: 9 (stepper has 3 steps)".to_string()
            }
        );
        let state = stepper.snapshot();
        assert_eq!(state.general_state["email"], "a@b");
        assert!(!state.steps[0].is_completed);
        assert_eq!(stepper.current_step(), 0);
    }

    #[tokio::test]
    async fn test_payload_delta_is_persisted_before_rejection() {
        let storage = MemoryStorage::new();
        let stepper: Stepper = Stepper::builder().storage(Arc::new(storage.clone())).build();
        stepper.initialize(StepperConfig::default());
        let patch: JsonPayload = serde_json::from_value(json!({ "plan": "pro" })).unwrap();

        stepper
            .on_next(
                NavigationArgs::new()
                    .update_general_state(patch)
                    .update_steps_status(vec![StepUpdate::new(7, FlagPatch::new())]),
            )
            .await;

        let saved: StepperState = StatePersistence::new(Arc::new(storage)).load().unwrap().unwrap();
        assert_eq!(saved.general_state["plan"], "pro");
    }

    #[tokio::test]
    async fn test_initialize_without_storage() {
        let stepper: Stepper = Stepper::default();
        assert!(!stepper.has_storage());

        let state = stepper.initialize(StepperConfig::default());
        assert_eq!(state.total_steps(), 4);
        assert!(stepper.config().save_local_storage);

        stepper.on_next(NavigationArgs::new()).await;
        assert_eq!(stepper.current_step(), 1);
    }

    #[tokio::test]
    async fn test_next_applies_payload_and_status_updates() {
        let stepper = stepper(3);
        let patch: JsonPayload = serde_json::from_value(json!({ "email": "ada@example.com" })).unwrap();

        stepper
            .on_next(
                NavigationArgs::new()
                    .update_general_state(patch)
                    .update_steps_status(vec![StepUpdate::new(2, FlagPatch::new().is_optional(true))]),
            )
            .await;

        let state = stepper.snapshot();
        assert_eq!(state.general_state["email"], "ada@example.com");
        assert!(state.steps[2].is_optional);
    }

    #[tokio::test]
    async fn test_concurrent_navigation_is_rejected() {
        let stepper = stepper(3);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let stepper = stepper.clone();
            tokio::spawn(async move {
                stepper
                    .on_next(NavigationArgs::new().on_complete_step(move |_| async move {
                        let _ = release_rx.await;
                        Ok(())
                    }))
                    .await
            })
        };

        while !stepper.is_loading() {
            tokio::task::yield_now().await;
        }
        assert_eq!(stepper.on_next(NavigationArgs::new()).await, NavigationOutcome::Busy);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), NavigationOutcome::Moved { from: 0, to: 1 });
        assert!(!stepper.is_loading());
    }

    #[tokio::test]
    async fn test_loading_events_bracket_navigation() {
        let stepper = stepper(2);
        let (rx, _id) = stepper.event_bus().subscribe();

        stepper.on_next(NavigationArgs::new()).await;

        let loading: Vec<bool> = rx
            .try_iter()
            .filter_map(|e| match e {
                StepperEvent::LoadingChanged { loading } => Some(loading),
                _ => None,
            })
            .collect();
        assert_eq!(loading, vec![true, false]);
    }
}
