/// Multi-step wizard module
///
/// Tracks which steps of a form flow are reachable, editable, optional and
/// completed, drives navigation between them and keeps a durable copy of the
/// state when asked to.
///
/// ## Architecture
///
/// ```text
/// Stepper (navigation engine, loading flag)
///   ├── StepActions (validated mutators, persistence)
///   │     └── StateStore (snapshot + current step index)
///   ├── StepperState (general info, step flags, payload, error log)
///   └── NavigationConfig (transition policies, access validation)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use stepper_state::wizard::{NavigationArgs, StepDefinition, Stepper};
///
/// let stepper: Stepper = Stepper::default();
/// stepper.set_steps_info(vec![
///     StepDefinition::new("Account").accessible(),
///     StepDefinition::new("Profile"),
///     StepDefinition::new("Review"),
/// ]);
///
/// stepper
///     .on_next(NavigationArgs::new().on_complete_step(|state| async move {
///         submit(&state.general_state).await
///     }))
///     .await;
/// assert_eq!(stepper.current_step(), 1);
/// ```
///
/// ## Progress
///
/// - `current_progress`: position of the current step over the total
/// - `completed_progress`: completed steps over the total
/// - `can_access_progress`: accessible steps over the total

pub mod actions;
pub mod flow;
pub mod persistence;
pub mod state;
pub mod steps;

// Re-export commonly used types
pub use actions::StepActions;
pub use flow::{NavigationArgs, NavigationOutcome, Stepper, StepperBuilder};
pub use persistence::{FileStorage, MemoryStorage, StatePersistence, StateStorage, STORAGE_KEY};
pub use state::{GeneralInfo, JsonPayload, Payload, StepError, StepperState};
pub use steps::{ActiveStep, FlagPatch, StepDefinition, StepFlags, StepUpdate};
