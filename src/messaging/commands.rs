/// Command types for the stepper
///
/// Commands are requests to change the stepper state (imperative). Each one
/// is reduced against a snapshot by `wizard::actions::reduce`.
use crate::wizard::state::{Payload, StepperState};
use crate::wizard::steps::{StepDefinition, StepUpdate};

/// Stepper commands
#[derive(Debug)]
pub enum StepperCommand<P: Payload> {
    /// Replace the step sequence and reset totals and progress
    SetSteps { steps: Vec<StepDefinition> },

    /// Apply per-step flag overrides
    UpdateSteps { updates: Vec<StepUpdate> },

    /// Shallow-merge a patch into the user payload
    UpdateGeneralState { patch: P::Patch },

    /// Append an entry to the error log unless it is already present
    AddError { step_index: usize, message: String },

    /// Replace the whole state with a previously persisted one
    Restore { state: StepperState<P> },
}

impl<P: Payload> StepperCommand<P> {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            StepperCommand::SetSteps { steps } => format!("Set {} steps", steps.len()),
            StepperCommand::UpdateSteps { updates } => {
                let indices: Vec<usize> = updates.iter().map(|u| u.step_index).collect();
                format!("Update steps {:?}", indices)
            }
            StepperCommand::UpdateGeneralState { .. } => "Update general state".to_string(),
            StepperCommand::AddError {
                step_index,
                message,
            } => {
                format!("Add error on step {}: {}", step_index, message)
            }
            StepperCommand::Restore { state } => {
                format!("Restore state with {} steps", state.steps.len())
            }
        }
    }

    /// Whether committing this command should write the durable copy
    ///
    /// A restored state already is the durable copy.
    pub fn persists(&self) -> bool {
        !matches!(
            self,
            StepperCommand::SetSteps { .. } | StepperCommand::Restore { .. }
        )
    }
}
