/// Event types for the stepper
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers; the full state is read back from
/// the store, events only say what changed.

/// Stepper events
#[derive(Debug, Clone, PartialEq)]
pub enum StepperEvent {
    /// A new state snapshot was committed to the store
    StateCommitted { revision: u64 },

    /// The current step index changed
    CurrentStepChanged { from: usize, to: usize },

    /// A navigation started (`true`) or finished (`false`)
    LoadingChanged { loading: bool },

    /// A new entry was appended to the error log
    ErrorRecorded { step_index: usize, message: String },

    /// Saving or clearing the durable copy failed
    PersistenceFailed { message: String },
}

impl StepperEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            StepperEvent::StateCommitted { revision } => {
                format!("State committed (revision {})", revision)
            }
            StepperEvent::CurrentStepChanged { from, to } => {
                format!("Step changed: {} -> {}", from, to)
            }
            StepperEvent::LoadingChanged { loading } => {
                if *loading {
                    "Navigation started".to_string()
                } else {
                    "Navigation finished".to_string()
                }
            }
            StepperEvent::ErrorRecorded {
                step_index,
                message,
            } => {
                format!("Error on step {}: {}", step_index, message)
            }
            StepperEvent::PersistenceFailed { message } => {
                format!("Persistence failed: {}", message)
            }
        }
    }
}
