use thiserror::Error;

/// Flag names accepted in a step update
pub const VALID_FLAG_KEYS: [&str; 4] = ["canAccess", "canEdit", "isOptional", "isCompleted"];

/// Stepper errors using thiserror for structured error handling.
///
/// These errors signal programmer misuse of the stepper API (bad field names,
/// bad indices, bad navigation targets). They are returned to the caller and
/// never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepperError {
    #[error("Invalid data provided: {field}. Valid keys are: {}", VALID_FLAG_KEYS.join(", "))]
    InvalidField { field: String },

    #[error("Invalid stepIndex: {index} (stepper has {total} steps)")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("The step {target} does not exist. There are only {total} steps.")]
    StepNotFound { target: usize, total: usize },
}

/// Navigational conditions that are recorded in the error log instead of
/// being returned as errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// `on_prev` called on the first step
    #[error("You are already at the first step. There is no previous step.")]
    FirstStep,

    /// Forward jump to a step whose `can_access` flag is false
    #[error("The step {target} is not accessible because it has not been completed or is locked.")]
    StepLocked { target: usize },
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to access storage file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize stepper state")]
    Serialization(#[from] serde_json::Error),

    #[error("No storage directory available on this platform")]
    NoStorageDirectory,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No configuration directory available on this platform")]
    NoConfigDirectory,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = StepperError::IndexOutOfRange { index: 5, total: 3 };
        assert_eq!(err.to_string(), "Invalid stepIndex: 5 (stepper has 3 steps)");

        let err = StepperError::StepNotFound { target: 4, total: 3 };
        assert_eq!(
            err.to_string(),
            "The step 4 does not exist. There are only 3 steps."
        );
    }

    #[test]
    fn test_access_denied_messages() {
        let locked = AccessDenied::StepLocked { target: 2 };
        assert!(locked.to_string().contains("not accessible"));
        assert!(AccessDenied::FirstStep.to_string().contains("first step"));
    }

    #[test]
    fn test_access_denied_converts_to_anyhow() {
        let err: anyhow::Error = AccessDenied::StepLocked { target: 3 }.into();
        assert_eq!(
            err.to_string(),
            "The step 3 is not accessible because it has not been completed or is locked."
        );
        assert!(err.downcast_ref::<AccessDenied>().is_some());
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "read-only");
        let err = PersistenceError::Io {
            path: "/tmp/stepperState.json".to_string(),
            source: io_err,
        };

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Failed to access storage file: /tmp/stepperState.json"
        );
    }
}
