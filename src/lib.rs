//! Headless state engine for multi-step form wizards.
//!
//! See [`wizard::Stepper`] for the entry point.

pub mod config;
pub mod error;
pub mod messaging;
pub mod state;
pub mod wizard;

pub use config::{NavigationConfig, NavigationConfigUpdate, StepperConfig, TransitionPolicy};
pub use error::{AccessDenied, AppResult, StepperError};
pub use messaging::{EventBus, StepperEvent};
pub use wizard::{
    ActiveStep, FlagPatch, JsonPayload, NavigationArgs, NavigationOutcome, StepDefinition,
    StepUpdate, Stepper, StepperState,
};
