/// Messaging module for the Command/Event split
///
/// - **Commands**: requests to change the stepper state (imperative)
/// - **Events**: notifications that the state changed (past tense, broadcast)
///
/// ## Architecture
///
/// ```text
/// ┌──────────┐   Command   ┌─────────────┐  replace  ┌────────────┐   Event   ┌───────────┐
/// │ Stepper  │ ──────────> │   reduce    │ ────────> │ StateStore │ ────────> │ Event Bus │
/// │ (engine) │             │ (pure fns)  │           │            │           │           │
/// └──────────┘             └─────────────┘           └────────────┘           └───────────┘
///                                                                                   │
///                                                                                   ▼
///                                                                          presentation layer
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// let (rx, _id) = bus.subscribe();
///
/// let stepper: Stepper = Stepper::builder().event_bus(bus).build();
/// stepper.set_steps_info(vec![StepDefinition::new("Account")]);
///
/// while let Ok(event) = rx.try_recv() {
///     println!("{}", event.description());
/// }
/// ```

pub mod bus;
pub mod commands;
pub mod events;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::StepperCommand;
pub use events::StepperEvent;
