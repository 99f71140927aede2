/// State management module
///
/// Holds the live stepper state and current step index behind a shared,
/// lock-protected cell with subscriber notification.

pub mod store;

// Re-export commonly used types
pub use store::StateStore;
