//! Action trait for type-safe state transitions

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched into a container
///
/// Actions represent intents or events. They should be:
/// - Clone: every action is fanned out to the reducer and each side effect
/// - Debug: for debugging and logging
/// - Send + Sync + 'static: actions cross task boundaries
///
/// Use `#[derive(Action)]` from `uni-dispatch-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}

/// Human-readable one-line description of an action.
///
/// Every [`Action`] gets a `Debug`-based summary for free; the action log
/// stores it next to the name.
pub trait ActionSummary: Action {
    /// Short description including the payload.
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

impl<A: Action> ActionSummary for A {}
