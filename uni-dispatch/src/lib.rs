//! uni-dispatch: unidirectional state management with declarative side effects
//!
//! Actions flow one way. The host dispatches them, a pure reducer turns them
//! into new states, and side effects observe the action stream to derive
//! further actions, such as the results of asynchronous service calls.
//!
//! # Example
//! ```ignore
//! use uni_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug, PartialEq)]
//! enum PageAction {
//!     UpdatePageNum(i32),
//!     SideEffectNum(i32),
//! }
//!
//! let container = Container::builder(PageState::default())
//!     .with_reducer(reduce)
//!     .add_side_effect(effect::filter_map(|action| match action {
//!         PageAction::UpdatePageNum(n) => Some(PageAction::SideEffectNum(n + 3)),
//!         _ => None,
//!     }))
//!     .start()?;
//!
//! let mut states = container.observe();
//! container.dispatch(PageAction::UpdatePageNum(5))?;
//! ```

// Re-export everything from core
pub use uni_dispatch_core::*;

// Assertion macros for tests
pub use uni_dispatch_core::{assert_emitted, assert_not_emitted, count_emitted, find_emitted};

// Re-export derive macros
pub use uni_dispatch_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use uni_dispatch_core::{Action, ActionSummary, Middleware, SideEffect};

    // Runtime
    pub use uni_dispatch_core::effect;
    pub use uni_dispatch_core::{
        ActionStream, Container, ContainerConfig, ContainerStatus, Dispatcher, Error,
        StateStream,
    };

    // Middleware
    pub use uni_dispatch_core::{ActionLoggerConfig, ActionLoggerMiddleware, LoggingMiddleware};

    #[cfg(feature = "subscriptions")]
    pub use uni_dispatch_core::Subscriptions;

    // Derive macros
    pub use uni_dispatch_macros::Action;
}
