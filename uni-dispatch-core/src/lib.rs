//! Core types for uni-dispatch
//!
//! A unidirectional state-management runtime: actions go in through a single
//! dispatch path, a pure reducer produces the next state, and side effects
//! turn the action stream into further actions.
//!
//! # Core Concepts
//!
//! - **Action**: an immutable value describing an intent or an outcome
//! - **ActionBus**: broadcasts every processed action to side effects, no replay
//! - **StateStore**: holds the state, applies the reducer under mutual
//!   exclusion, and replays the latest state to new observers
//! - **SideEffect**: transforms the action stream into derived actions
//! - **Container**: wires the above together and owns their lifecycle
//!
//! # Basic Example
//!
//! ```ignore
//! use uni_dispatch_core::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum PageAction {
//!     UpdatePageNum(i32),
//!     SideEffectNum(i32),
//! }
//!
//! impl Action for PageAction {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             PageAction::UpdatePageNum(_) => "UpdatePageNum",
//!             PageAction::SideEffectNum(_) => "SideEffectNum",
//!         }
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct PageState {
//!     page: i32,
//!     side_effect: i32,
//! }
//!
//! fn reduce(state: &PageState, action: &PageAction) -> PageState {
//!     match action {
//!         PageAction::UpdatePageNum(n) => PageState { page: *n, ..state.clone() },
//!         PageAction::SideEffectNum(n) => PageState { side_effect: *n, ..state.clone() },
//!     }
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
//! container.dispatch(PageAction::UpdatePageNum(5))?;
//! // observers see {0, 0}, {5, 0}, {5, 8}
//! ```
//!
//! # Async Side Effects
//!
//! Service calls follow an intent/result pair of actions: the intent
//! (`FetchRandomArticle`) reaches a side effect, which runs the call and emits
//! the result (`ArticleLoaded` or `ArticleFailed`). The reducer only ever
//! sees plain values.
//!
//! ```ignore
//! let fetch = move |actions: ActionStream<WikiAction>| {
//!     effect::switch_latest(actions, move |action| match action {
//!         WikiAction::FetchRandomArticle => {
//!             let service = service.clone();
//!             Some(async move {
//!                 match service.random_article().await {
//!                     Ok(article) => WikiAction::ArticleLoaded(article),
//!                     Err(e) => WikiAction::ArticleFailed(e.to_string()),
//!                 }
//!             })
//!         }
//!         _ => None,
//!     })
//! };
//! ```

pub mod action;
pub mod bus;
pub mod config;
pub mod container;
pub mod effect;
pub mod error;
pub mod logger;
pub mod store;
#[cfg(feature = "subscriptions")]
pub mod subscriptions;
mod tasks;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionSummary};

// Runtime exports
pub use bus::{ActionBus, ActionStream};
pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder, ContainerStatus, Dispatcher};
pub use effect::{EffectStream, SideEffect, TaskStream};
pub use error::{Error, Result};

// Store exports
pub use store::{
    ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, StateStore,
    StateStream,
};

// Logger exports
pub use logger::{
    ActionLog, ActionLogConfig, ActionLogEntry, ActionLogHandle, ActionLoggerConfig,
    ActionLoggerMiddleware,
};

// Subscription exports (requires "subscriptions" feature)
#[cfg(feature = "subscriptions")]
pub use subscriptions::Subscriptions;

// Testing exports
pub use testing::{EffectHarness, StateRecorder};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionSummary};
    pub use crate::bus::{ActionBus, ActionStream};
    pub use crate::config::ContainerConfig;
    pub use crate::container::{Container, ContainerStatus, Dispatcher};
    pub use crate::effect::{self, EffectStream, SideEffect};
    pub use crate::error::Error;
    pub use crate::store::{LoggingMiddleware, Middleware, StateStore, StateStream};
    #[cfg(feature = "subscriptions")]
    pub use crate::subscriptions::Subscriptions;
}
