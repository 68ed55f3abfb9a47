//! Side effects: declarative transforms from the action stream to derived actions
//!
//! A side effect receives its own [`ActionStream`] when the container starts
//! and returns a stream of actions. Every item it yields is dispatched back
//! into the container, where it is reduced like any other action and seen by
//! every side effect, including the one that produced it.
//!
//! # Example
//!
//! ```ignore
//! use tokio_stream::StreamExt;
//! use uni_dispatch::effect;
//!
//! // Synchronous mapping: UpdatePageNum(n) -> SideEffectNum(n + 3)
//! let bump = effect::filter_map(|action| match action {
//!     PageAction::UpdatePageNum(n) => Some(PageAction::SideEffectNum(n + 3)),
//!     _ => None,
//! });
//!
//! // Async service call with switch-to-latest semantics
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
//!
//! # Hazard
//!
//! Nothing stops a side effect from reacting to its own output. An effect that
//! maps `A -> A` without a terminating condition loops forever.

use std::pin::Pin;

use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::bus::ActionStream;
use crate::container::Dispatcher;
use crate::Action;

pub use crate::tasks::{debounce, merge_all, switch_latest, TaskStream};

/// Boxed stream of derived actions produced by a side effect.
pub type EffectStream<A> = Pin<Box<dyn Stream<Item = A> + Send + 'static>>;

/// A registered subscriber-transformer over the action stream.
///
/// Implemented for every `FnOnce(ActionStream<A>) -> impl Stream<Item = A>`,
/// so closures can be registered directly.
pub trait SideEffect<A: Action>: Send + 'static {
    /// Turn the action stream into a stream of derived actions.
    fn observe(self: Box<Self>, actions: ActionStream<A>) -> EffectStream<A>;
}

impl<A, F, St> SideEffect<A> for F
where
    A: Action,
    F: FnOnce(ActionStream<A>) -> St + Send + 'static,
    St: Stream<Item = A> + Send + 'static,
{
    fn observe(self: Box<Self>, actions: ActionStream<A>) -> EffectStream<A> {
        Box::pin((*self)(actions))
    }
}

/// Pin a closure's argument type so it can be registered as a side effect.
///
/// Useful when the closure body alone does not let inference pick `A`.
pub fn from_fn<A, F, St>(f: F) -> impl SideEffect<A>
where
    A: Action,
    F: FnOnce(ActionStream<A>) -> St + Send + 'static,
    St: Stream<Item = A> + Send + 'static,
{
    f
}

/// Side effect that maps matching actions synchronously and drops the rest.
pub fn filter_map<A, F>(f: F) -> impl SideEffect<A>
where
    A: Action,
    F: FnMut(A) -> Option<A> + Send + 'static,
{
    move |actions: ActionStream<A>| actions.filter_map(f)
}

/// Forward every action a side effect yields into the dispatch path.
///
/// Ends when the effect's stream completes, the container is disposed, or
/// `cancel` fires. Dropping the stream on exit cancels any work the effect
/// still has in flight.
pub(crate) async fn drive<A: Action>(
    index: usize,
    mut derived: EffectStream<A>,
    dispatcher: Dispatcher<A>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::trace!(effect = index, "Side effect cancelled");
                break;
            }
            next = derived.next() => match next {
                Some(action) => {
                    tracing::trace!(effect = index, action = %action.name(), "Side effect emitted");
                    if dispatcher.dispatch(action).is_err() {
                        break;
                    }
                }
                None => {
                    tracing::debug!(effect = index, "Side effect stream completed");
                    break;
                }
            }
        }
    }
}
