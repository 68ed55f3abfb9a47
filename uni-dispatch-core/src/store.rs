//! Single-writer state store with reducer pattern

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::Action;

/// A reducer computes the next state from the current state and an action.
///
/// Reducers must be pure: no dispatching, no I/O. Unhandled actions should
/// return `state.clone()`.
pub type Reducer<S, A> = Box<dyn Fn(&S, &A) -> S + Send + Sync>;

/// State container that applies a reducer under mutual exclusion.
///
/// Every [`apply`](StateStore::apply) runs middleware, reduce, store and
/// publish inside one critical section, so concurrent callers are linearized
/// and each state is computed from the immediately preceding one.
///
/// # Type Parameters
/// * `S` - The state type
/// * `A` - The action type (must implement `Action`)
///
/// # Example
/// ```ignore
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Counter {
///     value: i32,
/// }
///
/// #[derive(Action, Clone, Debug)]
/// enum CounterAction {
///     Increment,
/// }
///
/// let store = StateStore::new(Counter::default(), |state: &Counter, action: &CounterAction| {
///     match action {
///         CounterAction::Increment => Counter { value: state.value + 1 },
///     }
/// });
///
/// store.apply(CounterAction::Increment)?;
/// assert_eq!(store.state().value, 1);
/// ```
pub struct StateStore<S, A: Action> {
    inner: Mutex<StoreInner<S, A>>,
    reducer: Reducer<S, A>,
}

struct StoreInner<S, A> {
    state: S,
    observers: Vec<mpsc::UnboundedSender<S>>,
    middleware: Box<dyn Middleware<A> + Send>,
    closed: bool,
}

impl<S, A> StateStore<S, A>
where
    S: Clone + PartialEq + Send + 'static,
    A: Action,
{
    /// Create a new store with initial state and reducer
    pub fn new<R>(state: S, reducer: R) -> Self
    where
        R: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        Self::from_parts(state, Box::new(reducer), Box::new(NoopMiddleware))
    }

    /// Create a new store whose applications pass through `middleware`
    pub fn with_middleware<R, M>(state: S, reducer: R, middleware: M) -> Self
    where
        R: Fn(&S, &A) -> S + Send + Sync + 'static,
        M: Middleware<A> + Send + 'static,
    {
        Self::from_parts(state, Box::new(reducer), Box::new(middleware))
    }

    pub(crate) fn from_parts(
        state: S,
        reducer: Reducer<S, A>,
        middleware: Box<dyn Middleware<A> + Send>,
    ) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state,
                observers: Vec::new(),
                middleware,
                closed: false,
            }),
            reducer,
        }
    }

    /// Apply an action to the store
    ///
    /// Reduces, replaces the current state and publishes the new state to
    /// every observer, even when it equals the previous one.
    /// Returns `true` if the new state differs from the old one.
    ///
    /// If the reducer panics, the state is left untouched, nothing is
    /// published and [`Error::ReducerPanicked`] is returned. Middleware still
    /// gets its `after` call, with `state_changed == false`.
    pub fn apply(&self, action: A) -> Result<bool> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        inner.middleware.before(&action);

        let current = &inner.state;
        let reduced = panic::catch_unwind(AssertUnwindSafe(|| (self.reducer)(current, &action)));
        let next = match reduced {
            Ok(next) => next,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(action = %action.name(), %message, "Reducer panicked");
                inner.middleware.after(&action, false);
                return Err(Error::ReducerPanicked {
                    action: action.name(),
                    message,
                });
            }
        };

        let changed = next != inner.state;
        inner.state = next;

        let state = &inner.state;
        inner.observers.retain(|tx| tx.send(state.clone()).is_ok());

        inner.middleware.after(&action, changed);
        tracing::trace!(action = %action.name(), changed, "Action applied");
        Ok(changed)
    }

    /// Get a snapshot of the current state
    pub fn state(&self) -> S {
        self.inner.lock().state.clone()
    }

    /// Observe the state with replay-latest semantics
    ///
    /// The returned stream yields the current state first, then every state
    /// produced by later applications, without gaps or duplicates. Once the
    /// store is closed, the stream yields the final state and ends.
    pub fn observe(&self) -> StateStream<S> {
        let mut inner = self.inner.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(inner.state.clone());
        if !inner.closed {
            inner.observers.push(tx);
        }
        StateStream { rx }
    }

    /// Number of live state observers
    pub fn observer_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.observers.retain(|tx| !tx.is_closed());
        inner.observers.len()
    }
}

impl<S, A: Action> StateStore<S, A> {
    /// Stop publishing: current observers end once drained and later ones
    /// only receive the final state.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.observers.clear();
    }
}

impl<S, A: Action> std::fmt::Debug for StateStore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("observers", &self.inner.lock().observers.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Stream of state snapshots returned by [`StateStore::observe`].
pub struct StateStream<S> {
    rx: mpsc::UnboundedReceiver<S>,
}

impl<S> StateStream<S> {
    /// Wait for the next state, or `None` once the store stopped publishing.
    pub async fn recv(&mut self) -> Option<S> {
        self.rx.recv().await
    }

    /// Take the next already-published state without waiting.
    pub fn try_recv(&mut self) -> Option<S> {
        self.rx.try_recv().ok()
    }
}

impl<S> Stream for StateStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        self.rx.poll_recv(cx)
    }
}

impl<S> std::fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStream").finish_non_exhaustive()
    }
}

/// Middleware trait for intercepting actions
///
/// Implement this trait to add logging, metrics or other cross-cutting
/// concerns to the reduce path. Hooks run inside the store's critical
/// section, so they observe applications in their linearized order.
pub trait Middleware<A: Action> {
    /// Called before the action is handed to the reducer
    fn before(&mut self, action: &A);

    /// Called after the new state was stored and published
    fn after(&mut self, action: &A, state_changed: bool);
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<A: Action> Middleware<A> for NoopMiddleware {
    fn before(&mut self, _action: &A) {}
    fn after(&mut self, _action: &A, _state_changed: bool) {}
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before reducing
    pub log_before: bool,
    /// Whether to log after reducing
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn before(&mut self, action: &A) {
        if self.log_before {
            tracing::debug!(action = %action.name(), "Reducing action");
        }
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        if self.log_after {
            tracing::debug!(
                action = %action.name(),
                state_changed = state_changed,
                "Action reduced"
            );
        }
    }
}

/// Compose multiple middleware into a single middleware
pub struct ComposedMiddleware<A: Action> {
    middlewares: Vec<Box<dyn Middleware<A> + Send>>,
}

impl<A: Action> std::fmt::Debug for ComposedMiddleware<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<A: Action> Default for ComposedMiddleware<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> ComposedMiddleware<A> {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<A> + Send + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }
}

impl<A: Action> Middleware<A> for ComposedMiddleware<A> {
    fn before(&mut self, action: &A) {
        for middleware in &mut self.middlewares {
            middleware.before(action);
        }
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        // Reverse order for proper nesting
        for middleware in self.middlewares.iter_mut().rev() {
            middleware.after(action, state_changed);
        }
    }
}
