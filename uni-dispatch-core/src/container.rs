//! The unidirectional container: one dispatch path, one store, many side effects
//!
//! ```text
//! dispatch ──► queue ──► processing loop ──► ActionBus ──► side effects
//!                             │                               │
//!                             ▼                               │
//!                        StateStore ──► observers             │
//!                             ▲                               │
//!                             └──────── derived actions ◄─────┘
//! ```
//!
//! Every action, whether it came from the host or from a side effect, goes
//! through the same queue. The processing loop takes one action at a time,
//! publishes it on the bus and then applies it to the store, so cascades are
//! processed in the order they were dispatched.
//!
//! # Example
//!
//! ```ignore
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

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::bus::{ActionBus, ActionStream};
use crate::config::ContainerConfig;
use crate::effect::{self, SideEffect};
use crate::error::{Error, Result};
use crate::store::{ComposedMiddleware, Middleware, Reducer, StateStream, StateStore};
use crate::Action;

/// Lifecycle of a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Accepting and processing actions
    Running,
    /// Shut down by the host
    Disposed,
    /// Stopped after the reducer panicked
    Failed,
}

/// Cloneable handle for feeding actions into a running container.
///
/// Side effects and subscriptions hold one of these. Dispatching never blocks
/// and is safe from any thread.
pub struct Dispatcher<A> {
    tx: mpsc::UnboundedSender<A>,
    cancel: CancellationToken,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<A: Action> Dispatcher<A> {
    /// Enqueue an action for processing.
    ///
    /// Returns [`Error::Disposed`] once the container stopped.
    pub fn dispatch(&self, action: A) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Disposed);
        }
        self.tx.send(action).map_err(|_| Error::Disposed)
    }

    /// Whether the container behind this handle stopped accepting actions.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

#[cfg(test)]
impl<A> Dispatcher<A> {
    /// A dispatcher feeding a bare channel instead of a container.
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<A>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            tx,
            cancel: CancellationToken::new(),
        };
        (dispatcher, rx)
    }
}

impl<A> std::fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Collects the reducer, side effects and middleware of a container.
///
/// Registration is only possible before [`start`](ContainerBuilder::start),
/// which consumes the builder.
pub struct ContainerBuilder<S, A: Action> {
    initial: S,
    reducer: Option<Reducer<S, A>>,
    reducer_registrations: usize,
    effects: Vec<Box<dyn SideEffect<A>>>,
    middleware: ComposedMiddleware<A>,
    config: ContainerConfig,
}

impl<S, A> ContainerBuilder<S, A>
where
    S: Clone + PartialEq + Send + 'static,
    A: Action,
{
    fn new(initial: S) -> Self {
        Self {
            initial,
            reducer: None,
            reducer_registrations: 0,
            effects: Vec::new(),
            middleware: ComposedMiddleware::new(),
            config: ContainerConfig::default(),
        }
    }

    /// Register the reducer. A container has exactly one.
    pub fn with_reducer<R>(mut self, reducer: R) -> Self
    where
        R: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        self.reducer_registrations += 1;
        if self.reducer.is_none() {
            self.reducer = Some(Box::new(reducer));
        }
        self
    }

    /// Register a side effect. Effects are subscribed in registration order.
    pub fn add_side_effect<E>(mut self, effect: E) -> Self
    where
        E: SideEffect<A>,
    {
        self.effects.push(Box::new(effect));
        self
    }

    /// Add middleware around every reduce.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<A> + Send + 'static,
    {
        self.middleware.add(middleware);
        self
    }

    /// Replace the runtime settings.
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start processing.
    ///
    /// Every side effect is subscribed to the action bus before this returns,
    /// so it sees every action dispatched afterwards. Must be called within a
    /// tokio runtime.
    pub fn start(self) -> Result<Container<S, A>> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::NoRuntime);
        }
        if self.reducer_registrations > 1 {
            return Err(Error::ReducerAlreadySet);
        }
        let reducer = self.reducer.ok_or(Error::MissingReducer)?;

        let config = self.config;
        let span = tracing::info_span!("container", label = %config.label);
        let store = Arc::new(StateStore::from_parts(
            self.initial,
            reducer,
            Box::new(self.middleware),
        ));
        let bus = ActionBus::new();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            tx,
            cancel: cancel.clone(),
        };
        let (status, _) = watch::channel(ContainerStatus::Running);
        let status = Arc::new(status);

        let effect_count = self.effects.len();
        let mut effects = JoinSet::new();
        {
            let _enter = span.enter();
            for (index, side_effect) in self.effects.into_iter().enumerate() {
                let derived = side_effect.observe(bus.subscribe());
                effects.spawn(
                    effect::drive(index, derived, dispatcher.clone(), cancel.clone())
                        .instrument(tracing::Span::current()),
                );
            }
            tracing::info!(effects = effect_count, "Container started");
        }

        let supervisor = tokio::spawn(supervise(effects).instrument(span.clone()));
        let processing = tokio::spawn(
            process(rx, bus.clone(), store.clone(), cancel.clone(), status.clone())
                .instrument(span.clone()),
        );

        Ok(Container {
            store,
            bus,
            dispatcher,
            cancel,
            status,
            processing: Some(processing),
            supervisor: Some(supervisor),
            config,
            span,
        })
    }
}

impl<S, A: Action> std::fmt::Debug for ContainerBuilder<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("has_reducer", &self.reducer.is_some())
            .field("effects", &self.effects.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Processing loop: one action at a time, bus first, then the store.
async fn process<S, A>(
    mut rx: mpsc::UnboundedReceiver<A>,
    bus: ActionBus<A>,
    store: Arc<StateStore<S, A>>,
    cancel: CancellationToken,
    status: Arc<watch::Sender<ContainerStatus>>,
) -> Result<()>
where
    S: Clone + PartialEq + Send + 'static,
    A: Action,
{
    loop {
        let action = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(action) => action,
                None => break,
            },
        };

        tracing::debug!(action = %action.name(), "Processing action");
        bus.publish(action.clone());

        if let Err(err) = store.apply(action) {
            tracing::error!(error = %err, "Container stopped");
            status.send_replace(ContainerStatus::Failed);
            cancel.cancel();
            bus.close();
            store.close();
            return Err(err);
        }
    }
    Ok(())
}

/// Wait for side effect tasks, reporting panics without touching the others.
async fn supervise(mut effects: JoinSet<()>) {
    while let Some(joined) = effects.join_next().await {
        if let Err(err) = joined {
            if err.is_panic() {
                tracing::warn!("Side effect panicked; remaining effects keep running");
            }
        }
    }
}

/// A running unidirectional container.
///
/// Dropping the container disposes it without waiting for its tasks; call
/// [`dispose`](Container::dispose) to shut down gracefully.
pub struct Container<S, A: Action> {
    store: Arc<StateStore<S, A>>,
    bus: ActionBus<A>,
    dispatcher: Dispatcher<A>,
    cancel: CancellationToken,
    status: Arc<watch::Sender<ContainerStatus>>,
    processing: Option<JoinHandle<Result<()>>>,
    supervisor: Option<JoinHandle<()>>,
    config: ContainerConfig,
    span: tracing::Span,
}

impl<S, A> Container<S, A>
where
    S: Clone + PartialEq + Send + 'static,
    A: Action,
{
    /// Start building a container around `initial`.
    pub fn builder(initial: S) -> ContainerBuilder<S, A> {
        ContainerBuilder::new(initial)
    }

    /// Enqueue an action. Returns [`Error::Disposed`] once the container stopped.
    pub fn dispatch(&self, action: A) -> Result<()> {
        self.dispatcher.dispatch(action)
    }

    /// A cloneable handle for dispatching from other tasks or threads.
    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.dispatcher.clone()
    }

    /// Observe the state. The current state is always the first item.
    pub fn observe(&self) -> StateStream<S> {
        self.store.observe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> S {
        self.store.state()
    }

    /// Subscribe to actions processed from now on. Nothing is replayed.
    pub fn actions(&self) -> ActionStream<A> {
        self.bus.subscribe()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ContainerStatus {
        *self.status.borrow()
    }

    /// The settings this container was started with.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Wait until the container stops, either disposed or failed.
    pub async fn stopped(&self) {
        let mut rx = self.status.subscribe();
        let _ = rx.wait_for(|status| *status != ContainerStatus::Running).await;
    }

    /// Shut down: stop accepting actions, cancel side effects and wait for
    /// every task to end.
    ///
    /// Queued actions that were not processed yet are dropped. Effects still
    /// running after the configured shutdown timeout are aborted. Returns the
    /// reducer failure if the container stopped because of one.
    pub async fn dispose(mut self) -> Result<()> {
        self.shutdown();
        let timeout = self.config.shutdown_timeout();

        let mut outcome = Ok(());
        if let Some(mut processing) = self.processing.take() {
            match tokio::time::timeout(timeout, &mut processing).await {
                Ok(Ok(result)) => outcome = result,
                Ok(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Ok(Err(_)) => {}
                Err(_) => {
                    tracing::warn!(
                        parent: &self.span,
                        "Processing loop did not stop in time; aborting"
                    );
                    processing.abort();
                }
            }
        }

        if let Some(mut supervisor) = self.supervisor.take() {
            if tokio::time::timeout(timeout, &mut supervisor).await.is_err() {
                tracing::warn!(parent: &self.span, "Side effects did not stop in time; aborting");
                supervisor.abort();
            }
        }

        tracing::info!(parent: &self.span, status = ?self.status(), "Container disposed");
        outcome
    }
}

impl<S, A: Action> Container<S, A> {
    fn shutdown(&self) {
        self.cancel.cancel();
        self.status.send_if_modified(|status| {
            if *status == ContainerStatus::Running {
                *status = ContainerStatus::Disposed;
                true
            } else {
                false
            }
        });
        self.bus.close();
        self.store.close();
    }
}

impl<S, A: Action> Drop for Container<S, A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S, A: Action> std::fmt::Debug for Container<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("label", &self.config.label)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
