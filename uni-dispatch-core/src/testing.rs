//! Test utilities for containers, stores and side effects
//!
//! - [`StateRecorder`]: records a [`StateStream`] in the background so tests
//!   can wait for a condition on the full state history
//! - [`EffectHarness`]: drives a single side effect with hand-fed actions
//! - Assertion macros over emitted actions: [`assert_emitted!`],
//!   [`assert_not_emitted!`], [`find_emitted!`], [`count_emitted!`]
//! - Time control (`testing-time` feature): [`pause_time`], [`advance_time`],
//!   [`resume_time`]
//!
//! # Example
//!
//! ```ignore
//! use uni_dispatch::testing::{EffectHarness, StateRecorder};
//!
//! let recorder = StateRecorder::record(container.observe());
//! container.dispatch(PageAction::UpdatePageNum(5))?;
//! let history = recorder.wait_len(3, Duration::from_secs(1)).await;
//!
//! let mut harness = EffectHarness::new(bump_effect());
//! harness.send(PageAction::UpdatePageNum(5));
//! let emitted = harness.drain(Duration::from_millis(20)).await;
//! assert_emitted!(emitted, PageAction::SideEffectNum(8));
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_stream::StreamExt;

use crate::bus::ActionBus;
use crate::effect::{EffectStream, SideEffect};
use crate::store::StateStream;
use crate::Action;

/// Records every state of a [`StateStream`] on a background task.
pub struct StateRecorder<S> {
    history: Arc<Mutex<Vec<S>>>,
    progress: watch::Receiver<usize>,
    task: AbortHandle,
}

impl<S: Clone + Send + 'static> StateRecorder<S> {
    /// Start recording. Must be called within a tokio runtime.
    pub fn record(mut states: StateStream<S>) -> Self {
        let history = Arc::new(Mutex::new(Vec::new()));
        let (progress_tx, progress) = watch::channel(0);

        let sink = history.clone();
        let task = tokio::spawn(async move {
            while let Some(state) = states.recv().await {
                let len = {
                    let mut history = sink.lock();
                    history.push(state);
                    history.len()
                };
                progress_tx.send_replace(len);
            }
        });

        Self {
            history,
            progress,
            task: task.abort_handle(),
        }
    }

    /// Every state recorded so far, oldest first.
    pub fn history(&self) -> Vec<S> {
        self.history.lock().clone()
    }

    pub fn latest(&self) -> Option<S> {
        self.history.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Wait until `done` holds for the recorded history.
    ///
    /// Returns the history in `Ok` once the condition holds, or in `Err` when
    /// `timeout` elapses or the stream ends first.
    pub async fn wait_for<P>(&self, timeout: Duration, mut done: P) -> Result<Vec<S>, Vec<S>>
    where
        P: FnMut(&[S]) -> bool,
    {
        let mut progress = self.progress.clone();
        let _ = tokio::time::timeout(timeout, async {
            loop {
                progress.borrow_and_update();
                let finished = {
                    let history = self.history.lock();
                    done(&history)
                };
                if finished || progress.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;

        let history = self.history();
        if done(&history) {
            Ok(history)
        } else {
            Err(history)
        }
    }

    /// Wait until at least `len` states were recorded.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within `timeout`.
    pub async fn wait_len(&self, len: usize, timeout: Duration) -> Vec<S>
    where
        S: std::fmt::Debug,
    {
        match self.wait_for(timeout, |history| history.len() >= len).await {
            Ok(history) => history,
            Err(history) => panic!(
                "expected {len} recorded states within {timeout:?}, got {}: {history:?}",
                history.len()
            ),
        }
    }
}

impl<S> Drop for StateRecorder<S> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Drives one side effect in isolation.
///
/// Actions passed to [`send`](Self::send) reach the effect exactly as the
/// container's action bus would deliver them; its output is collected instead
/// of being dispatched.
pub struct EffectHarness<A: Action> {
    bus: ActionBus<A>,
    output: EffectStream<A>,
}

impl<A: Action> EffectHarness<A> {
    /// Subscribe `effect` to a fresh action bus.
    pub fn new<E: SideEffect<A>>(effect: E) -> Self {
        let bus = ActionBus::new();
        let output = Box::new(effect).observe(bus.subscribe());
        Self { bus, output }
    }

    /// Feed an action to the effect.
    pub fn send(&self, action: A) {
        self.bus.publish(action);
    }

    pub fn send_all(&self, actions: impl IntoIterator<Item = A>) {
        for action in actions {
            self.bus.publish(action);
        }
    }

    /// Next emitted action, or `None` if nothing arrives within `timeout`.
    pub async fn next(&mut self, timeout: Duration) -> Option<A> {
        tokio::time::timeout(timeout, self.output.next())
            .await
            .ok()
            .flatten()
    }

    /// Collect emitted actions until the effect stays quiet for `quiet`.
    pub async fn drain(&mut self, quiet: Duration) -> Vec<A> {
        let mut emitted = Vec::new();
        while let Some(action) = self.next(quiet).await {
            emitted.push(action);
        }
        emitted
    }

    /// End the input stream and collect everything the effect still emits.
    pub async fn finish(self) -> Vec<A> {
        let Self { bus, output } = self;
        bus.close();
        output.collect().await
    }
}

/// Pause tokio's clock. Timers only fire when time is advanced.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Move a paused clock forward, firing every timer that comes due.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: Duration) {
    tokio::time::advance(duration).await;
}

/// Let a paused clock run in real time again.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Assert that some action matching a pattern was emitted.
///
/// ```ignore
/// let emitted = harness.drain(Duration::from_millis(20)).await;
/// assert_emitted!(emitted, WikiAction::ArticleLoaded(_));
/// assert_emitted!(emitted, PageAction::SideEffectNum(n) if *n > 3);
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "no emitted action matches `{}`; emitted: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action matching a pattern was emitted.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "an emitted action matches `{}`; emitted: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// First emitted action matching a pattern, as an `Option<&A>`.
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Number of emitted actions matching a pattern.
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions
            .iter()
            .filter(|a| matches!(a, $pattern $(if $guard)?))
            .count()
    };
}
