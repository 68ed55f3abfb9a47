//! Task-backed effect operators for asynchronous side effects
//!
//! Each operator consumes an input stream and, for every item a selector
//! accepts, runs a future on its own tokio task. The results come out of the
//! returned [`TaskStream`] as they complete.
//!
//! - [`switch_latest`]: a new match cancels the in-flight task (switch-map)
//! - [`debounce`]: like `switch_latest`, but waits first; a new match resets the timer
//! - [`merge_all`]: every match runs to completion concurrently
//!
//! Dropping a `TaskStream` aborts the driver and every task it still owns.
//! All operators spawn, so they must be called within a tokio runtime.
//!
//! # Example
//!
//! ```ignore
//! // Search-as-you-type: only query once input settles for 200ms
//! effect::debounce(actions, Duration::from_millis(200), |action| match action {
//!     Action::QueryChanged(q) => Some(async move { Action::DidSearch(search(&q).await) }),
//!     _ => None,
//! })
//! ```

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_stream::{Stream, StreamExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Policy {
    Switch,
    Debounce(Duration),
    Merge,
}

/// Output of the task-backed operators.
///
/// The stream ends once the input has ended and every accepted future has
/// delivered its result. A panic in the selector is resumed on the task
/// polling the stream.
pub struct TaskStream<O> {
    rx: mpsc::UnboundedReceiver<O>,
    driver: Option<JoinHandle<()>>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl<O> Stream for TaskStream<O> {
    type Item = O;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<O>> {
        let this = &mut *self;
        match this.rx.poll_recv(cx) {
            Poll::Ready(None) => {}
            other => return other,
        }

        // All senders are gone; the driver may still be unwinding.
        let Some(driver) = this.driver.as_mut() else {
            return Poll::Ready(None);
        };
        let joined = match Pin::new(driver).poll(cx) {
            Poll::Ready(joined) => joined,
            Poll::Pending => return Poll::Pending,
        };
        this.driver = None;
        if let Err(err) = joined {
            if err.is_panic() {
                panic::resume_unwind(err.into_panic());
            }
        }
        Poll::Ready(None)
    }
}

impl<O> Drop for TaskStream<O> {
    fn drop(&mut self) {
        if let Some(driver) = &self.driver {
            driver.abort();
        }
        self.in_flight.lock().abort_all();
    }
}

impl<O> std::fmt::Debug for TaskStream<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStream")
            .field(
                "driver_finished",
                &self.driver.as_ref().is_none_or(JoinHandle::is_finished),
            )
            .field("in_flight", &self.in_flight.lock().handles.len())
            .finish()
    }
}

/// Tasks spawned by a driver, shared with the stream that owns them.
#[derive(Default)]
struct InFlight {
    handles: Vec<AbortHandle>,
}

impl InFlight {
    fn push(&mut self, handle: AbortHandle) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

fn spawn_driver<I, O, S, F, Fut>(input: S, mut select: F, policy: Policy) -> TaskStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stream<Item = I> + Send + 'static,
    F: FnMut(I) -> Option<Fut> + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let in_flight = Arc::new(Mutex::new(InFlight::default()));

    let tasks = in_flight.clone();
    let driver = tokio::spawn(async move {
        tokio::pin!(input);

        while let Some(item) = input.next().await {
            if tx.is_closed() {
                return;
            }
            let Some(future) = select(item) else {
                continue;
            };

            let tx = tx.clone();
            let handle = tokio::spawn(async move {
                if let Policy::Debounce(wait) = policy {
                    tokio::time::sleep(wait).await;
                }
                let output = future.await;
                let _ = tx.send(output);
            });

            let mut owned = tasks.lock();
            if policy != Policy::Merge {
                owned.abort_all();
            }
            owned.push(handle.abort_handle());
        }
        // Tasks still running stay owned by the stream and finish or get
        // aborted with it.
    });

    TaskStream {
        rx,
        driver: Some(driver),
        in_flight,
    }
}

/// Run the selected future for the latest matching item, cancelling the previous one.
pub fn switch_latest<I, O, S, F, Fut>(input: S, select: F) -> TaskStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stream<Item = I> + Send + 'static,
    F: FnMut(I) -> Option<Fut> + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    spawn_driver(input, select, Policy::Switch)
}

/// Run the selected future once no further match arrived for `wait`.
///
/// Each match cancels the pending one and restarts the timer.
pub fn debounce<I, O, S, F, Fut>(input: S, wait: Duration, select: F) -> TaskStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stream<Item = I> + Send + 'static,
    F: FnMut(I) -> Option<Fut> + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    spawn_driver(input, select, Policy::Debounce(wait))
}

/// Run every selected future to completion, concurrently.
pub fn merge_all<I, O, S, F, Fut>(input: S, select: F) -> TaskStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stream<Item = I> + Send + 'static,
    F: FnMut(I) -> Option<Fut> + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    spawn_driver(input, select, Policy::Merge)
}
