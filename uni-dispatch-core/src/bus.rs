//! Action bus for fanning dispatched actions out to side effects
//!
//! # Guarantees
//!
//! - **Every subscriber sees every action** published after it subscribed,
//!   in publish order
//! - **No replay**: actions published before `subscribe()` are never delivered
//! - **Per-subscriber buffering**: each subscriber owns an unbounded queue, so a
//!   slow side effect never blocks the reducer path or other subscribers

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::Action;

/// Broadcast bus distributing actions to every active subscriber.
///
/// Cloning the bus yields another handle to the same subscriber list.
///
/// # Example
///
/// ```ignore
/// let bus = ActionBus::new();
/// let mut actions = bus.subscribe();
///
/// bus.publish(MyAction::Refresh);
///
/// assert!(matches!(actions.next().await, Some(MyAction::Refresh)));
/// ```
pub struct ActionBus<A> {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<A>>>>,
}

impl<A> Clone for ActionBus<A> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<A: Action> ActionBus<A> {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Publish an action to all current subscribers.
    ///
    /// Subscribers whose stream has been dropped are pruned.
    /// Returns the number of subscribers that received the action.
    pub fn publish(&self, action: A) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(action.clone()).is_ok());
        subscribers.len()
    }

    /// Subscribe to actions published from now on.
    pub fn subscribe(&self) -> ActionStream<A> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        ActionStream { rx }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Drop every subscriber; their streams end after draining what was already queued.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}

impl<A: Action> Default for ActionBus<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for ActionBus<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBus")
            .field("subscriber_count", &self.subscribers.lock().len())
            .finish()
    }
}

/// Live stream of actions published on an [`ActionBus`].
pub struct ActionStream<A> {
    rx: mpsc::UnboundedReceiver<A>,
}

impl<A> ActionStream<A> {
    /// Receive the next action, or `None` once the bus closed this subscription.
    pub async fn recv(&mut self) -> Option<A> {
        self.rx.recv().await
    }
}

impl<A> Stream for ActionStream<A> {
    type Item = A;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<A>> {
        self.rx.poll_recv(cx)
    }
}

impl<A> std::fmt::Debug for ActionStream<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStream").finish_non_exhaustive()
    }
}
