//! Long-lived action sources feeding a container
//!
//! A subscription forwards a timer or a stream into a [`Dispatcher`] until it
//! is cancelled, its source ends, or the container stops accepting actions.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use uni_dispatch::subscriptions::Subscriptions;
//!
//! let mut subs = Subscriptions::new(container.dispatcher());
//!
//! // Refresh the article every 30 seconds
//! subs.interval("refresh", Duration::from_secs(30), || WikiAction::FetchRandomArticle);
//!
//! // Forward connectivity changes
//! subs.stream("network", network.changes().map(WikiAction::NetworkChanged));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use crate::container::Dispatcher;
use crate::Action;

/// Keyed set of running subscriptions. Dropping it aborts all of them.
pub struct Subscriptions<A> {
    dispatcher: Dispatcher<A>,
    running: HashMap<String, AbortHandle>,
}

impl<A: Action> Subscriptions<A> {
    pub fn new(dispatcher: Dispatcher<A>) -> Self {
        Self {
            dispatcher,
            running: HashMap::new(),
        }
    }

    /// Dispatch `make()` every `period`, starting one period from now.
    ///
    /// Replaces any subscription registered under the same key.
    pub fn interval<F>(&mut self, key: impl Into<String>, period: Duration, make: F) -> &mut Self
    where
        F: FnMut() -> A + Send + 'static,
    {
        let ticker = tokio::time::interval_at(Instant::now() + period, period);
        self.ticks(key.into(), ticker, make)
    }

    /// Like [`interval`](Self::interval), but the first action is dispatched right away.
    pub fn interval_immediate<F>(
        &mut self,
        key: impl Into<String>,
        period: Duration,
        make: F,
    ) -> &mut Self
    where
        F: FnMut() -> A + Send + 'static,
    {
        let ticker = tokio::time::interval(period);
        self.ticks(key.into(), ticker, make)
    }

    /// Dispatch every item of `source` until it ends.
    ///
    /// Replaces any subscription registered under the same key.
    pub fn stream<St>(&mut self, key: impl Into<String>, source: St) -> &mut Self
    where
        St: Stream<Item = A> + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let dispatcher = self.dispatcher.clone();
        let name = key.clone();
        let handle = tokio::spawn(async move {
            tokio::pin!(source);
            while let Some(action) = source.next().await {
                if dispatcher.dispatch(action).is_err() {
                    tracing::debug!(subscription = %name, "Container stopped; ending subscription");
                    return;
                }
            }
            tracing::trace!(subscription = %name, "Subscription source ended");
        });

        self.running.insert(key, handle.abort_handle());
        self
    }

    fn ticks<F>(&mut self, key: String, mut ticker: tokio::time::Interval, mut make: F) -> &mut Self
    where
        F: FnMut() -> A + Send + 'static,
    {
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.stream(key, IntervalStream::new(ticker).map(move |_| make()))
    }

    /// Cancel one subscription. Returns whether it was registered.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.running.remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every subscription.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.abort();
        }
    }

    /// Whether `key` is registered and its source is still running.
    pub fn is_active(&self, key: &str) -> bool {
        self.running
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of registered subscriptions, including ones whose source ended.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Keys of all registered subscriptions.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.running.keys().map(String::as_str)
    }
}

impl<A> Drop for Subscriptions<A> {
    fn drop(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.abort();
        }
    }
}

impl<A> std::fmt::Debug for Subscriptions<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("keys", &self.running.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Tick,
        Value(usize),
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Tick => "Tick",
                TestAction::Value(_) => "Value",
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_waits_one_period() {
        let (dispatcher, mut rx) = Dispatcher::detached();
        let mut subs = Subscriptions::new(dispatcher);

        subs.interval("tick", Duration::from_millis(100), || TestAction::Tick);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rx.try_recv().ok(), Some(TestAction::Tick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_immediate_emits_first_tick_now() {
        let (dispatcher, mut rx) = Dispatcher::detached();
        let mut subs = Subscriptions::new(dispatcher);

        subs.interval_immediate("tick", Duration::from_secs(60), || TestAction::Tick);

        let first = tokio::time::timeout(Duration::from_millis(1), rx.recv()).await;
        assert_eq!(first.ok().flatten(), Some(TestAction::Tick));
    }

    #[tokio::test]
    async fn test_stream_forwards_items_in_order() {
        let (dispatcher, mut rx) = Dispatcher::detached();
        let mut subs = Subscriptions::new(dispatcher);

        subs.stream("values", tokio_stream::iter((1..=3).map(TestAction::Value)));

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(
            seen,
            vec![TestAction::Value(1), TestAction::Value(2), TestAction::Value(3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (dispatcher, mut rx) = Dispatcher::detached();
        let mut subs = Subscriptions::new(dispatcher);

        subs.interval_immediate("tick", Duration::from_millis(10), || TestAction::Tick);
        assert!(subs.is_active("tick"));
        assert_eq!(rx.recv().await, Some(TestAction::Tick));

        assert!(subs.cancel("tick"));
        assert!(!subs.cancel("tick"));
        assert!(!subs.is_active("tick"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_replaces_subscription() {
        let (dispatcher, mut rx) = Dispatcher::detached();
        let mut subs = Subscriptions::new(dispatcher);
        let first_calls = Arc::new(AtomicUsize::new(0));

        let counted = first_calls.clone();
        subs.interval("poll", Duration::from_millis(10), move || {
            counted.fetch_add(1, Ordering::SeqCst);
            TestAction::Value(1)
        });
        subs.interval("poll", Duration::from_millis(10), || TestAction::Value(2));
        assert_eq!(subs.len(), 1);

        tokio::time::sleep(Duration::from_millis(55)).await;

        let mut got = Vec::new();
        while let Ok(action) = rx.try_recv() {
            got.push(action);
        }
        assert!(!got.is_empty());
        assert!(got.iter().all(|action| *action == TestAction::Value(2)));
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_and_drop() {
        let (dispatcher, _rx) = Dispatcher::<TestAction>::detached();
        let mut subs = Subscriptions::new(dispatcher);

        subs.interval("a", Duration::from_secs(10), || TestAction::Tick);
        subs.interval("b", Duration::from_secs(10), || TestAction::Tick);
        let mut keys: Vec<_> = subs.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);

        subs.cancel_all();
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_ends_when_container_disposed() {
        let container = Container::builder(0usize)
            .with_reducer(|count: &usize, _: &TestAction| count + 1)
            .start()
            .unwrap();
        let dispatcher = container.dispatcher();
        let mut subs = Subscriptions::new(dispatcher.clone());
        container.dispose().await.unwrap();

        subs.interval_immediate("tick", Duration::from_millis(5), || TestAction::Tick);
        tokio::time::timeout(Duration::from_secs(1), async {
            while subs.is_active("tick") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription kept running after dispose");

        assert_eq!(dispatcher.dispatch(TestAction::Tick), Err(Error::Disposed));
    }
}
