use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::Context;

use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use tonic::Status;

/// The receiving side of a push source.
///
/// A well-behaved producer calls `on_value` zero or more times followed by at
/// most one of `on_complete` or `on_error`.
pub trait Observer<T>: Send + Sync {
    fn on_value(&self, value: T);
    fn on_complete(&self);
    fn on_error(&self, status: Status);
}

/// A shared handle to an observer, cloneable into producer tasks and callbacks.
pub type Subscriber<T> = Arc<dyn Observer<T>>;

type SubscribeFn<T> = Box<dyn FnOnce(Subscriber<T>) -> Subscription + Send>;

/// A push-style source of values.
///
/// A `PushStream` is a one-shot subscription factory: subscribing consumes it,
/// hands the producer a [`Subscriber`] and returns the live [`Subscription`].
pub struct PushStream<T> {
    subscribe: SubscribeFn<T>,
}

impl<T: Send + 'static> PushStream<T> {
    /// Create a source from a raw subscribe callback.
    ///
    /// The callback may emit synchronously, retain the subscriber for later
    /// emissions, or return a driven [`Subscription`] that performs the work
    /// when polled by the consumer.
    pub fn new<F>(subscribe: F) -> Self
    where
        F: FnOnce(Subscriber<T>) -> Subscription + Send + 'static,
    {
        Self {
            subscribe: Box::new(subscribe),
        }
    }

    /// Attach a subscriber, starting the source.
    pub fn subscribe(self, subscriber: Subscriber<T>) -> Subscription {
        (self.subscribe)(subscriber)
    }

    /// A source that emits `value` and completes immediately.
    pub fn once(value: T) -> Self {
        Self::new(move |subscriber| {
            subscriber.on_value(value);
            subscriber.on_complete();
            Subscription::empty()
        })
    }

    /// A source that completes without emitting.
    pub fn empty() -> Self {
        Self::new(|subscriber| {
            subscriber.on_complete();
            Subscription::empty()
        })
    }

    /// A source that fails without emitting.
    pub fn failed(status: Status) -> Self {
        Self::new(move |subscriber| {
            subscriber.on_error(status);
            Subscription::empty()
        })
    }

    /// A source that emits every item synchronously on subscribe, then completes.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Send + 'static,
    {
        Self::new(move |subscriber| {
            for item in items {
                subscriber.on_value(item);
            }
            subscriber.on_complete();
            Subscription::empty()
        })
    }

    /// A source that emits the future's value once it settles.
    ///
    /// A failed future completes the source with that failure and no emission.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Status>> + Send + 'static,
    {
        Self::new(move |subscriber| {
            Subscription::driven(async move {
                match future.await {
                    Ok(value) => {
                        subscriber.on_value(value);
                        subscriber.on_complete();
                    }
                    Err(status) => subscriber.on_error(status),
                }
            })
        })
    }

    /// A source fed by a stream that is polled inline by whoever consumes the
    /// subscription.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, Status>> + Send + 'static,
    {
        Self::new(move |subscriber| Subscription::driven(forward(stream, subscriber)))
    }
}

impl<T> fmt::Debug for PushStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushStream").finish_non_exhaustive()
    }
}

async fn forward<T, S>(stream: S, subscriber: Subscriber<T>)
where
    S: Stream<Item = Result<T, Status>>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => subscriber.on_value(value),
            Err(status) => {
                subscriber.on_error(status);
                return;
            }
        }
    }
    subscriber.on_complete();
}

/// The live link between a consumer and a push source.
///
/// Dropping the subscription cancels it: the teardown hook runs exactly once
/// and any inline driver is dropped.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
    driver: Option<BoxFuture<'static, ()>>,
}

impl Subscription {
    /// A subscription with a teardown hook.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
            driver: None,
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self {
            teardown: None,
            driver: None,
        }
    }

    /// A subscription whose producer work runs when the consumer polls it.
    pub fn driven<F>(driver: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            teardown: None,
            driver: Some(driver.boxed()),
        }
    }

    /// Add a teardown hook, running after any hook already attached.
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let combined: Box<dyn FnOnce() + Send> = match self.teardown.take() {
            Some(previous) => Box::new(move || {
                previous();
                teardown();
            }),
            None => Box::new(teardown),
        };
        self.teardown = Some(combined);
        self
    }

    /// Release the source.
    pub fn cancel(self) {
        drop(self);
    }

    /// Poll the inline driver, if any. Returns `true` when a driver was polled.
    pub(crate) fn poll_driver(&mut self, cx: &mut Context<'_>) -> bool {
        let Some(driver) = self.driver.as_mut() else {
            return false;
        };
        if driver.poll_unpin(cx).is_ready() {
            self.driver = None;
        }
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.driver = None;
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("has_teardown", &self.teardown.is_some())
            .field("driven", &self.driver.is_some())
            .finish()
    }
}
