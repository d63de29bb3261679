//! Push-to-pull bridging.
//!
//! [`bridge`] subscribes to a [`PushStream`] and exposes it as a
//! [`PullSequence`], a `futures::Stream` the consumer advances one step at a
//! time. Values are buffered in an unbounded FIFO queue and delivered in
//! emission order. A producer error surfaces only after every value emitted
//! before it has been yielded.
//!
//! The subscription is released exactly once, on exhaustion, on error, or when
//! the sequence is dropped early.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::FusedStream;
use futures::task::AtomicWaker;
use tonic::Status;
use tracing::{trace, warn};

use crate::stream::push::{Observer, PushStream, Subscriber, Subscription};

/// How, and whether, the push source has finished.
#[derive(Debug)]
enum Termination {
    Active,
    Completed,
    Errored(Status),
}

struct Emissions<T> {
    queue: VecDeque<T>,
    signal: Termination,
    late_events: usize,
}

struct Shared<T> {
    emissions: Mutex<Emissions<T>>,
    wake: AtomicWaker,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            emissions: Mutex::new(Emissions {
                queue: VecDeque::new(),
                signal: Termination::Active,
                late_events: 0,
            }),
            wake: AtomicWaker::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Emissions<T>> {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn step(&self) -> Step<T> {
        let mut emissions = self.lock();
        if let Some(value) = emissions.queue.pop_front() {
            return Step::Value(value);
        }
        match &emissions.signal {
            Termination::Active => Step::Pending,
            Termination::Completed => Step::Done,
            Termination::Errored(status) => Step::Error(status.clone()),
        }
    }

    /// Apply a producer event, returning `false` if the source already terminated.
    fn push(&self, event: impl FnOnce(&mut Emissions<T>)) -> bool {
        {
            let mut emissions = self.lock();
            if !matches!(emissions.signal, Termination::Active) {
                emissions.late_events += 1;
                return false;
            }
            event(&mut emissions);
        }
        self.wake.wake();
        true
    }
}

enum Step<T> {
    Value(T),
    Error(Status),
    Done,
    Pending,
}

/// The producer-facing half of a bridge.
struct BridgeObserver<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send> Observer<T> for BridgeObserver<T> {
    fn on_value(&self, value: T) {
        if !self.shared.push(|emissions| emissions.queue.push_back(value)) {
            warn!("Push source emitted a value after terminating, dropping it");
        }
    }

    fn on_complete(&self) {
        if !self
            .shared
            .push(|emissions| emissions.signal = Termination::Completed)
        {
            warn!("Push source completed after terminating, ignoring");
        }
    }

    fn on_error(&self, status: Status) {
        let message = status.message().to_owned();
        if !self
            .shared
            .push(|emissions| emissions.signal = Termination::Errored(status))
        {
            warn!(error = %message, "Push source failed after terminating, ignoring");
        }
    }
}

/// A pull-style view over a push source.
///
/// Each step yields the next buffered value, the source's error, or signals
/// exhaustion. Once an error or exhaustion has been reported the sequence is
/// finished and only returns `None`.
pub struct PullSequence<T> {
    shared: Arc<Shared<T>>,
    subscription: Option<Subscription>,
}

/// Subscribe to `source` and expose it as a pull sequence.
pub fn bridge<T: Send + 'static>(source: PushStream<T>) -> PullSequence<T> {
    let shared = Arc::new(Shared::new());
    let observer: Subscriber<T> = Arc::new(BridgeObserver {
        shared: Arc::clone(&shared),
    });
    let subscription = source.subscribe(observer);

    PullSequence {
        shared,
        subscription: Some(subscription),
    }
}

impl<T> PullSequence<T> {
    /// Number of producer events that arrived after the source terminated.
    pub fn late_events(&self) -> usize {
        self.shared.lock().late_events
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            trace!("Releasing push subscription");
            subscription.cancel();
        }
    }
}

impl<T> Stream for PullSequence<T> {
    type Item = Result<T, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(subscription) = this.subscription.as_mut() else {
            return Poll::Ready(None);
        };

        // Register before inspecting the queue so a concurrent push cannot be missed.
        this.shared.wake.register(cx.waker());

        let mut step = this.shared.step();
        if matches!(step, Step::Pending) && subscription.poll_driver(cx) {
            step = this.shared.step();
        }

        match step {
            Step::Value(value) => Poll::Ready(Some(Ok(value))),
            Step::Pending => Poll::Pending,
            Step::Error(status) => {
                this.release();
                Poll::Ready(Some(Err(status)))
            }
            Step::Done => {
                this.release();
                Poll::Ready(None)
            }
        }
    }
}

impl<T> FusedStream for PullSequence<T> {
    fn is_terminated(&self) -> bool {
        self.subscription.is_none()
    }
}

impl<T> Drop for PullSequence<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for PullSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullSequence")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A push source whose subscriber is kept by the test for manual emission.
    struct Manual<T> {
        subscriber: Arc<Mutex<Option<Subscriber<T>>>>,
        cancels: Arc<AtomicUsize>,
    }

    impl<T: Send + 'static> Manual<T> {
        fn new() -> (Self, PushStream<T>) {
            let subscriber = Arc::new(Mutex::new(None));
            let cancels = Arc::new(AtomicUsize::new(0));
            let slot = Arc::clone(&subscriber);
            let counter = Arc::clone(&cancels);
            let source = PushStream::new(move |s| {
                *slot.lock().unwrap() = Some(s);
                Subscription::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
            (
                Self {
                    subscriber,
                    cancels,
                },
                source,
            )
        }

        fn emit(&self) -> Subscriber<T> {
            self.subscriber.lock().unwrap().clone().unwrap()
        }

        fn cancels(&self) -> usize {
            self.cancels.load(Ordering::SeqCst)
        }
    }

    fn poll<T>(seq: &mut PullSequence<T>) -> Poll<Option<Result<T, Status>>> {
        let mut cx = Context::from_waker(std::task::Waker::noop());
        Pin::new(seq).poll_next(&mut cx)
    }

    #[test]
    fn test_synchronous_pushes_keep_order() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);

        let emit = manual.emit();
        for value in 1..=5 {
            emit.on_value(value);
        }
        emit.on_complete();

        for expected in 1..=5 {
            assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok(v))) if v == expected));
        }
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
    }

    #[test]
    fn test_values_across_suspensions_keep_order() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);
        let emit = manual.emit();

        assert!(poll(&mut seq).is_pending());
        emit.on_value("a");
        emit.on_value("b");
        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok("a")))));
        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok("b")))));
        assert!(poll(&mut seq).is_pending());
        emit.on_value("c");
        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok("c")))));
        emit.on_complete();
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
    }

    #[test]
    fn test_buffered_values_drain_before_error() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);
        let emit = manual.emit();

        emit.on_value(1);
        emit.on_error(Status::internal("boom"));

        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok(1)))));
        match poll(&mut seq) {
            Poll::Ready(Some(Err(status))) => assert_eq!(status.message(), "boom"),
            other => panic!("expected error, got {other:?}"),
        }
        // Nothing is delivered after the failure.
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
        assert!(seq.is_terminated());
    }

    #[test]
    fn test_empty_completion_yields_nothing() {
        let mut seq = bridge(PushStream::<u8>::empty());
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
    }

    #[test]
    fn test_cancel_once_on_early_abandon() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);
        let emit = manual.emit();

        emit.on_value(1);
        emit.on_value(2);
        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok(1)))));
        assert_eq!(manual.cancels(), 0);

        drop(seq);
        assert_eq!(manual.cancels(), 1);
    }

    #[test]
    fn test_cancel_once_on_exhaustion() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);
        let emit = manual.emit();

        emit.on_value(1);
        emit.on_complete();
        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Ok(1)))));
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
        assert_eq!(manual.cancels(), 1);

        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
        drop(seq);
        assert_eq!(manual.cancels(), 1);
    }

    #[test]
    fn test_cancel_once_on_error() {
        let (manual, source) = Manual::<u8>::new();
        let mut seq = bridge(source);
        manual.emit().on_error(Status::aborted("gone"));

        assert!(matches!(poll(&mut seq), Poll::Ready(Some(Err(_)))));
        drop(seq);
        assert_eq!(manual.cancels(), 1);
    }

    #[test]
    fn test_late_events_are_counted_not_delivered() {
        let (manual, source) = Manual::new();
        let mut seq = bridge(source);
        let emit = manual.emit();

        emit.on_complete();
        emit.on_value(9);
        emit.on_error(Status::internal("late"));

        assert_eq!(seq.late_events(), 2);
        assert!(matches!(poll(&mut seq), Poll::Ready(None)));
    }

    #[tokio::test]
    async fn test_inline_stream_source() {
        let source = PushStream::from_stream(futures::stream::iter(vec![
            Ok(1),
            Ok(2),
            Err(Status::internal("boom")),
            Ok(3),
        ]));
        let items: Vec<_> = bridge(source).collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &1);
        assert_eq!(items[1].as_ref().unwrap(), &2);
        assert_eq!(items[2].as_ref().unwrap_err().message(), "boom");
    }

    #[tokio::test]
    async fn test_deferred_value_through_bridge() {
        let source = PushStream::from_future(async {
            tokio::task::yield_now().await;
            Ok::<_, Status>("done")
        });
        let items: Vec<_> = bridge(source).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &"done");
    }

    #[test]
    fn test_inline_stream_runs_without_runtime() {
        let source = PushStream::from_stream(futures::stream::iter((0..100).map(Ok)));
        let values: Vec<i32> =
            futures::executor::block_on(bridge(source).map(|item| item.unwrap()).collect());
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_inline_producer_is_dropped_on_abandon() {
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let producer = async_stream::stream! {
            let _alive = alive_tx;
            yield Ok(1);
            futures::future::pending::<()>().await;
        };

        let mut seq = bridge(PushStream::from_stream(producer));
        assert_eq!(seq.next().await.unwrap().unwrap(), 1);
        drop(seq);

        // The sender goes away together with the dropped driver.
        assert!(alive_rx.await.is_err());
    }
}
