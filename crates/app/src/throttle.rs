//! Sample throttle — trailing-edge rate limiting of sensor samples.
//!
//! At most one sample leaves per interval: the most recent one received in
//! that window. Anything older is overwritten, never queued.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt as _};

/// Default emission interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Whether the throttle is attached to an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Idle,
    Active,
}

/// Drop-and-keep-latest buffer holding at most one pending sample.
#[derive(Debug)]
pub struct SampleThrottle<T> {
    state: ThrottleState,
    pending: Option<T>,
}

impl<T> Default for SampleThrottle<T> {
    fn default() -> Self {
        Self {
            state: ThrottleState::Idle,
            pending: None,
        }
    }
}

impl<T> SampleThrottle<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ThrottleState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = ThrottleState::Active;
    }

    /// Detach and discard any buffered sample.
    pub fn stop(&mut self) {
        self.state = ThrottleState::Idle;
        self.pending = None;
    }

    /// Buffer `sample`, replacing any older one. Ignored while idle.
    pub fn offer(&mut self, sample: T) -> bool {
        if self.state == ThrottleState::Idle {
            return false;
        }
        self.pending = Some(sample);
        true
    }

    /// Take the sample due at the end of the current window, if any.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }
}

/// An active, throttled sensor subscription.
///
/// Owns the timer task; dropping the handle without calling
/// [`stop`](Self::stop) leaves the task running until its source closes.
#[derive(Debug)]
pub struct SensorStreamHandle {
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SensorStreamHandle {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.task.is_finished()
    }

    /// Stop without waiting for the task to wind down.
    pub fn abort(&self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }

    /// Stop emitting. No sample is emitted once this returns.
    pub async fn stop(self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
        // The JoinError only says the task was cancelled.
        let _ = self.task.await;
    }
}

/// Spawn a task draining `source` and calling `emit` with at most one
/// sample per `interval`.
///
/// The first emission happens one full interval after spawning. The task
/// ends when `source` closes; a sample still buffered at that point is
/// discarded.
pub fn spawn<T, S, F, Fut>(interval: Duration, source: S, mut emit: F) -> SensorStreamHandle
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let period = interval.max(Duration::from_millis(1));
    let active = Arc::new(AtomicBool::new(true));
    let still_active = Arc::clone(&active);

    let task = tokio::spawn(async move {
        let mut throttle = SampleThrottle::new();
        throttle.start();

        let mut source = Box::pin(source);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                next = source.next() => match next {
                    Some(sample) => {
                        throttle.offer(sample);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let Some(sample) = throttle.take() else { continue };
                    if !still_active.load(Ordering::Acquire) {
                        break;
                    }
                    emit(sample).await;
                }
            }
        }

        throttle.stop();
        tracing::debug!("sample throttle detached");
    });

    SensorStreamHandle { active, task }
}
