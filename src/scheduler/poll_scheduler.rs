//! Fixed-rate polling bound to a set of cancel keys.
//!
//! `schedule` fires the tick immediately and then every `delay`. Ticks run as
//! separate tasks, so a slow tick can overlap the next one. Changing the keys
//! or the delay aborts the running poll (and every in-flight tick) and starts
//! over with a fresh immediate tick. Re-scheduling with identical keys only
//! swaps in the newest callback.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::scheduler::abort::{AbortController, AbortSignal};

pub type TickFn = Arc<dyn Fn(AbortSignal) -> BoxFuture<'static, ()> + Send + Sync>;

struct ActivePoll<K> {
    keys: K,
    delay: Duration,
    tick: Arc<Mutex<TickFn>>,
    controller: AbortController,
    driver: JoinHandle<()>,
}

pub struct PollScheduler<K> {
    name: &'static str,
    active: Option<ActivePoll<K>>,
}

impl<K> PollScheduler<K> {
    pub fn new(name: &'static str) -> Self {
        Self { name, active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Aborts the running poll, if any.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.controller.abort();
            active.driver.abort();
            debug!(poll = self.name, "poll cancelled");
        }
    }
}

impl<K: PartialEq + Debug> PollScheduler<K> {
    /// `None` or a non-positive delay leaves the scheduler inert.
    pub fn schedule(&mut self, tick: TickFn, delay_ms: Option<i64>, keys: K) {
        let delay = delay_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms as u64));

        if let (Some(active), Some(delay)) = (&self.active, delay) {
            if active.keys == keys && active.delay == delay {
                let mut slot = match active.tick.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *slot = tick;
                return;
            }
        }

        self.cancel();
        let Some(delay) = delay else {
            debug!(poll = self.name, "polling disabled");
            return;
        };

        debug!(poll = self.name, ?keys, ?delay, "starting poll");
        let controller = AbortController::new();
        let slot = Arc::new(Mutex::new(tick));
        let driver = tokio::spawn(drive(self.name, delay, slot.clone(), controller.signal()));
        self.active = Some(ActivePoll {
            keys,
            delay,
            tick: slot,
            controller,
            driver,
        });
    }
}

impl<K> Drop for PollScheduler<K> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(
    name: &'static str,
    delay: Duration,
    tick: Arc<Mutex<TickFn>>,
    signal: AbortSignal,
) {
    let mut ticker = tokio::time::interval(delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = signal.aborted() => break,
            _ = ticker.tick() => {
                let callback = match tick.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                in_flight.spawn(callback(signal.clone()));
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(poll = name, error = ?e, "poll tick panicked");
                    }
                }
            }
        }
    }

    in_flight.abort_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(counter: Arc<AtomicUsize>) -> TickFn {
        Arc::new(move |_signal| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    fn count(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_at_fixed_rate() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new("test");
        scheduler.schedule(counting_tick(counter.clone()), Some(1_000), 1);

        advance(10).await;
        assert_eq!(count(&counter), 1);
        advance(2_000).await;
        assert_eq!(count(&counter), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_or_zero_delay_is_inert() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new("test");

        scheduler.schedule(counting_tick(counter.clone()), None, 1);
        assert!(!scheduler.is_active());
        scheduler.schedule(counting_tick(counter.clone()), Some(0), 1);
        assert!(!scheduler.is_active());

        advance(60_000).await;
        assert_eq!(count(&counter), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn key_change_aborts_in_flight_tick_and_restarts() {
        let completed = Arc::new(AtomicUsize::new(0));
        let restarted = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new("test");

        let slow: TickFn = {
            let completed = completed.clone();
            Arc::new(move |signal: AbortSignal| {
                let completed = completed.clone();
                async move {
                    let slept = signal
                        .race(tokio::time::sleep(Duration::from_secs(10)))
                        .await;
                    if slept.is_some() {
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                }
                .boxed()
            })
        };
        scheduler.schedule(slow, Some(60_000), "a");
        advance(100).await;

        scheduler.schedule(counting_tick(restarted.clone()), Some(60_000), "b");
        advance(10).await;
        assert_eq!(count(&restarted), 1);

        advance(20_000).await;
        assert_eq!(count(&completed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_keys_swap_callback_without_restart() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new("test");

        scheduler.schedule(counting_tick(first.clone()), Some(1_000), 7);
        advance(500).await;
        scheduler.schedule(counting_tick(second.clone()), Some(1_000), 7);
        advance(1_000).await;

        assert_eq!(count(&first), 1);
        assert_eq!(count(&second), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_polling() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new("test");
        scheduler.schedule(counting_tick(counter.clone()), Some(1_000), ());

        advance(1_500).await;
        assert_eq!(count(&counter), 2);

        drop(scheduler);
        advance(5_000).await;
        assert_eq!(count(&counter), 2);
    }
}
