use std::fmt::Debug;

use tracing::debug;

use crate::scheduler::abort::AbortController;
use crate::scheduler::poll_scheduler::{PollScheduler, TickFn};

/// A [`PollScheduler`] that still refreshes once per distinct key while
/// polling is switched off, so a view without auto-refresh is not left empty.
pub struct PollSlot<K> {
    name: &'static str,
    scheduler: PollScheduler<K>,
    one_shot: Option<(K, AbortController)>,
}

impl<K> PollSlot<K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            scheduler: PollScheduler::new(name),
            one_shot: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn cancel(&mut self) {
        self.scheduler.cancel();
        self.abort_one_shot();
    }

    fn abort_one_shot(&mut self) {
        if let Some((_, controller)) = self.one_shot.take() {
            controller.abort();
        }
    }
}

impl<K: PartialEq + Debug> PollSlot<K> {
    pub fn refresh(&mut self, tick: TickFn, delay_ms: Option<i64>, keys: K) {
        if delay_ms.is_some_and(|ms| ms > 0) {
            self.abort_one_shot();
            self.scheduler.schedule(tick, delay_ms, keys);
            return;
        }

        self.scheduler.cancel();
        if matches!(&self.one_shot, Some((previous, _)) if *previous == keys) {
            return;
        }
        self.abort_one_shot();

        debug!(poll = self.name, ?keys, "polling off, refreshing once");
        let controller = AbortController::new();
        tokio::spawn(tick(controller.signal()));
        self.one_shot = Some((keys, controller));
    }
}

impl<K> Drop for PollSlot<K> {
    fn drop(&mut self) {
        self.abort_one_shot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_tick(counter: Arc<AtomicUsize>) -> TickFn {
        Arc::new(move |_signal| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_once_per_key_while_polling_is_off() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut slot = PollSlot::new("test");

        slot.refresh(counting_tick(counter.clone()), None, 1);
        slot.refresh(counting_tick(counter.clone()), None, 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!slot.is_polling());

        slot.refresh(counting_tick(counter.clone()), Some(0), 2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn positive_delay_polls() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut slot = PollSlot::new("test");

        slot.refresh(counting_tick(counter.clone()), Some(1_000), 1);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(slot.is_polling());
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        slot.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
