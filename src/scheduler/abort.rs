use std::future::Future;

use tokio::sync::watch;

/// Owner side of a cancellation scope. Every signal handed out observes `abort`.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

/// Cheap, clonable view of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    /// A signal that never fires. Used for one-off requests outside any poll.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once aborted. A controller dropped without aborting never resolves.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        let fired = rx.wait_for(|aborted| *aborted).await.map(|_| ());
        if fired.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Runs `fut` unless the signal fires first; `None` means aborted.
    pub async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_aborted() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.aborted() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn race_yields_none_once_aborted() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let pending = tokio::spawn({
            let signal = signal.clone();
            async move { signal.race(tokio::time::sleep(Duration::from_secs(60))).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.abort();

        assert_eq!(pending.await.unwrap(), None);
        assert!(signal.is_aborted());
        assert_eq!(signal.race(async { 1 }).await, None);
    }

    #[tokio::test]
    async fn race_passes_output_through() {
        let controller = AbortController::new();
        assert_eq!(controller.signal().race(async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn never_signal_and_dropped_controller_do_not_fire() {
        let signal = AbortSignal::never();
        let out = signal
            .race(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            })
            .await;
        assert_eq!(out, Some("done"));

        let controller = AbortController::new();
        let orphan = controller.signal();
        drop(controller);
        assert!(!orphan.is_aborted());
        assert_eq!(orphan.race(async { 3 }).await, Some(3));
    }
}
