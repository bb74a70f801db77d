use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How a wait for a spider to finish ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// No request was left in flight
    Drained,

    /// Nothing happened for the whole idle timeout while requests were
    /// still outstanding
    IdleTimeout,
}

/// Counts requests in flight and signals progress
///
/// A request counts from the moment its task is spawned until its response
/// has been handled, which includes spawning the requests it discovered.
/// The count therefore only reaches zero once the frontier is exhausted.
pub(crate) struct InFlight {
    pending: Arc<watch::Sender<usize>>,
    activity: watch::Sender<u64>,
}

/// Decrements the in-flight count when dropped
pub(crate) struct InFlightGuard {
    pending: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl InFlight {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0usize);
        let (activity, _) = watch::channel(0u64);
        Self {
            pending: Arc::new(pending),
            activity,
        }
    }

    /// Registers a new request
    pub fn begin(&self) -> InFlightGuard {
        self.pending.send_modify(|n| *n += 1);
        InFlightGuard {
            pending: self.pending.clone(),
        }
    }

    /// Records progress, re-arming the idle timer of any waiter
    pub fn touch(&self) {
        self.activity.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Waits until nothing is in flight, or until neither the in-flight
    /// count nor the activity marker changed for `idle_timeout`
    pub async fn wait_idle(&self, idle_timeout: Duration) -> Completion {
        let mut pending = self.pending.subscribe();
        let mut activity = self.activity.subscribe();

        loop {
            if *pending.borrow_and_update() == 0 {
                return Completion::Drained;
            }

            tokio::select! {
                changed = pending.changed() => {
                    if changed.is_err() {
                        return Completion::Drained;
                    }
                }
                _ = activity.changed() => {}
                _ = tokio::time::sleep(idle_timeout) => {
                    return Completion::IdleTimeout;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_idle_with_nothing_pending() {
        let tracker = InFlight::new();
        assert_eq!(
            tracker.wait_idle(Duration::from_millis(10)).await,
            Completion::Drained
        );
    }

    #[tokio::test]
    async fn test_wait_idle_until_guards_dropped() {
        let tracker = Arc::new(InFlight::new());
        let first = tracker.begin();
        let second = tracker.begin();
        assert_eq!(tracker.pending(), 2);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(first);
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(second);
        });

        assert_eq!(
            tracker.wait_idle(Duration::from_secs(5)).await,
            Completion::Drained
        );
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_times_out_on_hung_request() {
        let tracker = InFlight::new();
        let _hung = tracker.begin();

        assert_eq!(
            tracker.wait_idle(Duration::from_millis(20)).await,
            Completion::IdleTimeout
        );
    }
}
