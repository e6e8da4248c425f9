//! Long-poll waiter set for `/wait`.
//!
//! Modelled as a set of one-shot completion handles: a tick iterates and
//! resolves all of them before releasing the store lock. Simpler than
//! per-agent condition variables and sufficient because every waiter wants
//! the same event (tick completed). The set is cleared on every tick so
//! stale entries never accumulate beyond one interval: a dropped `/wait`
//! connection just discards its eventual, unread response.

use tokio::sync::oneshot;

#[derive(Debug, Default)]
pub struct WaiterSet {
    inner: std::sync::Mutex<Vec<oneshot::Sender<()>>>,
}

impl WaiterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new waiter, returning the receiver half the caller
    /// awaits (with its own wall-clock cap of one tick interval).
    pub fn register(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).push(tx);
        rx
    }

    /// Release every registered waiter. Called once per tick, under the
    /// same critical section as the rest of the tick, so a waiter can never
    /// observe a half-applied tick.
    pub fn release_all(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        for tx in guard.drain(..) {
            let _ = tx.send(());
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_all_wakes_every_waiter() {
        let set = WaiterSet::new();
        let rx1 = set.register();
        let rx2 = set.register();
        assert_eq!(set.len(), 2);
        set.release_all();
        assert_eq!(set.len(), 0);
        rx1.await.unwrap();
        rx2.await.unwrap();
    }
}
