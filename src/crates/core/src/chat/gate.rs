//! Per-thread mutual exclusion.
//!
//! At most one reconciliation pass may run per Slack thread: a second
//! trigger for the same thread waits for the in-flight pass before reading
//! conversation state. The guard releases the gate on every exit path.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ThreadGates {
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl ThreadGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a thread. Hold the returned guard for
    /// the whole pass, conversation build included.
    pub async fn acquire(&self, thread_ts: &str) -> OwnedMutexGuard<()> {
        let gate = self
            .gates
            .entry(thread_ts.to_string())
            .or_default()
            .clone();
        gate.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::ThreadGates;

    #[tokio::test]
    async fn same_thread_passes_are_serialized() {
        let gates = Arc::new(ThreadGates::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = {
            let gates = gates.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _guard = gates.acquire("111.222").await;
                order.lock().unwrap().push("first-start");
                tokio::time::sleep(Duration::from_millis(50)).await;
                order.lock().unwrap().push("first-end");
            })
        };

        // Give the first task time to take the gate.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let gates = gates.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _guard = gates.acquire("111.222").await;
                order.lock().unwrap().push("second-start");
            })
        };

        first.await.unwrap();
        second.await.unwrap();

        let order = order.lock().unwrap();
        assert_eq!(
            order.as_slice(),
            ["first-start", "first-end", "second-start"]
        );
    }

    #[tokio::test]
    async fn distinct_threads_do_not_block_each_other() {
        let gates = ThreadGates::new();
        let _held = gates.acquire("111.222").await;

        // A different thread's gate must be immediately available.
        tokio::time::timeout(Duration::from_millis(50), gates.acquire("333.444"))
            .await
            .expect("unrelated thread gate should not block");
    }
}
