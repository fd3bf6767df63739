//! Per-entrant critical sections.
//!
//! Operations on one referrer or one user run one at a time; operations on
//! different entrants run in parallel. Idle keys are dropped when the last
//! guard for them is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Table of async mutexes keyed by entrant id.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held critical section for one key.
pub struct KeyGuard {
    key: String,
    table: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = slot.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only counts the table and waiters.
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = table.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                table.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = KeyedLocks::new();
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("referrer").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .expect("other key must not wait");
        assert_eq!(a.key(), "a");
        assert_eq!(b.key(), "b");
        assert_eq!(locks.active_keys(), 2);
        drop(a);
        drop(b);
        assert_eq!(locks.active_keys(), 0);
    }
}
