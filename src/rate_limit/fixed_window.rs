use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Expired windows are pruned once the map reaches this many keys, and
/// again each time it doubles in size after a prune
const PRUNE_THRESHOLD: usize = 10_000;

/// Counter state after one hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits counted in the current window, including this one
    pub count: u64,
    /// Time until the current window closes
    pub resets_in: Duration,
}

/// Backing store for fixed-window counters
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Count one hit against `key`, opening a window of length `window` if
    /// none is open
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit>;

    /// Forget the counter for `key`
    async fn reset(&self, key: &str) -> Result<()>;
}

/// Process-local counters
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: Mutex<Windows>,
}

#[derive(Default)]
struct Windows {
    map: HashMap<String, Window>,
    /// Map size that triggers the next prune
    next_prune: usize,
}

impl Windows {
    fn prune_if_grown(&mut self, now: Instant) {
        if self.map.len() < self.next_prune.max(PRUNE_THRESHOLD) {
            return;
        }
        self.map.retain(|_, w| w.resets_at > now);
        self.next_prune = (self.map.len() * 2).max(PRUNE_THRESHOLD);
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    resets_at: Instant,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.prune_if_grown(now);

        let entry = windows.map.entry(key.to_string()).or_insert(Window {
            count: 0,
            resets_at: now + window,
        });
        if entry.resets_at <= now {
            *entry = Window {
                count: 0,
                resets_at: now + window,
            };
        }
        entry.count += 1;

        Ok(WindowHit {
            count: entry.count,
            resets_in: entry.resets_at - now,
        })
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.windows.lock().await.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_counts_within_window() {
        let store = MemoryWindowStore::new();
        let window = Duration::from_secs(60);

        let first = store.hit("login:ip", window).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.resets_in, window);

        tokio::time::advance(Duration::from_secs(15)).await;
        let second = store.hit("login:ip", window).await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.resets_in, Duration::from_secs(45));

        tokio::time::advance(Duration::from_secs(45)).await;
        let third = store.hit("login:ip", window).await.unwrap();
        assert_eq!(third.count, 1);
        assert_eq!(third.resets_in, window);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_prunes_expired_windows() {
        let store = MemoryWindowStore::new();
        for i in 0..PRUNE_THRESHOLD {
            store.hit(&format!("k{}", i), Duration::from_secs(1)).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(2)).await;

        store.hit("fresh", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.windows.lock().await.map.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_windows_are_not_rescanned_on_every_hit() {
        let store = MemoryWindowStore::new();
        let window = Duration::from_secs(900);
        for i in 0..PRUNE_THRESHOLD {
            store.hit(&format!("live{}", i), window).await.unwrap();
        }

        store.hit("one_more", window).await.unwrap();
        assert_eq!(store.windows.lock().await.next_prune, PRUNE_THRESHOLD * 2);

        // Every window expires, but the map has not doubled yet
        tokio::time::advance(Duration::from_secs(901)).await;
        store.hit("another", window).await.unwrap();

        let windows = store.windows.lock().await;
        assert_eq!(windows.map.len(), PRUNE_THRESHOLD + 2);
        assert_eq!(windows.next_prune, PRUNE_THRESHOLD * 2);
    }
}
