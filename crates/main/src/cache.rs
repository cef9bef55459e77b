//! In-process cache for the court and group listings.
//!
//! Entries are plain data rather than rendered pages, since every page
//! carries the viewer's navigation bar.

use std::time::{Duration, Instant};

use db::{court::Court, group::Group};
use parking_lot::RwLock;

pub struct ListCache<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> ListCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The cached value, unless it has outlived the TTL.
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.read();
        match &*slot {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn put(&self, value: T) {
        *self.slot.write() = Some((Instant::now(), value));
    }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

/// Managed Rocket state.
pub struct PageCache {
    pub courts: ListCache<Vec<Court>>,
    pub groups: ListCache<Vec<Group>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            courts: ListCache::new(ttl),
            groups: ListCache::new(ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ListCache;

    #[test]
    fn cached_values_are_reused() {
        let cache = ListCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(), None);
        cache.put(vec![1, 2, 3]);
        for _ in 0..3 {
            assert_eq!(cache.get(), Some(vec![1, 2, 3]));
        }
        cache.put(vec![4]);
        assert_eq!(cache.get(), Some(vec![4]));
    }

    #[test]
    fn invalidation_forces_a_reload() {
        let cache = ListCache::new(Duration::from_secs(60));
        cache.put(1);
        assert_eq!(cache.get(), Some(1));
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn entries_expire() {
        let cache = ListCache::new(Duration::ZERO);
        cache.put("stale");
        assert_eq!(cache.get(), None);
    }
}
