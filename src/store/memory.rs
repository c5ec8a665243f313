use std::num::NonZeroU64;
use std::sync::Arc;

use dashmap::DashMap;

use super::{BannerStatPoint, ClickStore, Result, StatPoint};
use crate::time::Timestamp;

type Key = (String, Timestamp);

/// A [ClickStore] that keeps every counter in memory.
///
/// Cloning is cheap and every clone shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    counters: Arc<DashMap<Key, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(banner, bucket)` counters that exist.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Current value of a single counter, if it exists.
    pub fn get(&self, banner: &str, bucket: Timestamp) -> Option<u64> {
        self.counters
            .get(&(banner.to_owned(), bucket))
            .map(|count| *count)
    }
}

impl ClickStore for MemoryStore {
    async fn increment(&self, banner: &str, bucket: Timestamp, delta: NonZeroU64) -> Result<()> {
        // the shard stays write-locked for the whole entry operation
        self.counters
            .entry((banner.to_owned(), bucket))
            .and_modify(|count| *count = count.saturating_add(delta.get()))
            .or_insert(delta.get());

        Ok(())
    }

    async fn range(&self, banner: &str, from: Timestamp, to: Timestamp) -> Result<Vec<StatPoint>> {
        let mut points: Vec<StatPoint> = self
            .counters
            .iter()
            .filter(|entry| {
                let (id, bucket) = entry.key();
                id == banner && from <= *bucket && *bucket < to
            })
            .map(|entry| StatPoint {
                bucket: entry.key().1,
                count: *entry.value(),
            })
            .collect();

        points.sort_by_key(|point| point.bucket);
        Ok(points)
    }

    async fn range_all(&self, from: Timestamp, to: Timestamp) -> Result<Vec<BannerStatPoint>> {
        let mut points: Vec<BannerStatPoint> = self
            .counters
            .iter()
            .filter(|entry| {
                let bucket = entry.key().1;
                from <= bucket && bucket < to
            })
            .map(|entry| BannerStatPoint {
                banner_id: entry.key().0.clone(),
                bucket: entry.key().1,
                count: *entry.value(),
            })
            .collect();

        points.sort_by(|a, b| (&a.banner_id, a.bucket).cmp(&(&b.banner_id, b.bucket)));
        Ok(points)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
