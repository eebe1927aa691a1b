//! Memory-resident store of recent chunks
//!
//! Keeps, for every `(series, tier)`, the most recent chunks of that tier.
//! When a point opens a new chunk the previous one is finished and the
//! oldest chunks beyond the tier's `resident_chunks` are evicted, so the
//! store always covers roughly the resident span the planner budgets for.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::StorageError;
use crate::storage::chunk::Chunk;
use crate::storage::PointSource;
use crate::types::{align_down, Point, SeriesKey, TierIndex, TierSet, Timestamp, RAW_TIER};

/// Chunk layout of one tier inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TierLayout {
    chunk_span: u32,
    resident_chunks: usize,
}

/// In-memory point source
pub struct MemoryStore {
    layouts: Vec<TierLayout>,
    series: RwLock<HashMap<(SeriesKey, TierIndex), VecDeque<Chunk>>>,
}

impl MemoryStore {
    /// Build a store for a tier set
    ///
    /// Raw chunks span `raw_chunk_span` seconds and as many of them are kept
    /// as needed to cover the raw resident span.
    pub fn new(tiers: &TierSet, raw_chunk_span: u32) -> Self {
        let raw_span = raw_chunk_span.max(1);
        let mut layouts = vec![TierLayout {
            chunk_span: raw_span,
            resident_chunks: tiers.raw_resident_span.div_ceil(raw_span).max(1) as usize,
        }];
        layouts.extend(tiers.rollups.iter().map(|t| TierLayout {
            chunk_span: t.chunk_span.max(1),
            resident_chunks: t.resident_chunks.max(1) as usize,
        }));

        Self {
            layouts,
            series: RwLock::new(HashMap::new()),
        }
    }

    fn layout(&self, tier: TierIndex) -> Result<TierLayout, StorageError> {
        self.layouts
            .get(tier)
            .copied()
            .ok_or(StorageError::UnknownTier(tier))
    }

    /// Add a point to a series at a tier
    ///
    /// # Errors
    ///
    /// * `UnknownTier` - the tier is not part of the store
    /// * `OutOfOrder` - the point is not newer than the last one
    pub fn add(
        &self,
        key: &str,
        tier: TierIndex,
        ts: Timestamp,
        value: f64,
    ) -> Result<(), StorageError> {
        let layout = self.layout(tier)?;
        let t0 = align_down(ts, layout.chunk_span);

        let mut series = self.series.write();
        let chunks = series.entry((key.to_string(), tier)).or_default();

        match chunks.back_mut() {
            Some(current) if current.t0 == t0 => return current.push(ts, value),
            Some(current) if current.t0 > t0 => {
                return Err(StorageError::OutOfOrder {
                    ts,
                    last_ts: current.last_ts,
                })
            },
            Some(current) => current.finish(),
            None => {},
        }

        let mut chunk = Chunk::new(t0);
        chunk.push(ts, value)?;
        chunks.push_back(chunk);

        while chunks.len() > layout.resident_chunks {
            if let Some(evicted) = chunks.pop_front() {
                trace!(key, tier, t0 = evicted.t0, "Evicted chunk");
            }
        }
        Ok(())
    }

    /// Add a raw point
    pub fn add_raw(&self, key: &str, ts: Timestamp, value: f64) -> Result<(), StorageError> {
        self.add(key, RAW_TIER, ts, value)
    }

    /// Number of series/tier pairs held
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    /// Whether the store holds no series
    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }
}

#[async_trait]
impl PointSource for MemoryStore {
    async fn fetch(
        &self,
        key: &str,
        tier: TierIndex,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Point>, StorageError> {
        self.layout(tier)?;

        let series = self.series.read();
        let Some(chunks) = series.get(&(key.to_string(), tier)) else {
            return Ok(Vec::new());
        };

        Ok(chunks
            .iter()
            .flat_map(|c| c.range(from, to).iter().copied())
            .collect())
    }

    fn oldest_resident(&self, key: &str, tier: TierIndex) -> Option<Timestamp> {
        self.series
            .read()
            .get(&(key.to_string(), tier))
            .and_then(|chunks| chunks.front())
            .map(|c| c.t0)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TierDescriptor;

    fn store() -> MemoryStore {
        MemoryStore::new(&TierSet::new(1200, vec![TierDescriptor::new(60, 600, 2)]), 600)
    }

    #[tokio::test]
    async fn test_add_and_fetch() {
        let store = store();
        for ts in (0..600).step_by(10) {
            store.add_raw("a", ts, ts as f64).unwrap();
        }
        let points = store.fetch("a", RAW_TIER, 100, 200).await.unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], Point::new(100.0, 100));
        assert!(store.fetch("missing", RAW_TIER, 0, 600).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evicts_oldest_chunks() {
        let store = store();
        for ts in (0..2400).step_by(10) {
            store.add_raw("a", ts, 1.0).unwrap();
        }
        // two raw chunks of 600s cover the 1200s resident span
        assert_eq!(store.oldest_resident("a", RAW_TIER), Some(1200));
        let points = store.fetch("a", RAW_TIER, 0, 2400).await.unwrap();
        assert_eq!(points.first().map(|p| p.timestamp), Some(1200));
        assert_eq!(points.len(), 120);
    }

    #[tokio::test]
    async fn test_fetch_spans_chunks() {
        let store = store();
        for ts in (0..1200).step_by(60) {
            store.add("a", 1, ts, ts as f64).unwrap();
        }
        let points = store.fetch("a", 1, 540, 720).await.unwrap();
        let ts: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(ts, vec![540, 600, 660]);
    }

    #[test]
    fn test_rejects_old_points() {
        let store = store();
        store.add_raw("a", 700, 1.0).unwrap();
        assert!(matches!(
            store.add_raw("a", 100, 1.0),
            Err(StorageError::OutOfOrder { ts: 100, last_ts: 700 })
        ));
        assert!(store.add_raw("a", 700, 1.0).is_err());
    }

    #[test]
    fn test_unknown_tier() {
        let store = store();
        assert!(matches!(store.add("a", 5, 0, 1.0), Err(StorageError::UnknownTier(5))));
        assert_eq!(store.oldest_resident("a", 5), None);
    }
}
