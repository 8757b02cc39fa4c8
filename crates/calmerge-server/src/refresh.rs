//! Refresh orchestration.
//!
//! One refresh cycle fetches every enabled source, builds a brand-new
//! [`CacheSnapshot`] and publishes it. The scheduler, `POST /api/refresh` and
//! SIGHUP all go through [`Refresher::refresh_all`].

use std::sync::Arc;

use calmerge_core::Source;
use calmerge_providers::{FeedFetcher, fetch_source};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheSnapshot, SnapshotStore, SourceEntry};

/// Runs refresh cycles over a fixed list of sources.
pub struct Refresher {
    sources: Vec<Source>,
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<SnapshotStore>,
    /// Held for the whole cycle; cycles never overlap.
    in_flight: Mutex<()>,
}

impl Refresher {
    /// Creates a refresher publishing into `store`.
    pub fn new(
        sources: Vec<Source>,
        fetcher: Arc<dyn FeedFetcher>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            sources,
            fetcher,
            store,
            in_flight: Mutex::new(()),
        }
    }

    /// Returns the configured sources, enabled or not.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Returns the store this refresher publishes into.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs one full refresh cycle and returns the published snapshot.
    ///
    /// Disabled sources are skipped and get no entry. Every enabled source gets
    /// exactly one entry, empty when its fetch failed. If another cycle is in
    /// flight, this call waits for it and then runs its own.
    pub async fn refresh_all(&self) -> Arc<CacheSnapshot> {
        let _guard = self.in_flight.lock().await;

        let enabled: Vec<&Source> = self.sources.iter().filter(|s| s.enabled).collect();
        info!(sources = enabled.len(), "Refreshing all sources");

        let feeds = join_all(
            enabled
                .iter()
                .map(|source| fetch_source(self.fetcher.as_ref(), source)),
        )
        .await;

        let entries: Vec<SourceEntry> = enabled
            .iter()
            .zip(feeds)
            .map(|(source, feed)| SourceEntry::from_feed(source.id.clone(), feed))
            .collect();

        let failed = entries.iter().filter(|e| e.raw_payload.is_none()).count();
        let previous = self.store.get_last_refresh().await;
        let snapshot = Arc::new(CacheSnapshot::new(
            entries,
            next_refresh_time(previous, Utc::now()),
        ));

        self.store.replace(snapshot.clone()).await;
        info!(
            events = snapshot.event_count(),
            failed = failed,
            "Refresh complete"
        );
        debug!(last_refresh = ?snapshot.last_refresh(), "Snapshot published");

        snapshot
    }
}

/// Picks the timestamp of a new snapshot.
///
/// Consecutive snapshots always get strictly increasing timestamps, even if
/// the wall clock stepped back or two cycles finished within the clock's
/// resolution.
fn next_refresh_time(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + TimeDelta::milliseconds(1),
        _ => now,
    }
}
