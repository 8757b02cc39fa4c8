//! Aggregate cache of the latest refresh cycle.
//!
//! A [`CacheSnapshot`] holds, per source, the normalized events and the raw
//! payload of one refresh cycle together with its timestamp. The
//! [`SnapshotStore`] publishes exactly one snapshot at a time and replaces it
//! wholesale; a snapshot is never mutated after publication, so a reader
//! holding one sees events and payloads from the same cycle.

use std::collections::HashSet;
use std::sync::Arc;

use calmerge_core::NormalizedEvent;
use calmerge_providers::SourceFeed;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// What one source contributed to a refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Id of the source.
    pub source_id: String,
    /// Events in document order.
    pub events: Vec<NormalizedEvent>,
    /// The raw document; absent when the fetch failed.
    pub raw_payload: Option<String>,
}

impl SourceEntry {
    /// Creates an entry from the outcome of fetching `source_id`.
    pub fn from_feed(source_id: impl Into<String>, feed: SourceFeed) -> Self {
        Self {
            source_id: source_id.into(),
            events: feed.events,
            raw_payload: feed.raw_payload,
        }
    }
}

/// The complete result of one refresh cycle.
///
/// Entries are kept in configuration order, which is the iteration order of
/// every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    entries: Vec<SourceEntry>,
    last_refresh: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    /// The snapshot in place before the first refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a snapshot from a full set of entries.
    pub fn new(entries: Vec<SourceEntry>, last_refresh: DateTime<Utc>) -> Self {
        Self {
            entries,
            last_refresh: Some(last_refresh),
        }
    }

    /// Returns the entries in cache order.
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Returns the entry for `source_id`, if that source was refreshed.
    pub fn entry(&self, source_id: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.source_id == source_id)
    }

    /// Returns cached events, in cache order then document order.
    ///
    /// With a filter, only sources named in it contribute. Ids that are not
    /// cached are ignored.
    pub fn events(&self, filter: Option<&[String]>) -> Vec<NormalizedEvent> {
        let wanted: Option<HashSet<&str>> =
            filter.map(|ids| ids.iter().map(String::as_str).collect());

        self.entries
            .iter()
            .filter(|entry| {
                wanted
                    .as_ref()
                    .is_none_or(|ids| ids.contains(entry.source_id.as_str()))
            })
            .flat_map(|entry| entry.events.iter().cloned())
            .collect()
    }

    /// Returns the raw payload cached for `source_id`.
    pub fn raw_payload(&self, source_id: &str) -> Option<&str> {
        self.entry(source_id)?.raw_payload.as_deref()
    }

    /// Iterates over the cached raw payloads, in cache order.
    pub fn raw_payloads(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| {
            e.raw_payload
                .as_deref()
                .map(|payload| (e.source_id.as_str(), payload))
        })
    }

    /// Returns when this snapshot was published, `None` before the first
    /// refresh.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Returns the total number of cached events.
    pub fn event_count(&self) -> usize {
        self.entries.iter().map(|e| e.events.len()).sum()
    }
}

/// Holder of the current snapshot.
///
/// Reads clone an `Arc` under a short read lock and never wait on network
/// I/O; [`replace`](Self::replace) swaps the pointer under the write lock.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<CacheSnapshot>>,
}

impl SnapshotStore {
    /// Creates a store holding the empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.read().await.clone()
    }

    /// Publishes `snapshot`, dropping the previous one.
    pub async fn replace(&self, snapshot: Arc<CacheSnapshot>) {
        debug!(
            sources = snapshot.entries().len(),
            events = snapshot.event_count(),
            "Publishing snapshot"
        );
        *self.current.write().await = snapshot;
    }

    /// Returns cached events; see [`CacheSnapshot::events`].
    pub async fn get_events(&self, filter: Option<&[String]>) -> Vec<NormalizedEvent> {
        self.snapshot().await.events(filter)
    }

    /// Returns the raw payload cached for `source_id`.
    pub async fn get_raw_payload(&self, source_id: &str) -> Option<String> {
        self.snapshot()
            .await
            .raw_payload(source_id)
            .map(str::to_string)
    }

    /// Returns when the current snapshot was published.
    pub async fn get_last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot().await.last_refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmerge_core::{EventTime, Source};

    fn event(id: &str, source: &Source) -> NormalizedEvent {
        NormalizedEvent::new(
            id,
            EventTime::from_utc("2025-02-05T10:00:00Z".parse().unwrap()),
            None,
            source,
        )
    }

    fn snapshot() -> CacheSnapshot {
        let a = Source::new("a", "A", "https://example.com/a.ics");
        let b = Source::new("b", "B", "https://example.com/b.ics");
        CacheSnapshot::new(
            vec![
                SourceEntry {
                    source_id: "a".to_string(),
                    events: vec![event("a1", &a), event("a2", &a)],
                    raw_payload: Some("A".to_string()),
                },
                SourceEntry {
                    source_id: "b".to_string(),
                    events: Vec::new(),
                    raw_payload: None,
                },
            ],
            "2025-02-05T08:00:00Z".parse().unwrap(),
        )
    }

    fn ids(events: &[NormalizedEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = CacheSnapshot::empty();
        assert!(snapshot.events(None).is_empty());
        assert!(snapshot.last_refresh().is_none());
        assert_eq!(snapshot.raw_payloads().count(), 0);
    }

    #[test]
    fn events_without_filter() {
        let snapshot = snapshot();
        assert_eq!(ids(&snapshot.events(None)), vec!["a1", "a2"]);
        assert_eq!(snapshot.event_count(), 2);
    }

    #[test]
    fn events_with_filter() {
        let snapshot = snapshot();
        let only_b = vec!["b".to_string()];
        assert!(snapshot.events(Some(&only_b)).is_empty());

        let both = vec!["b".to_string(), "a".to_string()];
        assert_eq!(ids(&snapshot.events(Some(&both))), vec!["a1", "a2"]);
    }

    #[test]
    fn unknown_ids_in_filter_yield_nothing() {
        let snapshot = snapshot();
        let unknown = vec!["nope".to_string(), "missing".to_string()];
        assert!(snapshot.events(Some(&unknown)).is_empty());
    }

    #[test]
    fn raw_payload_lookup() {
        let snapshot = snapshot();
        assert_eq!(snapshot.raw_payload("a"), Some("A"));
        assert_eq!(snapshot.raw_payload("b"), None);
        assert_eq!(snapshot.raw_payload("zzz"), None);

        let payloads: Vec<_> = snapshot.raw_payloads().collect();
        assert_eq!(payloads, vec![("a", "A")]);
    }

    #[tokio::test]
    async fn store_replaces_whole_snapshot() {
        let store = SnapshotStore::new();
        assert!(store.get_last_refresh().await.is_none());

        let before = store.snapshot().await;
        store.replace(Arc::new(snapshot())).await;

        // A snapshot taken earlier is unaffected by the swap.
        assert!(before.entries().is_empty());
        assert_eq!(store.get_events(None).await.len(), 2);
        assert_eq!(store.get_raw_payload("a").await.as_deref(), Some("A"));
        assert!(store.get_last_refresh().await.is_some());

        store.replace(Arc::new(CacheSnapshot::empty())).await;
        assert!(store.get_events(None).await.is_empty());
        assert!(store.get_raw_payload("a").await.is_none());
    }
}
