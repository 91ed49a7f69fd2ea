//! Offline-first event queue.
//!
//! When the persistence collaborator is unreachable, memory-creation events
//! land here instead of being lost. The queue is FIFO, capacity-bounded, and
//! written through its [`QueueStore`] on every mutation so an unexpected
//! termination loses at most the in-flight change.
//!
//! Capacity policy: once full, new events are rejected — never the oldest
//! evicted. Events already waiting represent places actually visited; a new
//! event arriving at a full queue is more likely redundant noise.

pub mod store;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use store::{MemoryQueueStore, QueueStore, SqliteQueueStore};

/// A memory-creation request that could not be committed yet.
///
/// Round-trips losslessly through serde; the queue's on-disk representation
/// is the ordered list of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub trip_id: String,
    pub user_id: String,
}

impl PendingEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        content: Option<String>,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
        trip_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.into(),
            content,
            latitude,
            longitude,
            timestamp,
            trip_id: trip_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    /// Queue at capacity; the event was dropped. Deliberate backpressure,
    /// not an error.
    RejectedFull,
}

/// Counts reported by a drain attempt. Individual commit failures never
/// abort the drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub committed: usize,
    pub failed: usize,
}

pub struct OfflineEventQueue {
    events: VecDeque<PendingEvent>,
    capacity: usize,
    store: Box<dyn QueueStore>,
}

impl OfflineEventQueue {
    /// Load queue contents from the store. Entries beyond `capacity` are
    /// kept — the bound applies to new enqueues, not to reloaded state.
    pub fn load(store: Box<dyn QueueStore>, capacity: usize) -> anyhow::Result<Self> {
        let events: VecDeque<PendingEvent> = store.load()?.into();
        if !events.is_empty() {
            info!(pending = events.len(), "loaded offline event queue");
        }
        Ok(Self {
            events,
            capacity,
            store,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queued events in FIFO order, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &PendingEvent> {
        self.events.iter()
    }

    /// Append an event, unless the queue is at capacity.
    pub fn enqueue(&mut self, event: PendingEvent) -> EnqueueOutcome {
        if self.events.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                title = %event.title,
                "offline queue full, dropping event"
            );
            return EnqueueOutcome::RejectedFull;
        }

        debug!(id = %event.id, title = %event.title, "queued offline event");
        self.events.push_back(event);
        self.persist();
        EnqueueOutcome::Accepted
    }

    /// Attempt to commit every queued event in FIFO order.
    ///
    /// Successfully committed events are removed; failures stay queued in
    /// their original relative order for a later drain.
    pub fn drain_all(
        &mut self,
        commit: &mut dyn FnMut(&PendingEvent) -> anyhow::Result<String>,
    ) -> DrainReport {
        if self.events.is_empty() {
            return DrainReport::default();
        }

        let mut report = DrainReport::default();
        let mut remaining = VecDeque::with_capacity(self.events.len());

        for event in self.events.drain(..) {
            match commit(&event) {
                Ok(event_id) => {
                    debug!(id = %event.id, committed_as = %event_id, "drained offline event");
                    report.committed += 1;
                }
                Err(err) => {
                    debug!(id = %event.id, error = %err, "offline event commit failed, keeping");
                    report.failed += 1;
                    remaining.push_back(event);
                }
            }
        }

        self.events = remaining;
        self.persist();
        info!(
            committed = report.committed,
            failed = report.failed,
            "offline queue drain finished"
        );
        report
    }

    /// Keep only the `n` most recent events. Returns how many were dropped.
    /// Used under external memory-pressure signals.
    pub fn trim_to_most_recent(&mut self, n: usize) -> usize {
        if self.events.len() <= n {
            return 0;
        }
        let dropped = self.events.len() - n;
        self.events.drain(..dropped);
        warn!(dropped, kept = n, "trimmed offline queue under memory pressure");
        self.persist();
        dropped
    }

    /// Write the full ordered queue through the store. A failed write keeps
    /// the in-memory mutation; durability loses at most this one change.
    fn persist(&self) {
        let events: Vec<PendingEvent> = self.events.iter().cloned().collect();
        if let Err(err) = self.store.save(&events) {
            warn!(error = %err, "failed to persist offline queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(n: usize) -> PendingEvent {
        PendingEvent::new(
            format!("Stop {n}"),
            None,
            48.2082,
            16.3738,
            at(n as i64),
            "trip-1",
            "user-1",
        )
    }

    fn queue(capacity: usize) -> OfflineEventQueue {
        OfflineEventQueue::load(Box::new(MemoryQueueStore::new()), capacity).unwrap()
    }

    #[test]
    fn enqueue_rejects_at_capacity() {
        let mut q = queue(50);
        for n in 0..50 {
            assert_eq!(q.enqueue(event(n)), EnqueueOutcome::Accepted);
        }
        let overflow = event(50);
        assert_eq!(q.enqueue(overflow), EnqueueOutcome::RejectedFull);
        assert_eq!(q.len(), 50);
        // The oldest entry survived; the newcomer was the one dropped.
        assert_eq!(q.events().next().unwrap().title, "Stop 0");
        assert_eq!(q.events().last().unwrap().title, "Stop 49");
    }

    #[test]
    fn drain_removes_only_committed_events() {
        let mut q = queue(10);
        for n in 1..=3 {
            q.enqueue(event(n));
        }

        // Commit succeeds for events 1 and 3, fails for event 2.
        let mut calls = 0;
        let report = q.drain_all(&mut |e| {
            calls += 1;
            if e.title == "Stop 2" {
                anyhow::bail!("store unavailable")
            }
            Ok(format!("committed-{}", e.title))
        });

        assert_eq!(calls, 3);
        assert_eq!(report, DrainReport { committed: 2, failed: 1 });
        let remaining: Vec<&str> = q.events().map(|e| e.title.as_str()).collect();
        assert_eq!(remaining, vec!["Stop 2"]);
    }

    #[test]
    fn failed_events_keep_relative_order() {
        let mut q = queue(10);
        for n in 1..=4 {
            q.enqueue(event(n));
        }
        q.drain_all(&mut |e| {
            if e.title == "Stop 2" || e.title == "Stop 4" {
                anyhow::bail!("nope")
            }
            Ok("id".into())
        });
        let remaining: Vec<&str> = q.events().map(|e| e.title.as_str()).collect();
        assert_eq!(remaining, vec!["Stop 2", "Stop 4"]);
    }

    #[test]
    fn drain_on_empty_queue_reports_zero() {
        let mut q = queue(10);
        let report = q.drain_all(&mut |_| Ok("id".into()));
        assert_eq!(report, DrainReport::default());
    }

    #[test]
    fn trim_keeps_most_recent() {
        let mut q = queue(50);
        for n in 0..20 {
            q.enqueue(event(n));
        }
        let dropped = q.trim_to_most_recent(10);
        assert_eq!(dropped, 10);
        assert_eq!(q.len(), 10);
        assert_eq!(q.events().next().unwrap().title, "Stop 10");
        assert_eq!(q.events().last().unwrap().title, "Stop 19");

        // Trimming to a larger size is a no-op.
        assert_eq!(q.trim_to_most_recent(15), 0);
        assert_eq!(q.len(), 10);
    }

    #[test]
    fn mutations_are_written_through_to_store() {
        let store = MemoryQueueStore::new();
        let snapshot = store.handle();
        let mut q = OfflineEventQueue::load(Box::new(store), 10).unwrap();

        q.enqueue(event(1));
        q.enqueue(event(2));
        assert_eq!(snapshot.lock().unwrap().len(), 2);

        q.drain_all(&mut |_| Ok("id".into()));
        assert!(snapshot.lock().unwrap().is_empty());
    }

    #[test]
    fn pending_event_round_trips_through_serde() {
        let original = event(7);
        let json = serde_json::to_string(&original).unwrap();
        let back: PendingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
