#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use waymark::config::WaymarkConfig;
use waymark::queue::{MemoryQueueStore, PendingEvent};
use waymark::tracking::providers::{NoopProvider, PersistenceCommitter};
use waymark::tracking::session::TrackingSession;
use waymark::tracking::types::{AuthorizationStatus, LocationSample};

/// Base coordinates for generated samples (Lisbon).
pub const BASE_LAT: f64 = 38.7223;
pub const BASE_LON: f64 = -9.1393;

/// Meters per degree of latitude, for displacing samples in tests.
pub const M_PER_DEG_LAT: f64 = 111_320.0;

/// Fixed epoch so test timestamps are stable and readable as offsets.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// A good-accuracy sample `north_m` meters north of the base point.
pub fn sample(secs: i64, north_m: f64) -> LocationSample {
    LocationSample::new(BASE_LAT + north_m / M_PER_DEG_LAT, BASE_LON, 10.0, at(secs))
}

/// A pending event for queue tests.
pub fn pending_event(title: &str, secs: i64) -> PendingEvent {
    PendingEvent::new(title, None, BASE_LAT, BASE_LON, at(secs), "trip-1", "user-1")
}

/// Committer whose outcomes follow a script (`true` = commit succeeds),
/// falling back to `default` once the script runs out. Committed events are
/// recorded behind a shared handle.
pub struct ScriptedCommitter {
    script: VecDeque<bool>,
    default: bool,
    committed: Arc<Mutex<Vec<PendingEvent>>>,
    next_id: u64,
}

impl ScriptedCommitter {
    pub fn always_ok() -> Self {
        Self::new([], true)
    }

    pub fn always_fail() -> Self {
        Self::new([], false)
    }

    pub fn new(script: impl IntoIterator<Item = bool>, default: bool) -> Self {
        Self {
            script: script.into_iter().collect(),
            default,
            committed: Arc::new(Mutex::new(Vec::new())),
            next_id: 0,
        }
    }

    /// Shared view of successfully committed events.
    pub fn recorder(&self) -> Arc<Mutex<Vec<PendingEvent>>> {
        self.committed.clone()
    }
}

impl PersistenceCommitter for ScriptedCommitter {
    fn commit(&mut self, event: &PendingEvent) -> anyhow::Result<String> {
        let ok = self.script.pop_front().unwrap_or(self.default);
        if !ok {
            anyhow::bail!("persistence unavailable");
        }
        self.committed.lock().unwrap().push(event.clone());
        self.next_id += 1;
        Ok(format!("mem-{}", self.next_id))
    }
}

/// A session with permission granted, an in-memory queue store, and the
/// given committer. Uses default configuration.
pub fn granted_session(committer: ScriptedCommitter) -> TrackingSession {
    let mut session = TrackingSession::new(
        WaymarkConfig::default(),
        Box::new(NoopProvider),
        Box::new(committer),
        Box::new(MemoryQueueStore::new()),
    )
    .unwrap();
    session.authorization_changed(AuthorizationStatus::Granted, at(0));
    session
}
