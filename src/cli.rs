//! CLI subcommand implementations: trace replay and queue maintenance.

use anyhow::{Context, Result};
use chrono::Utc;
use std::io::BufRead;
use std::path::Path;

use waymark::config::WaymarkConfig;
use waymark::queue::{OfflineEventQueue, PendingEvent, SqliteQueueStore};
use waymark::tracking::providers::{NoopProvider, PersistenceCommitter};
use waymark::tracking::session::{SessionEvent, TrackingSession};
use waymark::tracking::types::{AuthorizationStatus, LocationSample};

/// Committer used by replay: prints commits, or refuses everything to
/// exercise the offline-queue path.
struct ReplayCommitter {
    offline: bool,
    next_id: u64,
}

impl PersistenceCommitter for ReplayCommitter {
    fn commit(&mut self, event: &PendingEvent) -> Result<String> {
        if self.offline {
            anyhow::bail!("persistence simulated offline");
        }
        self.next_id += 1;
        let id = format!("mem-{}", self.next_id);
        println!(
            "committed {id}: {} @ ({:.5}, {:.5}) {}",
            event.title, event.latitude, event.longitude, event.timestamp
        );
        Ok(id)
    }
}

/// Replay a JSONL trace of location samples through the full engine.
///
/// Each line is one serialized [`LocationSample`]. Sample timestamps drive
/// the clock, so a replay is deterministic regardless of wall time.
pub fn replay(
    config: WaymarkConfig,
    input: &Path,
    trip_id: &str,
    user_id: &str,
    offline: bool,
) -> Result<()> {
    let file = std::fs::File::open(input)
        .with_context(|| format!("failed to open trace {}", input.display()))?;

    let store = SqliteQueueStore::open(config.resolved_db_path())?;
    let mut session = TrackingSession::new(
        config,
        Box::new(NoopProvider),
        Box::new(ReplayCommitter { offline, next_id: 0 }),
        Box::new(store),
    )?;

    session.authorization_changed(AuthorizationStatus::Granted, Utc::now());

    let mut started = false;

    for (number, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: LocationSample = serde_json::from_str(&line)
            .with_context(|| format!("bad sample on line {}", number + 1))?;

        if !started {
            session
                .start(trip_id, user_id, sample.timestamp)
                .context("failed to start replay session")?;
            started = true;
        }

        session.ingest(sample, sample.timestamp);
        report_events(&mut session);
    }

    if !started {
        anyhow::bail!("trace {} contains no samples", input.display());
    }

    let last_seen = session
        .current_location()
        .map(|s| s.timestamp)
        .unwrap_or_else(Utc::now);
    session.stop(last_seen).ok();
    report_events(&mut session);

    let stats = session.stats();
    println!(
        "replay finished: {} accepted, {} rejected ({} stale, {} inaccurate, {} rate-limited)",
        stats.accepted_samples,
        stats.rejected_total(),
        stats.rejected_stale,
        stats.rejected_inaccurate,
        stats.rejected_rate_limited,
    );
    println!(
        "memories: {} committed, {} queued offline, {} dropped; {} still queued",
        stats.memories_committed,
        stats.memories_queued,
        stats.memories_dropped,
        session.queued_events(),
    );
    Ok(())
}

fn report_events(session: &mut TrackingSession) {
    for event in session.take_events() {
        match event {
            SessionEvent::Paused => println!("-- paused (no significant movement)"),
            SessionEvent::Resumed => println!("-- resumed"),
            SessionEvent::MemoryQueued { title } => println!("queued offline: {title}"),
            SessionEvent::MemoryDropped { title } => println!("dropped (queue full): {title}"),
            SessionEvent::Stopped { drain } => {
                println!("-- stopped (drain: {} committed, {} kept)", drain.committed, drain.failed)
            }
            _ => {}
        }
    }
}

/// Print queued offline events, oldest first.
pub fn queue_show(config: &WaymarkConfig) -> Result<()> {
    let store = SqliteQueueStore::open(config.resolved_db_path())?;
    let queue = OfflineEventQueue::load(Box::new(store), config.queue.capacity)?;

    if queue.is_empty() {
        println!("offline queue is empty");
        return Ok(());
    }

    println!("{} pending event(s):", queue.len());
    for event in queue.events() {
        println!(
            "  {} {} @ ({:.5}, {:.5}) trip={} [{}]",
            event.timestamp, event.title, event.latitude, event.longitude, event.trip_id, event.id
        );
    }
    Ok(())
}

/// Keep only the most recent `keep` queued events.
pub fn queue_trim(config: &WaymarkConfig, keep: usize) -> Result<()> {
    let store = SqliteQueueStore::open(config.resolved_db_path())?;
    let mut queue = OfflineEventQueue::load(Box::new(store), config.queue.capacity)?;

    let dropped = queue.trim_to_most_recent(keep);
    println!("dropped {dropped} event(s), {} kept", queue.len());
    Ok(())
}
