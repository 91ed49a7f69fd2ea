//! The tracking session state machine.
//!
//! [`TrackingSession`] is the sole mutator of tracking state. It owns the
//! filter, pause detector, event policy, accuracy controller and offline
//! queue, and orchestrates them per accepted sample: filter → anchors →
//! pause → policy → commit-or-queue.
//!
//! Every operation takes `now` explicitly, so the decision logic is
//! deterministic and unit-testable; the async runtime layer supplies wall
//! clock and serializes calls (see [`runtime`](crate::tracking::runtime)).
//! Observable mutations are pushed to an internal outbox which the owner
//! drains via [`TrackingSession::take_events`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WaymarkConfig;
use crate::error::SessionError;
use crate::queue::{DrainReport, EnqueueOutcome, OfflineEventQueue, PendingEvent, QueueStore};
use crate::tracking::accuracy::AccuracyController;
use crate::tracking::filter::{FilterContext, LocationFilter, Rejection};
use crate::tracking::pause::{PauseDetector, PauseTransition};
use crate::tracking::policy::EventPolicy;
use crate::tracking::providers::{LocationProvider, PersistenceCommitter};
use crate::tracking::types::{
    AccuracyTier, AppLifecycle, AuthorizationStatus, BatteryState, EffectiveSettings,
    LocationSample,
};

/// Title given to automatically created memories. Reverse-geocoding a real
/// place name is a collaborator concern, not ours.
const AUTO_MEMORY_TITLE: &str = "Visited place";

/// Title of the best-effort snapshot taken when the app is terminating.
const FINAL_SNAPSHOT_TITLE: &str = "Last known location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session. Initial state.
    Idle,
    /// Tracking; Moving or Paused per the pause detector.
    Active,
    /// Terminal, reached via explicit stop. Equivalent to Idle.
    Stopped,
}

/// Emitted after each observable mutation. Observers (UI or otherwise)
/// subscribe through the runtime's broadcast channel; the session makes no
/// assumption about where they run.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started {
        trip_id: String,
        user_id: String,
    },
    Stopped {
        drain: DrainReport,
    },
    LocationUpdated(LocationSample),
    Paused,
    Resumed,
    TierChanged {
        tier: AccuracyTier,
        effective: EffectiveSettings,
    },
    MemoryCommitted {
        event_id: String,
        title: String,
    },
    MemoryQueued {
        title: String,
    },
    /// Queue was full; the event is gone. Backpressure, not an error.
    MemoryDropped {
        title: String,
    },
    QueueDrained(DrainReport),
    /// A caller-initiated operation was rejected. Emitted by the runtime so
    /// fire-and-forget observers still see the failure.
    OperationFailed {
        operation: &'static str,
        error: SessionError,
    },
}

/// Diagnostics counters. Rejections are counted, never surfaced.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionStats {
    pub accepted_samples: u64,
    pub rejected_stale: u64,
    pub rejected_inaccurate: u64,
    pub rejected_rate_limited: u64,
    pub memories_committed: u64,
    pub memories_queued: u64,
    pub memories_dropped: u64,
}

impl SessionStats {
    pub fn rejected_total(&self) -> u64 {
        self.rejected_stale + self.rejected_inaccurate + self.rejected_rate_limited
    }
}

pub struct TrackingSession {
    config: WaymarkConfig,

    // Decision components
    filter: LocationFilter,
    policy: EventPolicy,
    pause: PauseDetector,
    accuracy: AccuracyController,

    // Collaborators
    provider: Box<dyn LocationProvider>,
    committer: Box<dyn PersistenceCommitter>,
    queue: OfflineEventQueue,

    // Session state
    state: SessionState,
    trip_id: Option<String>,
    user_id: Option<String>,
    tier: AccuracyTier,
    effective: EffectiveSettings,
    current: Option<LocationSample>,
    /// Shared anchor for pause-detection and event-emission distances.
    /// Moves on qualifying movement and on every emission.
    last_significant: Option<LocationSample>,
    started_at: Option<DateTime<Utc>>,
    battery: BatteryState,
    authorization: AuthorizationStatus,

    stats: SessionStats,
    outbox: VecDeque<SessionEvent>,
}

impl TrackingSession {
    pub fn new(
        config: WaymarkConfig,
        provider: Box<dyn LocationProvider>,
        committer: Box<dyn PersistenceCommitter>,
        store: Box<dyn QueueStore>,
    ) -> anyhow::Result<Self> {
        let queue = OfflineEventQueue::load(store, config.queue.capacity)?;
        let battery = BatteryState::default();
        let tier = AccuracyTier::Balanced;

        Ok(Self {
            filter: LocationFilter::new(config.filter.clone()),
            policy: EventPolicy::new(config.events.clone()),
            pause: PauseDetector::new(config.pause.clone()),
            accuracy: AccuracyController::new(),
            provider,
            committer,
            queue,
            state: SessionState::Idle,
            trip_id: None,
            user_id: None,
            tier,
            effective: AccuracyController::effective_settings(tier, battery),
            current: None,
            last_significant: None,
            started_at: None,
            battery,
            authorization: AuthorizationStatus::NotDetermined,
            stats: SessionStats::default(),
            outbox: VecDeque::new(),
            config,
        })
    }

    // =========================================================================
    // Lifecycle operations
    // =========================================================================

    /// Begin tracking a trip. Requires permission already granted; rejection
    /// triggers a permission request and is recoverable. An already-active
    /// session is replaced, never stacked.
    pub fn start(
        &mut self,
        trip_id: impl Into<String>,
        user_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if !self.authorization.is_granted() {
            info!("start rejected: permission not granted, requesting");
            self.provider.request_permission();
            return Err(SessionError::PermissionDenied);
        }

        if self.state == SessionState::Active {
            warn!("start while active, replacing current session");
            let _ = self.stop(now);
        }

        let trip_id = trip_id.into();
        let user_id = user_id.into();

        self.tier = AccuracyTier::Balanced;
        self.effective = AccuracyController::effective_settings(self.tier, self.battery);
        self.current = None;
        self.last_significant = None;
        self.started_at = Some(now);
        self.stats = SessionStats::default();
        self.pause.start(now);
        self.state = SessionState::Active;

        self.provider.start_continuous_updates(self.effective);

        info!(trip = %trip_id, user = %user_id, "tracking session started");
        self.trip_id = Some(trip_id.clone());
        self.user_id = Some(user_id.clone());
        self.emit(SessionEvent::Started { trip_id, user_id });
        Ok(())
    }

    /// Stop tracking: one drain attempt, anchors cleared. The queue itself
    /// is never cleared here — only a successful drain removes entries.
    pub fn stop(&mut self, _now: DateTime<Utc>) -> Result<DrainReport, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }

        self.provider.stop_continuous_updates();
        self.pause.stop();

        let report = self.drain_queue();

        self.current = None;
        self.last_significant = None;
        self.trip_id = None;
        self.user_id = None;
        self.started_at = None;
        self.state = SessionState::Stopped;

        info!(
            committed = report.committed,
            still_queued = report.failed,
            "tracking session stopped"
        );
        self.emit(SessionEvent::Stopped { drain: report });
        Ok(report)
    }

    // =========================================================================
    // Sample ingestion
    // =========================================================================

    /// Route a raw sample through filter → anchors → pause → policy.
    /// No-op outside Active; rejected samples are counted and dropped.
    pub fn ingest(&mut self, sample: LocationSample, now: DateTime<Utc>) {
        if self.state != SessionState::Active {
            return;
        }

        let ctx = FilterContext {
            last_accepted: self.current.as_ref(),
            is_tracking: true,
            battery_level: self.battery.level,
            now,
        };
        if let Err(reason) = self.filter.evaluate(&sample, ctx) {
            self.count_rejection(reason);
            return;
        }

        self.current = Some(sample);
        self.stats.accepted_samples += 1;
        self.emit(SessionEvent::LocationUpdated(sample));

        let anchor = self.last_significant;
        let displacement = anchor.map(|a| a.displacement_m(&sample));

        // The first accepted fix counts as movement.
        let transition = self
            .pause
            .observe(displacement.unwrap_or(f64::INFINITY), now);
        self.emit_pause_transition(transition);

        let should_emit =
            self.policy
                .should_emit(&sample, anchor.as_ref(), self.battery.level, true);

        if should_emit {
            // The triggering sample becomes the shared anchor.
            self.last_significant = Some(sample);
            let event = self.build_event(AUTO_MEMORY_TITLE, None, sample.latitude, sample.longitude);
            self.commit_or_queue(event);
        } else if displacement.is_some_and(|d| d >= self.config.pause.min_movement_m) {
            // Qualifying movement moves the anchor even without an emission.
            self.last_significant = Some(sample);
        }
    }

    // =========================================================================
    // Accuracy and signals
    // =========================================================================

    /// Change the requested tier; effective settings are recomputed against
    /// the current battery state.
    pub fn set_accuracy(&mut self, tier: AccuracyTier) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }

        self.tier = tier;
        self.apply_effective_settings();
        Ok(())
    }

    /// Consume a battery reading: may change the tier (controller
    /// recommendation) or just re-clamp the effective settings.
    pub fn battery_changed(&mut self, battery: BatteryState) {
        self.battery = battery;
        let recommended = self.accuracy.recommend_tier(self.tier, battery);

        if self.state != SessionState::Active {
            return;
        }

        if let Some(tier) = recommended {
            info!(tier = %tier, level = battery.level, "battery policy changed tier");
            self.tier = tier;
        }
        self.apply_effective_settings();
    }

    /// Consume an authorization change. Revocation while Active force-stops.
    pub fn authorization_changed(&mut self, status: AuthorizationStatus, now: DateTime<Utc>) {
        self.authorization = status;
        if !status.is_granted() && self.state == SessionState::Active {
            warn!("location permission revoked, force-stopping session");
            let _ = self.stop(now);
        }
    }

    /// Consume a coarse app-lifecycle change.
    pub fn lifecycle_changed(&mut self, phase: AppLifecycle, _now: DateTime<Utc>) {
        match phase {
            AppLifecycle::Background => {
                // De-escalate expensive tiers while backgrounded.
                if self.state == SessionState::Active
                    && matches!(self.tier, AccuracyTier::High | AccuracyTier::Navigation)
                {
                    info!("backgrounded, de-escalating accuracy to balanced");
                    let _ = self.set_accuracy(AccuracyTier::Balanced);
                }
            }
            AppLifecycle::Terminating => {
                if self.state == SessionState::Active {
                    if let Some(sample) = self.current {
                        info!("terminating, recording final location snapshot");
                        let event = self.build_event(
                            FINAL_SNAPSHOT_TITLE,
                            None,
                            sample.latitude,
                            sample.longitude,
                        );
                        self.commit_or_queue(event);
                    }
                }
            }
            AppLifecycle::Active | AppLifecycle::Inactive => {
                debug!(?phase, "lifecycle change");
            }
        }
    }

    /// External memory-pressure signal: shrink the offline queue.
    pub fn low_memory(&mut self) {
        self.queue.trim_to_most_recent(self.config.queue.trim_keep);
    }

    // =========================================================================
    // Memory creation
    // =========================================================================

    /// Create a memory right now, bypassing the event policy. Uses the
    /// override location if given, else the current accepted sample.
    pub fn manual_event(
        &mut self,
        title: impl Into<String>,
        content: Option<String>,
        location_override: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }

        let (latitude, longitude) = match location_override {
            Some(coords) => coords,
            None => match &self.current {
                Some(sample) => (sample.latitude, sample.longitude),
                None => {
                    // Ask for a fresh fix so a retry can succeed; the error
                    // itself is the caller's to handle.
                    self.provider.request_one_shot_update();
                    return Err(SessionError::NoLocationAvailable);
                }
            },
        };

        let mut event = self.build_event(&title.into(), content, latitude, longitude);
        event.timestamp = now;
        self.commit_or_queue(event);
        Ok(())
    }

    /// Explicit drain of the offline queue (periodic sync, or stop).
    pub fn sync(&mut self) -> DrainReport {
        let report = self.drain_queue();
        self.emit(SessionEvent::QueueDrained(report));
        report
    }

    /// Pause-deadline timer callback. `generation` guards against a timer
    /// that was rescheduled after being armed.
    pub fn pause_deadline_elapsed(&mut self, generation: u64, now: DateTime<Utc>) {
        let transition = self.pause.check_deadline_if_current(generation, now);
        self.emit_pause_transition(transition);
    }

    /// The currently armed pause deadline and its generation, if any.
    pub fn pause_deadline(&self) -> Option<(DateTime<Utc>, u64)> {
        if self.state != SessionState::Active {
            return None;
        }
        self.pause.deadline().map(|d| (d, self.pause.generation()))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn tier(&self) -> AccuracyTier {
        self.tier
    }

    pub fn effective_settings(&self) -> EffectiveSettings {
        self.effective
    }

    pub fn current_location(&self) -> Option<&LocationSample> {
        self.current.as_ref()
    }

    pub fn trip_id(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    /// Drain all events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.outbox.drain(..).collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn build_event(
        &self,
        title: &str,
        content: Option<String>,
        latitude: f64,
        longitude: f64,
    ) -> PendingEvent {
        let timestamp = self
            .current
            .map(|s| s.timestamp)
            .unwrap_or_else(Utc::now);
        PendingEvent::new(
            title,
            content,
            latitude,
            longitude,
            timestamp,
            self.trip_id.clone().unwrap_or_default(),
            self.user_id.clone().unwrap_or_default(),
        )
    }

    /// Try the persistence collaborator; fall back to the offline queue.
    /// Never surfaces a failure to the caller.
    fn commit_or_queue(&mut self, event: PendingEvent) {
        let title = event.title.clone();
        match self.committer.commit(&event) {
            Ok(event_id) => {
                debug!(id = %event_id, title = %title, "memory committed");
                self.stats.memories_committed += 1;
                self.emit(SessionEvent::MemoryCommitted { event_id, title });
            }
            Err(err) => {
                warn!(error = %err, title = %title, "commit failed, queueing offline");
                match self.queue.enqueue(event) {
                    EnqueueOutcome::Accepted => {
                        self.stats.memories_queued += 1;
                        self.emit(SessionEvent::MemoryQueued { title });
                    }
                    EnqueueOutcome::RejectedFull => {
                        self.stats.memories_dropped += 1;
                        self.emit(SessionEvent::MemoryDropped { title });
                    }
                }
            }
        }
    }

    fn drain_queue(&mut self) -> DrainReport {
        let Self {
            queue, committer, ..
        } = self;
        queue.drain_all(&mut |event| committer.commit(event))
    }

    fn apply_effective_settings(&mut self) {
        let effective = AccuracyController::effective_settings(self.tier, self.battery);
        if effective != self.effective {
            self.effective = effective;
            self.provider.start_continuous_updates(effective);
        }
        self.emit(SessionEvent::TierChanged {
            tier: self.tier,
            effective: self.effective,
        });
    }

    fn emit_pause_transition(&mut self, transition: Option<PauseTransition>) {
        match transition {
            Some(PauseTransition::Paused) => {
                info!("no significant movement, session paused");
                self.emit(SessionEvent::Paused);
            }
            Some(PauseTransition::Resumed) => {
                info!("movement detected, session resumed");
                self.emit(SessionEvent::Resumed);
            }
            None => {}
        }
    }

    fn count_rejection(&mut self, reason: Rejection) {
        debug!(reason = reason.as_str(), "sample rejected");
        match reason {
            Rejection::Stale => self.stats.rejected_stale += 1,
            Rejection::InvalidAccuracy => self.stats.rejected_inaccurate += 1,
            Rejection::RateLimited => self.stats.rejected_rate_limited += 1,
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.outbox.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueueStore;
    use crate::tracking::providers::NoopProvider;
    use chrono::TimeZone;

    /// Committer whose behavior is scripted per call: `true` commits,
    /// `false` fails. An exhausted script always commits.
    struct ScriptedCommitter {
        results: VecDeque<bool>,
        next_id: u64,
    }

    impl ScriptedCommitter {
        fn always_ok() -> Self {
            Self::with_script([])
        }

        fn with_script(results: impl IntoIterator<Item = bool>) -> Self {
            Self {
                results: results.into_iter().collect(),
                next_id: 0,
            }
        }
    }

    impl PersistenceCommitter for ScriptedCommitter {
        fn commit(&mut self, _event: &PendingEvent) -> anyhow::Result<String> {
            if !self.results.pop_front().unwrap_or(true) {
                anyhow::bail!("persistence unavailable");
            }
            self.next_id += 1;
            Ok(format!("mem-{}", self.next_id))
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, north_m: f64) -> LocationSample {
        LocationSample::new(35.6762 + north_m / 111_320.0, 139.6503, 10.0, at(secs))
    }

    fn session() -> TrackingSession {
        TrackingSession::new(
            WaymarkConfig::default(),
            Box::new(NoopProvider),
            Box::new(ScriptedCommitter::always_ok()),
            Box::new(MemoryQueueStore::new()),
        )
        .unwrap()
    }

    fn granted_session() -> TrackingSession {
        let mut s = session();
        s.authorization_changed(AuthorizationStatus::Granted, at(0));
        s
    }

    #[test]
    fn start_without_permission_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.start("trip-1", "user-1", at(0)),
            Err(SessionError::PermissionDenied)
        );
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn start_initializes_balanced_tier() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.tier(), AccuracyTier::Balanced);
        assert!(s
            .take_events()
            .contains(&SessionEvent::Started {
                trip_id: "trip-1".into(),
                user_id: "user-1".into()
            }));
    }

    #[test]
    fn ingest_outside_active_is_a_no_op() {
        let mut s = granted_session();
        s.ingest(sample(0, 0.0), at(0));
        assert!(s.current_location().is_none());
        assert_eq!(s.stats().accepted_samples, 0);
    }

    #[test]
    fn first_sample_becomes_current_and_emits() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));

        assert_eq!(s.current_location(), Some(&sample(0, 0.0)));
        assert_eq!(s.stats().memories_committed, 1);
    }

    #[test]
    fn displaced_sample_triggers_second_memory() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));
        s.ingest(sample(50, 120.0), at(50));
        assert_eq!(s.stats().memories_committed, 2);
    }

    #[test]
    fn nearby_sample_does_not_emit() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));
        s.ingest(sample(30, 50.0), at(30));
        assert_eq!(s.stats().memories_committed, 1);
        assert_eq!(s.stats().accepted_samples, 2);
    }

    #[test]
    fn rejected_samples_are_counted_not_surfaced() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));
        // Identical resubmission: rate limited.
        s.ingest(sample(0, 0.0), at(1));
        assert_eq!(s.stats().rejected_rate_limited, 1);
        assert_eq!(s.stats().accepted_samples, 1);
    }

    #[test]
    fn manual_event_requires_location() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        assert_eq!(
            s.manual_event("Lunch", None, None, at(10)),
            Err(SessionError::NoLocationAvailable)
        );
        // Override works without a current sample.
        s.manual_event("Lunch", None, Some((35.0, 139.0)), at(10))
            .unwrap();
        assert_eq!(s.stats().memories_committed, 1);
    }

    #[test]
    fn manual_event_outside_active_fails() {
        let mut s = granted_session();
        assert_eq!(
            s.manual_event("Lunch", None, Some((35.0, 139.0)), at(0)),
            Err(SessionError::NotActive)
        );
    }

    #[test]
    fn commit_failure_falls_back_to_queue() {
        let committer = ScriptedCommitter::with_script([false]);
        let mut s = TrackingSession::new(
            WaymarkConfig::default(),
            Box::new(NoopProvider),
            Box::new(committer),
            Box::new(MemoryQueueStore::new()),
        )
        .unwrap();
        s.authorization_changed(AuthorizationStatus::Granted, at(0));
        s.start("trip-1", "user-1", at(0)).unwrap();

        s.ingest(sample(0, 0.0), at(0));
        assert_eq!(s.stats().memories_queued, 1);
        assert_eq!(s.queued_events(), 1);
    }

    #[test]
    fn stop_drains_queue() {
        // First commit fails (event queued), drain commit succeeds.
        let committer = ScriptedCommitter::with_script([false, true]);
        let mut s = TrackingSession::new(
            WaymarkConfig::default(),
            Box::new(NoopProvider),
            Box::new(committer),
            Box::new(MemoryQueueStore::new()),
        )
        .unwrap();
        s.authorization_changed(AuthorizationStatus::Granted, at(0));
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));
        assert_eq!(s.queued_events(), 1);

        let report = s.stop(at(100)).unwrap();
        assert_eq!(report.committed, 1);
        assert_eq!(s.queued_events(), 0);
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(s.current_location().is_none());
    }

    #[test]
    fn start_replaces_active_session() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));
        s.start("trip-2", "user-1", at(100)).unwrap();

        assert_eq!(s.trip_id(), Some("trip-2"));
        assert!(s.current_location().is_none());
        assert_eq!(s.stats().accepted_samples, 0);
    }

    #[test]
    fn permission_revocation_force_stops() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.authorization_changed(AuthorizationStatus::Denied, at(50));
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn battery_drop_forces_low_tier() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.battery_changed(BatteryState::new(0.15, false));
        assert_eq!(s.tier(), AccuracyTier::Low);
        // Effective precision is the hundred-meter class or coarser.
        assert!(s.effective_settings().precision_m >= 100.0);
    }

    #[test]
    fn background_deescalates_high_tier() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.set_accuracy(AccuracyTier::Navigation).unwrap();
        s.lifecycle_changed(AppLifecycle::Background, at(10));
        assert_eq!(s.tier(), AccuracyTier::Balanced);
    }

    #[test]
    fn pause_deadline_fires_through_generation_guard() {
        let mut s = granted_session();
        s.start("trip-1", "user-1", at(0)).unwrap();
        s.ingest(sample(0, 0.0), at(0));

        let (deadline, generation) = s.pause_deadline().unwrap();
        s.pause_deadline_elapsed(generation, deadline);
        assert!(s.is_paused());
        assert!(s.take_events().contains(&SessionEvent::Paused));

        // A stale generation does nothing.
        s.ingest(sample(400, 200.0), at(400));
        let events = s.take_events();
        assert!(events.contains(&SessionEvent::Resumed));
        s.pause_deadline_elapsed(generation, at(800));
        assert!(!s.is_paused());
    }
}
