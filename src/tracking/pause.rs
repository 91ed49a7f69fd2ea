//! Idle/pause detection.
//!
//! [`PauseDetector`] is a two-state machine (Moving / Paused) driven by
//! displacement from the last significant sample and by an idle deadline.
//! Transitions are edge-triggered: "just paused" and "just resumed" fire
//! exactly once per crossing, never once per sample.
//!
//! The deadline is realized by timestamp comparison on each poll, with a
//! generation counter so an externally scheduled timer that outlived a
//! reschedule is discarded as stale.

use chrono::{DateTime, Duration, Utc};

use crate::config::PauseConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Moving,
    Paused,
}

/// Edge emitted by a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseTransition {
    /// The idle deadline elapsed with no qualifying movement.
    Paused,
    /// Qualifying movement arrived while paused.
    Resumed,
}

#[derive(Debug)]
pub struct PauseDetector {
    config: PauseConfig,
    state: MovementState,
    /// Instant of the last qualifying movement; `None` before `start`.
    last_movement_at: Option<DateTime<Utc>>,
    /// Bumped on every deadline reschedule or cancellation. A timer carrying
    /// an older generation must be ignored when it fires.
    generation: u64,
}

impl PauseDetector {
    pub fn new(config: PauseConfig) -> Self {
        Self {
            config,
            state: MovementState::Moving,
            last_movement_at: None,
            generation: 0,
        }
    }

    /// Arm the detector at session start: Moving, deadline from `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.state = MovementState::Moving;
        self.last_movement_at = Some(now);
        self.generation += 1;
    }

    /// Disarm on session stop. Outstanding timers become stale.
    pub fn stop(&mut self) {
        self.last_movement_at = None;
        self.generation += 1;
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == MovementState::Paused
    }

    /// Feed the displacement of an accepted sample from the current
    /// significant anchor.
    ///
    /// Qualifying movement resets the idle deadline and resumes a paused
    /// session; non-qualifying movement may let the deadline lapse.
    pub fn observe(&mut self, displacement_m: f64, now: DateTime<Utc>) -> Option<PauseTransition> {
        if displacement_m >= self.config.min_movement_m {
            self.last_movement_at = Some(now);
            self.generation += 1;
            if self.state == MovementState::Paused {
                self.state = MovementState::Moving;
                return Some(PauseTransition::Resumed);
            }
            return None;
        }

        self.check_deadline(now)
    }

    /// Poll the idle deadline. Fires the Paused edge at most once.
    pub fn check_deadline(&mut self, now: DateTime<Utc>) -> Option<PauseTransition> {
        if self.state == MovementState::Paused {
            return None;
        }
        let armed_at = self.last_movement_at?;
        if now - armed_at >= Duration::seconds(self.config.idle_timeout_secs) {
            self.state = MovementState::Paused;
            return Some(PauseTransition::Paused);
        }
        None
    }

    /// Deadline check for an externally scheduled timer. A stale
    /// `generation` is a no-op.
    pub fn check_deadline_if_current(
        &mut self,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Option<PauseTransition> {
        if generation != self.generation {
            return None;
        }
        self.check_deadline(now)
    }

    /// The instant the idle deadline elapses, while armed and Moving.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        if self.state == MovementState::Paused {
            return None;
        }
        self.last_movement_at
            .map(|t| t + Duration::seconds(self.config.idle_timeout_secs))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn detector() -> PauseDetector {
        let mut d = PauseDetector::new(PauseConfig::default());
        d.start(at(0));
        d
    }

    #[test]
    fn starts_moving() {
        let d = detector();
        assert_eq!(d.state(), MovementState::Moving);
        assert_eq!(d.deadline(), Some(at(300)));
    }

    #[test]
    fn qualifying_movement_resets_deadline() {
        let mut d = detector();
        assert_eq!(d.observe(12.0, at(100)), None);
        assert_eq!(d.deadline(), Some(at(400)));
    }

    #[test]
    fn sub_threshold_movement_does_not_reset() {
        let mut d = detector();
        assert_eq!(d.observe(3.0, at(100)), None);
        assert_eq!(d.deadline(), Some(at(300)));
    }

    #[test]
    fn pause_edge_fires_exactly_once() {
        let mut d = detector();
        // A stream of jitter samples long past the deadline: one edge only.
        assert_eq!(d.observe(1.0, at(301)), Some(PauseTransition::Paused));
        assert_eq!(d.observe(2.0, at(320)), None);
        assert_eq!(d.observe(0.5, at(400)), None);
        assert!(d.is_paused());
    }

    #[test]
    fn resume_edge_fires_once_on_qualifying_movement() {
        let mut d = detector();
        assert_eq!(d.check_deadline(at(301)), Some(PauseTransition::Paused));
        assert_eq!(d.observe(10.0, at(350)), Some(PauseTransition::Resumed));
        assert_eq!(d.observe(10.0, at(360)), None);
        assert_eq!(d.state(), MovementState::Moving);
    }

    #[test]
    fn pause_resume_cycle_repeats() {
        let mut d = detector();
        assert_eq!(d.check_deadline(at(301)), Some(PauseTransition::Paused));
        assert_eq!(d.observe(10.0, at(350)), Some(PauseTransition::Resumed));
        // Deadline re-armed from the resume movement.
        assert_eq!(d.check_deadline(at(600)), None);
        assert_eq!(d.check_deadline(at(651)), Some(PauseTransition::Paused));
    }

    #[test]
    fn stale_generation_is_a_no_op() {
        let mut d = detector();
        let armed_gen = d.generation();
        // Movement reschedules the deadline, invalidating the old timer.
        d.observe(20.0, at(200));
        assert_eq!(d.check_deadline_if_current(armed_gen, at(301)), None);
        assert_eq!(d.state(), MovementState::Moving);
        // The current generation still fires.
        let gen = d.generation();
        assert_eq!(
            d.check_deadline_if_current(gen, at(501)),
            Some(PauseTransition::Paused)
        );
    }

    #[test]
    fn stop_disarms_deadline() {
        let mut d = detector();
        let gen = d.generation();
        d.stop();
        assert_eq!(d.deadline(), None);
        assert_eq!(d.check_deadline_if_current(gen, at(1000)), None);
        assert_eq!(d.check_deadline(at(1000)), None);
    }

    #[test]
    fn no_deadline_while_paused() {
        let mut d = detector();
        d.check_deadline(at(301));
        assert!(d.is_paused());
        assert_eq!(d.deadline(), None);
    }
}
