//! Automatic memory-creation policy.
//!
//! Decides whether an accepted sample should become a persisted "place
//! visited" memory. Manual creation bypasses this entirely. The decision is
//! displacement-or-elapsed-time from the last significant sample, with
//! thresholds that widen as the battery drains so a scarce charge produces
//! fewer automatic memories.

use crate::config::EventsConfig;
use crate::tracking::types::LocationSample;

pub struct EventPolicy {
    config: EventsConfig,
}

impl EventPolicy {
    pub fn new(config: EventsConfig) -> Self {
        Self { config }
    }

    /// Should `sample` trigger an automatic memory?
    ///
    /// With no prior significant sample only an actively tracking session
    /// emits (the first fix of a trip is a place worth remembering; an
    /// ad-hoc idle fix is not). The caller moves the significant anchor on a
    /// positive decision — the policy itself is stateless.
    pub fn should_emit(
        &self,
        sample: &LocationSample,
        last_significant: Option<&LocationSample>,
        battery_level: f64,
        is_tracking: bool,
    ) -> bool {
        let Some(anchor) = last_significant else {
            return is_tracking;
        };

        let (min_distance_m, min_interval_secs) = self.thresholds_for(battery_level);

        anchor.displacement_m(sample) >= min_distance_m
            || anchor.elapsed_secs(sample) >= min_interval_secs
    }

    /// (distance, interval) thresholds for the given charge level.
    fn thresholds_for(&self, battery_level: f64) -> (f64, i64) {
        let cfg = &self.config;
        if battery_level < cfg.low_battery_level {
            (cfg.low_distance_m, cfg.low_interval_secs)
        } else if battery_level < cfg.reduced_battery_level {
            (cfg.reduced_distance_m, cfg.reduced_interval_secs)
        } else {
            (cfg.min_distance_m, cfg.min_interval_secs)
        }
    }
}
