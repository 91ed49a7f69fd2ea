//! Sample validation and rate limiting.
//!
//! [`LocationFilter`] is a pure decision function over (new sample, last
//! accepted sample, tracking flag, battery level). It rejects stale fixes,
//! fixes with implausible accuracy, and fixes arriving too fast and too close
//! to the previous one. Rejections are silent no-ops at the session level —
//! they are counted, never surfaced as errors.

use chrono::{DateTime, Utc};

use crate::config::FilterConfig;
use crate::tracking::types::LocationSample;

/// Why a sample was rejected. Used for diagnostics counting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fix is older than the maximum sample age.
    Stale,
    /// Horizontal accuracy is negative (invalid-fix sentinel) or worse than
    /// the acceptance ceiling.
    InvalidAccuracy,
    /// Too soon and too near relative to the previously accepted sample.
    RateLimited,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::InvalidAccuracy => "invalid_accuracy",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Everything the filter needs to know beyond the sample itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub last_accepted: Option<&'a LocationSample>,
    /// Whether an active session is consuming continuous updates. Tracking
    /// uses the looser thresholds; ad-hoc/idle use the stricter ones.
    pub is_tracking: bool,
    /// Battery charge level in `[0.0, 1.0]`.
    pub battery_level: f64,
    pub now: DateTime<Utc>,
}

pub struct LocationFilter {
    config: FilterConfig,
}

impl LocationFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Decide whether `sample` may update tracked state.
    ///
    /// `Ok(())` means accepted; `Err` carries the rejection reason.
    pub fn evaluate(&self, sample: &LocationSample, ctx: FilterContext<'_>) -> Result<(), Rejection> {
        let cfg = &self.config;

        if sample.age_secs(ctx.now) > cfg.max_sample_age_secs {
            return Err(Rejection::Stale);
        }

        if sample.horizontal_accuracy_m < 0.0 || sample.horizontal_accuracy_m > cfg.max_accuracy_m {
            return Err(Rejection::InvalidAccuracy);
        }

        let Some(prev) = ctx.last_accepted else {
            return Ok(());
        };

        // A poor fix on either side means the position is uncertain enough
        // that a fresh fix matters more than rate limiting.
        if prev.horizontal_accuracy_m > cfg.poor_accuracy_m
            || sample.horizontal_accuracy_m > cfg.poor_accuracy_m
        {
            return Ok(());
        }

        let (base_interval, base_distance) = if ctx.is_tracking {
            (cfg.tracking_min_interval_secs, cfg.tracking_min_distance_m)
        } else {
            (cfg.idle_min_interval_secs, cfg.idle_min_distance_m)
        };

        let factor = if ctx.battery_level < cfg.critical_battery_level {
            cfg.critical_battery_rate_factor
        } else if ctx.battery_level < cfg.low_battery_level {
            cfg.low_battery_rate_factor
        } else {
            1.0
        };

        let min_interval_secs = base_interval as f64 * factor;
        let min_distance_m = base_distance * factor;

        let elapsed = prev.elapsed_secs(sample) as f64;
        let displacement = prev.displacement_m(sample);

        if elapsed < min_interval_secs && displacement < min_distance_m {
            return Err(Rejection::RateLimited);
        }

        Ok(())
    }
}
