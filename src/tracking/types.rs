//! Core tracking type definitions.
//!
//! Defines [`LocationSample`] (a single GPS fix), [`AccuracyTier`] (named
//! precision/cadence bundles), [`BatteryState`], and the coarse device
//! signals the engine consumes ([`AuthorizationStatus`], [`AppLifecycle`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, for haversine displacement.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single GPS fix as delivered by the location provider.
///
/// Immutable value type — the engine never mutates a sample, it only decides
/// whether to accept it and what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters. Negative means "invalid fix".
    pub horizontal_accuracy_m: f64,
    /// When the fix was taken (not when it was delivered).
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        horizontal_accuracy_m: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy_m,
            timestamp,
        }
    }

    /// Great-circle displacement to another sample in meters (haversine).
    pub fn displacement_m(&self, other: &LocationSample) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Age of the fix relative to `now` in whole seconds. Never negative.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds().max(0)
    }

    /// Elapsed seconds from this fix to a later one. Never negative.
    pub fn elapsed_secs(&self, later: &LocationSample) -> i64 {
        (later.timestamp - self.timestamp).num_seconds().max(0)
    }
}

/// Named precision/cadence bundle for a tracking session.
///
/// Exactly one tier is active per session. Transitions are driven by
/// [`AccuracyController`](crate::tracking::accuracy::AccuracyController)
/// recommendations applied through the session — never directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    /// Coarse kilometer-class fixes, large displacement filter. Cheapest.
    Low,
    /// Hundred-meter-class fixes — the session default.
    Balanced,
    /// Ten-meter-class fixes for dense urban traces.
    High,
    /// Best available fixes, minimal displacement filter. Most expensive.
    Navigation,
}

impl AccuracyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Balanced => "balanced",
            Self::High => "high",
            Self::Navigation => "navigation",
        }
    }

    /// The requested settings this tier carries, before battery clamping.
    pub fn settings(&self) -> TierSettings {
        match self {
            Self::Low => TierSettings {
                precision_m: 1000.0,
                min_displacement_m: 100.0,
            },
            Self::Balanced => TierSettings {
                precision_m: 100.0,
                min_displacement_m: 25.0,
            },
            Self::High => TierSettings {
                precision_m: 10.0,
                min_displacement_m: 10.0,
            },
            Self::Navigation => TierSettings {
                precision_m: 5.0,
                min_displacement_m: 5.0,
            },
        }
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccuracyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "balanced" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            "navigation" => Ok(Self::Navigation),
            _ => Err(format!("unknown accuracy tier: {s}")),
        }
    }
}

/// The (desired precision, minimum displacement) pair a tier carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSettings {
    /// Desired fix precision in meters (larger = coarser = cheaper).
    pub precision_m: f64,
    /// Minimum displacement between delivered fixes in meters.
    pub min_displacement_m: f64,
}

/// Settings actually handed to the location provider after battery clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSettings {
    pub precision_m: f64,
    pub min_displacement_m: f64,
}

/// Latest battery reading from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Charge level in `[0.0, 1.0]`.
    pub level: f64,
    pub charging: bool,
}

impl BatteryState {
    pub fn new(level: f64, charging: bool) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            charging,
        }
    }
}

impl Default for BatteryState {
    /// Full and unplugged — the assumption until the first real reading.
    fn default() -> Self {
        Self {
            level: 1.0,
            charging: false,
        }
    }
}

/// Location-permission state reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Granted,
}

impl AuthorizationStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Coarse app-lifecycle states consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
    Terminating,
}
