//! Battery-aware accuracy control.
//!
//! Two responsibilities: clamp a requested [`AccuracyTier`]'s settings to
//! what the current battery state affords ([`AccuracyController::effective_settings`]),
//! and recommend tier changes when the battery level crosses fixed thresholds
//! or the charger is plugged/unplugged ([`AccuracyController::recommend_tier`]).
//! Recommendations are advisory — the session decides whether to apply them.

use crate::tracking::types::{AccuracyTier, BatteryState, EffectiveSettings};

/// Below this level (on battery) precision is forced to the hundred-meter class.
const CRITICAL_LEVEL: f64 = 0.20;
/// Below this level (on battery) precision is clamped to the ten-meter class.
const CONSERVE_LEVEL: f64 = 0.50;
/// Unplugging below this level forces the Low tier.
const UNPLUG_FORCE_LOW_LEVEL: f64 = 0.30;
/// Above this level a Low tier is restored to Balanced.
const RESTORE_LEVEL: f64 = 0.50;

/// Coarsest precision class imposed under critical battery (meters).
const HUNDRED_METER_CLASS: f64 = 100.0;
/// Finest precision class allowed while conserving (meters).
const TEN_METER_CLASS: f64 = 10.0;
/// Displacement floor while conserving (meters).
const CONSERVE_DISPLACEMENT_FLOOR: f64 = 25.0;

/// Maps battery state to effective sampling settings and tier recommendations.
///
/// Holds no state beyond the last battery reading, which is needed only to
/// detect charging-state transitions.
#[derive(Debug, Default)]
pub struct AccuracyController {
    last_battery: Option<BatteryState>,
}

impl AccuracyController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp `tier`'s requested settings to the current battery state.
    ///
    /// Deterministic given (tier, battery); charging lifts all clamps.
    pub fn effective_settings(tier: AccuracyTier, battery: BatteryState) -> EffectiveSettings {
        let requested = tier.settings();

        if !battery.charging && battery.level < CRITICAL_LEVEL {
            return EffectiveSettings {
                precision_m: requested.precision_m.max(HUNDRED_METER_CLASS),
                min_displacement_m: requested.min_displacement_m.max(CONSERVE_DISPLACEMENT_FLOOR),
            };
        }

        if !battery.charging && battery.level < CONSERVE_LEVEL {
            return EffectiveSettings {
                precision_m: requested.precision_m.max(TEN_METER_CLASS),
                min_displacement_m: requested.min_displacement_m.max(CONSERVE_DISPLACEMENT_FLOOR),
            };
        }

        EffectiveSettings {
            precision_m: requested.precision_m,
            min_displacement_m: requested.min_displacement_m,
        }
    }

    /// Recommend a tier change for a new battery reading, or `None` to keep
    /// the current tier.
    ///
    /// Consumes the reading: charging transitions are detected against the
    /// previous one.
    pub fn recommend_tier(
        &mut self,
        current: AccuracyTier,
        battery: BatteryState,
    ) -> Option<AccuracyTier> {
        let prev = self.last_battery.replace(battery);
        let began_charging = prev.is_some_and(|p| !p.charging && battery.charging);
        let unplugged = prev.is_some_and(|p| p.charging && !battery.charging);

        if !battery.charging && battery.level < CRITICAL_LEVEL {
            return (current != AccuracyTier::Low).then_some(AccuracyTier::Low);
        }

        if unplugged && battery.level < UNPLUG_FORCE_LOW_LEVEL {
            return (current != AccuracyTier::Low).then_some(AccuracyTier::Low);
        }

        if began_charging && current == AccuracyTier::Low {
            return Some(AccuracyTier::Balanced);
        }

        if battery.level > RESTORE_LEVEL && current == AccuracyTier::Low {
            return Some(AccuracyTier::Balanced);
        }

        None
    }
}
