//! Collaborator contracts the engine consumes but never implements.
//!
//! The push half of these collaborators (location fixes, battery readings,
//! lifecycle changes) arrives as messages on the session's input channel;
//! these traits cover only the control surface the session drives.

use crate::queue::PendingEvent;
use crate::tracking::types::EffectiveSettings;

/// Control surface of the platform location service.
pub trait LocationProvider: Send {
    /// Ask the platform to prompt for tracking permission.
    fn request_permission(&mut self);

    /// Request a single fix outside continuous tracking.
    fn request_one_shot_update(&mut self);

    /// Begin (or reconfigure) continuous updates at the given settings.
    fn start_continuous_updates(&mut self, settings: EffectiveSettings);

    fn stop_continuous_updates(&mut self);
}

/// Commits a memory event to the persistence engine.
///
/// A failed commit is not fatal — the session falls back to the offline
/// queue and retries on the next drain.
pub trait PersistenceCommitter: Send {
    /// Returns the id of the persisted memory.
    fn commit(&mut self, event: &PendingEvent) -> anyhow::Result<String>;
}

/// Provider that ignores every control call. Used by replay tooling, where
/// samples come from a recorded trace rather than live hardware.
#[derive(Debug, Default)]
pub struct NoopProvider;

impl LocationProvider for NoopProvider {
    fn request_permission(&mut self) {}
    fn request_one_shot_update(&mut self) {}
    fn start_continuous_updates(&mut self, _settings: EffectiveSettings) {}
    fn stop_continuous_updates(&mut self) {}
}
