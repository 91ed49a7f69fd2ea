//! Caller-visible error taxonomy.
//!
//! Deliberately small: filtering, backpressure, and transient commit
//! failures are resolved inside the engine (rejected samples are counted,
//! failed commits fall back to the offline queue). Only failures that need a
//! caller decision surface here.

/// Errors surfaced by [`TrackingSession`](crate::tracking::session::TrackingSession)
/// operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// Tracking requires location permission; a permission request has been
    /// triggered. Recoverable by granting and retrying.
    #[error("location permission not granted")]
    PermissionDenied,

    /// A manual memory was requested with neither an override location nor a
    /// current accepted sample.
    #[error("no location available for manual memory")]
    NoLocationAvailable,

    /// The operation is only valid while a tracking session is active.
    #[error("no active tracking session")]
    NotActive,
}
