//! Single-consumer event loop around a [`TrackingSession`].
//!
//! The location provider, battery monitor and app lifecycle are push-based
//! external producers. Rather than letting their callbacks re-enter the
//! session, everything funnels through one mpsc channel consumed by a single
//! tokio task that owns the session — every mutation is serialized by
//! construction.
//!
//! The pause deadline is realized here as a cancellable sleep: each loop
//! iteration re-reads the detector's (deadline, generation) pair, and a
//! firing whose generation no longer matches is discarded by the session.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::tracking::session::{SessionEvent, TrackingSession};
use crate::tracking::types::{
    AccuracyTier, AppLifecycle, AuthorizationStatus, BatteryState, LocationSample,
};

/// Caller-initiated operations.
#[derive(Debug, Clone)]
pub enum Command {
    Start {
        trip_id: String,
        user_id: String,
    },
    Stop,
    SetAccuracy(AccuracyTier),
    ManualEvent {
        title: String,
        content: Option<String>,
        location_override: Option<(f64, f64)>,
    },
    /// Explicit offline-queue drain.
    Sync,
    /// Stop the loop and return the session.
    Shutdown,
}

/// Everything that can reach the session, producers and callers alike.
#[derive(Debug, Clone)]
pub enum Input {
    Sample(LocationSample),
    Battery(BatteryState),
    Authorization(AuthorizationStatus),
    Lifecycle(AppLifecycle),
    LowMemory,
    Command(Command),
}

/// Cheap, cloneable handle onto a running session loop.
#[derive(Clone)]
pub struct SessionHandle {
    inputs: mpsc::UnboundedSender<Input>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Enqueue an input. Returns false if the loop has shut down.
    pub fn send(&self, input: Input) -> bool {
        self.inputs.send(input).is_ok()
    }

    /// Subscribe to session events. Slow subscribers may miss events
    /// (broadcast semantics); the session itself is unaffected.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Spawn the session loop. The join handle resolves to the session once a
/// `Shutdown` command arrives or every handle is dropped.
pub fn spawn(session: TrackingSession) -> (SessionHandle, tokio::task::JoinHandle<TrackingSession>) {
    let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
    let (events_tx, _) = broadcast::channel(256);

    let handle = SessionHandle {
        inputs: inputs_tx,
        events: events_tx.clone(),
    };
    let join = tokio::spawn(run_loop(session, inputs_rx, events_tx));
    (handle, join)
}

async fn run_loop(
    mut session: TrackingSession,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    events: broadcast::Sender<SessionEvent>,
) -> TrackingSession {
    loop {
        let deadline = session.pause_deadline();

        tokio::select! {
            maybe_input = inputs.recv() => {
                match maybe_input {
                    None | Some(Input::Command(Command::Shutdown)) => break,
                    Some(input) => apply_input(&mut session, input, &events),
                }
            }
            _ = sleep_until_deadline(deadline) => {
                if let Some((_, generation)) = deadline {
                    session.pause_deadline_elapsed(generation, Utc::now());
                }
            }
        }

        forward_events(&mut session, &events);
    }

    debug!("session loop shutting down");
    forward_events(&mut session, &events);
    session
}

fn apply_input(session: &mut TrackingSession, input: Input, events: &broadcast::Sender<SessionEvent>) {
    let now = Utc::now();
    match input {
        Input::Sample(sample) => session.ingest(sample, now),
        Input::Battery(battery) => session.battery_changed(battery),
        Input::Authorization(status) => session.authorization_changed(status, now),
        Input::Lifecycle(phase) => session.lifecycle_changed(phase, now),
        Input::LowMemory => session.low_memory(),
        Input::Command(command) => apply_command(session, command, now, events),
    }
}

fn apply_command(
    session: &mut TrackingSession,
    command: Command,
    now: DateTime<Utc>,
    events: &broadcast::Sender<SessionEvent>,
) {
    let result: (&'static str, Result<(), SessionError>) = match command {
        Command::Start { trip_id, user_id } => ("start", session.start(trip_id, user_id, now)),
        Command::Stop => ("stop", session.stop(now).map(|_| ())),
        Command::SetAccuracy(tier) => ("set_accuracy", session.set_accuracy(tier)),
        Command::ManualEvent {
            title,
            content,
            location_override,
        } => (
            "manual_event",
            session.manual_event(title, content, location_override, now),
        ),
        Command::Sync => {
            session.sync();
            ("sync", Ok(()))
        }
        // Handled by the loop before dispatch.
        Command::Shutdown => ("shutdown", Ok(())),
    };

    if let (operation, Err(error)) = result {
        warn!(operation, %error, "session command rejected");
        let _ = events.send(SessionEvent::OperationFailed { operation, error });
    }
}

/// Sleep until the pause deadline, or forever when none is armed.
async fn sleep_until_deadline(deadline: Option<(DateTime<Utc>, u64)>) {
    match deadline {
        Some((when, _)) => {
            let delta = (when - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delta).await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn forward_events(session: &mut TrackingSession, events: &broadcast::Sender<SessionEvent>) {
    for event in session.take_events() {
        // Send fails only with zero subscribers, which is fine.
        let _ = events.send(event);
    }
}
