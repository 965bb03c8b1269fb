//! Host poll loop.
//!
//! Calls [`SessionEngine::poll`] on a fixed period while the session is
//! running. The loop ends when the session completes, stops running for
//! any other reason, or the shutdown future resolves.

use core::future::Future;
use std::time::Duration;

use simmer_core::{PollOutcome, SessionEngine};
use simmer_ledger::Ledger;
use simmer_types::{Recipe, SessionState};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Why the poll loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The session finished and its result was credited.
    Completed(Recipe),
    /// The session was not running (idle, paused, or still pending).
    NotRunning(SessionState),
    /// Shutdown was requested while the session was still running.
    Interrupted,
}

/// Poll `engine` every `period` until it stops running or `shutdown`
/// resolves.
pub async fn run_until_done<S>(
    engine: &mut SessionEngine,
    ledger: &mut Ledger,
    period: Duration,
    shutdown: S,
) -> LoopExit
where
    S: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    debug!(period_ms = period.as_millis(), "Entering poll loop");
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(
                    remaining_secs = engine.remaining_seconds(),
                    "Shutdown requested, session left running"
                );
                return LoopExit::Interrupted;
            }
            _ = interval.tick() => {}
        }

        match engine.poll(ledger) {
            PollOutcome::Running { .. } => {}
            PollOutcome::Completed(recipe) => return LoopExit::Completed(recipe),
            PollOutcome::Idle | PollOutcome::Pending | PollOutcome::Paused { .. } => {
                return LoopExit::NotRunning(engine.state());
            }
        }
    }
}
