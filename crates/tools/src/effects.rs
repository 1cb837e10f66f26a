//! Background side-effect processing.
//!
//! The dispatcher invokes an effect starter before every tool call so
//! the persistence scheduler is running before any mutation is
//! described. Startup must be idempotent: many runs share one process
//! and all of them call the starter on every dispatch.

use std::sync::OnceLock;
use std::time::Duration;

use loomweave_core::tool::EffectStarter;
use std::sync::Arc;
use tracing::{debug, trace};

static SCHEDULER_STARTED: OnceLock<()> = OnceLock::new();

const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// An effect starter that spawns the persistence scheduler at most once
/// per process. Redundant and concurrent invocations are no-ops.
///
/// Must be invoked from within a tokio runtime.
pub fn persistence_starter() -> EffectStarter {
    Arc::new(|| {
        SCHEDULER_STARTED.get_or_init(|| {
            debug!("Starting persistence scheduler");
            tokio::spawn(async {
                let mut interval = tokio::time::interval(TICK_INTERVAL);
                // The first tick fires immediately; skip it.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    trace!("Persistence scheduler tick");
                }
            });
        });
    })
}
