//! Scoped stage timers.

use std::time::{Duration, Instant};

use tracing::debug;

/// Measures one named stage of a run.
#[must_use = "a timer measures nothing unless stopped"]
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    pub fn stop(self) -> Duration {
        let elapsed = self.started.elapsed();
        debug!(stage = self.stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
        elapsed
    }
}
