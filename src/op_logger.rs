use std::fmt::Display;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Rate-limited logging for an operation that fails repeatedly.
///
/// A dead collector or a full disk produces the same failure on every
/// attempt. The first failure is logged, then at most one summary per
/// interval with the number of failures swallowed, and a single info line
/// once the operation succeeds again.
#[derive(Debug)]
pub struct OperationLogger {
    operation: &'static str,
    interval: Duration,
    state: Mutex<FailureState>,
}

#[derive(Debug, Default)]
struct FailureState {
    failing: bool,
    last_logged: Option<Instant>,
    suppressed: u64,
}

impl OperationLogger {
    pub fn new(operation: &'static str) -> Self {
        Self::with_interval(operation, DEFAULT_INTERVAL)
    }

    pub fn with_interval(operation: &'static str, interval: Duration) -> Self {
        Self {
            operation,
            interval,
            state: Mutex::new(FailureState::default()),
        }
    }

    /// Returns `true` if the failure was logged, `false` if it was suppressed.
    pub fn record_failure(&self, message: impl Display) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let due = match state.last_logged {
            None => true,
            Some(at) => !state.failing || at.elapsed() >= self.interval,
        };

        state.failing = true;
        if !due {
            state.suppressed += 1;
            return false;
        }

        let suppressed = std::mem::take(&mut state.suppressed);
        state.last_logged = Some(Instant::now());
        drop(state);

        if suppressed > 0 {
            warn!(
                operation = self.operation,
                suppressed,
                "{} failed: {} (and {} more failures since last report)",
                self.operation,
                message,
                suppressed
            );
        } else {
            warn!(operation = self.operation, "{} failed: {}", self.operation, message);
        }
        true
    }

    /// Returns `true` if this success ended a failure streak.
    pub fn record_success(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if !state.failing {
            return false;
        }
        state.failing = false;
        state.suppressed = 0;
        drop(state);

        info!(operation = self.operation, "{} recovered", self.operation);
        true
    }
}
