//! Health verifier — bounded polling for a service's running state.
//!
//! The retry policy (interval, attempt budget) is plain data; the sleep is
//! an injected `Clock` so tests run instantly. Per-attempt query failures
//! are typed outcomes that get logged and retried, never errors that abort
//! the loop — the wall-clock bound of `interval × max_attempts` holds
//! regardless of how attempts fail.

use std::time::Duration;

use tracing::{debug, warn};

use crate::infrastructure::{Clock, Workload};
use crate::types::health::{HealthStatus, ServiceQuery};

/// How often and how many times to poll before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Attempt budget; must be positive.
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    /// Default: 10 attempts, one second apart.
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

/// Poll the supervisor until the named service reports running or the
/// attempt budget is exhausted.
///
/// Returns `Active` on the first successful attempt without consuming the
/// remaining budget; `Blocked` when all attempts are spent.
pub fn verify(
    workload: &dyn Workload,
    clock: &dyn Clock,
    name: &str,
    policy: &PollPolicy,
) -> HealthStatus {
    for attempt in 1..=policy.max_attempts {
        match workload.service_running(name) {
            ServiceQuery::Running => {
                debug!(service = name, attempt, "service is running");
                return HealthStatus::Active;
            }
            ServiceQuery::NotRunning => {
                debug!(service = name, attempt, "service not running yet");
            }
            ServiceQuery::Failed(reason) => {
                warn!(service = name, attempt, %reason, "health query failed");
            }
        }
        clock.sleep(policy.interval);
    }
    HealthStatus::Blocked(format!("timed out waiting for service {}", name))
}
