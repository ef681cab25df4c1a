//! Convergence — the reconciliation control loop.
//!
//! One pass per lifecycle event: build a cluster snapshot, plan the desired
//! service topology, converge the supervisor's declared set, verify health
//! with bounded polling, and report the unit status. Stages run
//! synchronously; the surrounding platform guarantees no two passes for the
//! same unit overlap.

pub mod executor;
pub mod health;
pub mod planner;
pub mod snapshot;
pub mod status;

use tracing::{debug, warn};

use crate::data::settings::Settings;
use crate::infrastructure::Platform;
use crate::types::health::{HealthStatus, StatusUpdate};

use health::PollPolicy;

/// Run one reconciliation pass.
///
/// Absorbs unreachable-workload and missing-prerequisite conditions locally
/// (status unchanged); only verification outcomes surface as status changes.
pub fn reconcile(
    platform: &mut Platform,
    settings: &Settings,
    policy: &PollPolicy,
) -> StatusUpdate {
    let snapshot = snapshot::build(platform, settings);

    let desired = match planner::plan(&snapshot) {
        Some(def) => def,
        None => {
            if !snapshot.connected {
                debug!("workload unreachable, leaving service state untouched");
            } else if !snapshot.is_leader && snapshot.scheduler_address.is_none() {
                debug!("no scheduler address published yet, waiting on leader");
            }
            return status::report(&HealthStatus::Pending);
        }
    };

    // A failed apply is not terminal here: the verifier below bounds the
    // damage and reports the timeout if the service never comes up.
    if let Err(e) = executor::apply(platform.workload.as_mut(), Some(&desired)) {
        warn!(service = %desired.name, error = %e, "failed to apply service layer");
    }

    let health = health::verify(
        platform.workload.as_ref(),
        platform.clock.as_ref(),
        &desired.name,
        policy,
    );

    if snapshot.is_leader && health == HealthStatus::Active {
        match platform.membership.bind_address() {
            Some(addr) => {
                if let Err(e) = platform.peers.publish_scheduler_address(&addr) {
                    warn!(error = %e, "failed to publish scheduler address");
                }
            }
            None => debug!("no bind address available, scheduler address not published"),
        }
    }

    status::report(&health)
}
