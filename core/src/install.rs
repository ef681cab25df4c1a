//! Package installation on the workload.
//!
//! Runs the distribution package steps through the exec seam before the
//! first reconciliation. Installation is outside the reconciliation core:
//! a failure blocks the unit with a fixed message and halts setup for that
//! event only — later events retry from scratch.

use tracing::info;

use crate::infrastructure::Workload;

/// Unit status reason when installation fails.
pub const INSTALL_BLOCKED_MESSAGE: &str = "failed icecc install";

/// Install the compiler-cluster package on the workload.
pub fn ensure_packages(workload: &mut dyn Workload) -> Result<(), String> {
    workload.exec(&["apt", "update", "-y"])?;
    workload.exec(&["apt", "install", "-y", "icecc"])?;
    info!("icecc package installed");
    Ok(())
}
