//! Status reporter — maps health outcomes to the externally visible status.

use crate::types::health::{HealthStatus, StatusUpdate, UnitStatus};

/// Decide what to do with the unit status after an event.
///
/// `Active` and `Blocked` set the status; `Pending` (nothing was planned or
/// verified this event) leaves the previous status in place — an event that
/// produced no plan must never downgrade or clear an earlier status.
pub fn report(health: &HealthStatus) -> StatusUpdate {
    match health {
        HealthStatus::Active => StatusUpdate::Set(UnitStatus::Active),
        HealthStatus::Blocked(reason) => {
            StatusUpdate::Set(UnitStatus::Blocked(reason.clone()))
        }
        HealthStatus::Pending => StatusUpdate::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_maps_to_active() {
        assert_eq!(
            report(&HealthStatus::Active),
            StatusUpdate::Set(UnitStatus::Active)
        );
    }

    #[test]
    fn blocked_carries_reason() {
        let update = report(&HealthStatus::Blocked(
            "timed out waiting for service worker".into(),
        ));
        assert_eq!(
            update,
            StatusUpdate::Set(UnitStatus::Blocked(
                "timed out waiting for service worker".into()
            ))
        );
    }

    #[test]
    fn pending_leaves_status_unchanged() {
        assert_eq!(report(&HealthStatus::Pending), StatusUpdate::Unchanged);
    }
}
