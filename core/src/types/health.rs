//! Health and status outcome types for the reconciliation pipeline.
//!
//! `ServiceQuery` is the typed result of one supervisor running-state probe,
//! `HealthStatus` the terminal verdict of the bounded verification loop, and
//! `StatusUpdate` the reporter's decision about the externally visible unit
//! status.

/// Outcome of a single supervisor query for a service's running flag.
///
/// A query can fail (the service may not be declared yet); that is a distinct
/// outcome from "declared but not running" and never an error the caller has
/// to catch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceQuery {
    Running,
    NotRunning,
    Failed(String),
}

/// Terminal health of a service after verification.
///
/// `Pending` is the value for events that never reached verification
/// (unreachable workload, nothing planned); the verifier itself only
/// produces `Active` or `Blocked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Active,
    Blocked(String),
    Pending,
}

/// The externally visible status of this unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Active,
    Blocked(String),
}

impl UnitStatus {
    /// One-line rendering for the status query output.
    pub fn describe(&self) -> String {
        match self {
            UnitStatus::Active => "active".to_string(),
            UnitStatus::Blocked(reason) => format!("blocked: {}", reason),
        }
    }
}

/// The reporter's decision: set a new unit status, or leave the previous one
/// in place. Events that produced no plan must not downgrade or clear an
/// earlier status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Set(UnitStatus),
    Unchanged,
}
