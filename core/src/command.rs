//! Command — the typed interface for all icefleet daemon operations.
//!
//! Every operation that can be dispatched through `Sys::execute()` is a
//! variant of the `Command` enum: the lifecycle events delivered by the
//! surrounding platform, the queries and actions exposed to operators, and
//! daemon control. The enum serves as both the wire format (JSON over the
//! Unix socket) and the API documentation for the core crate.
//!
//! # Wire Format
//!
//! Commands are serialized as JSON objects with a `"command"` discriminant:
//!
//! ```json
//! {"command": "event.workload-ready"}
//! {"command": "diag", "fail": "boom"}
//! {"command": "scheduler.address"}
//! ```
//!
//! The serde `tag = "command"` attribute handles this automatically.
//!
//! # Command Groups
//!
//! | Group | Commands |
//! |-------|----------|
//! | Lifecycle events | `event.workload-ready`, `event.peers-changed`, `event.config-changed` |
//! | Queries | `status`, `scheduler.address`, `cache.stats` |
//! | Actions | `diag` |
//! | Daemon | `daemon.run`, `daemon.stop` |

use serde::{Deserialize, Serialize};


/// A typed command sent to the icefleet daemon.
///
/// Each variant corresponds to exactly one operation in `Sys::execute()`,
/// which matches on this enum exhaustively — there is no attribute probing
/// and no catch-all handler. The `#[serde(tag = "command")]` attribute
/// produces internally-tagged JSON where the `"command"` key selects the
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Lifecycle events (delivered serially by the platform)
    // -----------------------------------------------------------------

    /// The workload became ready: install packages, then reconcile.
    #[serde(rename = "event.workload-ready")]
    WorkloadReady,

    /// Peer-published data changed (e.g. the leader published the
    /// scheduler address): reconcile.
    #[serde(rename = "event.peers-changed")]
    PeersChanged,

    /// Configuration changed: record the newly observed value, then
    /// reconcile.
    #[serde(rename = "event.config-changed")]
    ConfigChanged,

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Return a one-line summary of unit state.
    #[serde(rename = "status")]
    Status,

    /// Return the currently known scheduler address, if any.
    #[serde(rename = "scheduler.address")]
    SchedulerAddress,

    /// Return raw cache statistics from the workload. Fails when the
    /// workload is unreachable.
    #[serde(rename = "cache.stats")]
    CacheStats,

    // -----------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------

    /// Canned diagnostic action: fails with the given reason when `fail`
    /// is non-empty, otherwise returns a fixed payload.
    #[serde(rename = "diag")]
    Diag {
        /// When non-empty, the request fails with this string as reason.
        #[serde(default)]
        fail: String,
    },

    // -----------------------------------------------------------------
    // Daemon control
    // -----------------------------------------------------------------

    /// Run the daemon event loop in the foreground (handled by the CLI).
    #[serde(rename = "daemon.run")]
    DaemonRun,

    /// Stop the running daemon.
    #[serde(rename = "daemon.stop")]
    DaemonStop,
}
