use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::command::Command;
use crate::convergence::{self, health::PollPolicy};
use crate::data::{settings::Settings, Data};
use crate::infrastructure::local::{
    FilePeerStore, FsMounts, LocalWorkload, StaticMembership, SystemClock,
};
use crate::infrastructure::Platform;
use crate::install::{self, INSTALL_BLOCKED_MESSAGE};
use crate::types::health::{StatusUpdate, UnitStatus};
use crate::types::response::Response;

/// Fixed payload returned by the diagnostic action.
const DIAG_PAYLOAD: &str = "A bug in the code is worth two in the documentation.";

/// Central runtime for the icefleet daemon. Owns all state and dispatches
/// commands.
///
/// `Sys` wraps a `Data` store, a mutable copy of `Settings` for runtime
/// overrides, the platform collaborators, and the last unit status set by a
/// reconciliation. The platform delivers one command at a time, so nothing
/// here locks.
pub struct Sys {
    data: Data,
    settings: Settings,
    platform: Platform,
    unit_status: Option<UnitStatus>,
}

impl Sys {
    /// Create a new Sys from a config directory, wiring the local-host
    /// platform implementations from settings.
    pub fn new(config_dir: &Path) -> Result<Sys, String> {
        let data = Data::new(config_dir)?;
        let settings = data.settings().clone();
        let platform = local_platform(config_dir, &settings);
        Ok(Sys {
            data,
            settings,
            platform,
            unit_status: None,
        })
    }

    /// Create a Sys from pre-built parts. Useful for testing.
    pub fn from_parts(data: Data, platform: Platform) -> Sys {
        let settings = data.settings().clone();
        Sys {
            data,
            settings,
            platform,
            unit_status: None,
        }
    }

    /// The single dispatch method. Every command enters here.
    pub fn execute(&mut self, cmd: Command) -> Response {
        match cmd {
            Command::WorkloadReady => self.on_workload_ready(),
            Command::PeersChanged => self.on_peers_changed(),
            Command::ConfigChanged => self.on_config_changed(),
            Command::Status => self.cmd_status(),
            Command::SchedulerAddress => self.cmd_scheduler_address(),
            Command::CacheStats => self.cmd_cache_stats(),
            Command::Diag { fail } => self.cmd_diag(fail),
            // daemon.run never reaches a running daemon; the CLI handles it.
            Command::DaemonRun => Response::error("daemon.run is handled by the CLI"),
            Command::DaemonStop => Response::ok("daemon stopping"),
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle event handlers
    // -----------------------------------------------------------------

    fn on_workload_ready(&mut self) -> Response {
        if !self.platform.workload.can_connect() {
            debug!("workload unreachable, skipping install and reconciliation");
            return Response::ok("workload unreachable, nothing to do");
        }

        if let Err(e) = install::ensure_packages(self.platform.workload.as_mut()) {
            error!(error = %e, "package installation failed");
            let status = UnitStatus::Blocked(INSTALL_BLOCKED_MESSAGE.into());
            let output = format!("status: {}", status.describe());
            self.unit_status = Some(status);
            return Response::ok(output);
        }

        self.reconcile_and_report()
    }

    fn on_peers_changed(&mut self) -> Response {
        self.reconcile_and_report()
    }

    fn on_config_changed(&mut self) -> Response {
        let tag = self.settings.cluster_tag.clone();
        // An unset tag is not an observation.
        if !tag.is_empty() {
            match self.data.store_mut().record_tag(&tag) {
                Ok(true) => debug!(%tag, "observed new configuration value"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "failed to persist observed value"),
            }
        }
        self.reconcile_and_report()
    }

    /// Run one reconciliation pass and fold the outcome into the unit status.
    fn reconcile_and_report(&mut self) -> Response {
        let policy = self.poll_policy();
        match convergence::reconcile(&mut self.platform, &self.settings, &policy) {
            StatusUpdate::Set(status) => {
                let output = format!("status: {}", status.describe());
                self.unit_status = Some(status);
                Response::ok(output)
            }
            StatusUpdate::Unchanged => Response::ok("status unchanged"),
        }
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.settings.health_poll_interval),
            self.settings.health_poll_attempts,
        )
    }

    // -----------------------------------------------------------------
    // Queries and actions
    // -----------------------------------------------------------------

    fn cmd_status(&mut self) -> Response {
        let status = self
            .unit_status
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_else(|| "unset".into());
        let services = self.platform.workload.declared_services();
        let names = if services.is_empty() {
            "(none)".to_string()
        } else {
            services.names().join(", ")
        };
        Response::ok(format!(
            "status: {} | declared services: {} | observed tags: {}",
            status,
            names,
            self.data.store().observed_tags().len()
        ))
    }

    fn cmd_scheduler_address(&mut self) -> Response {
        match self.platform.peers.scheduler_address() {
            Some(addr) => Response::ok(addr),
            None => Response::ok("(none)"),
        }
    }

    fn cmd_cache_stats(&mut self) -> Response {
        if !self.platform.workload.can_connect() {
            return Response::error("not connected to workload");
        }
        match self.platform.workload.exec(&["ccache", "-s"]) {
            Ok(stdout) => Response::ok(stdout),
            Err(e) => Response::error(format!("cache stats failed: {}", e)),
        }
    }

    fn cmd_diag(&mut self, fail: String) -> Response {
        if !fail.is_empty() {
            return Response::error(fail);
        }
        Response::ok(DIAG_PAYLOAD)
    }

    // -----------------------------------------------------------------
    // Inspection (testing, daemon)
    // -----------------------------------------------------------------

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn unit_status(&self) -> Option<&UnitStatus> {
        self.unit_status.as_ref()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

/// Wire the local-host platform implementations from settings.
fn local_platform(config_dir: &Path, settings: &Settings) -> Platform {
    Platform {
        workload: Box::new(LocalWorkload::new()),
        peers: Box::new(FilePeerStore::new(&config_dir.join("peers.json"))),
        mounts: Box::new(FsMounts::new(settings.cache_volume.clone())),
        membership: Box::new(StaticMembership::new(
            settings.leader,
            settings.bind_address.clone(),
        )),
        clock: Box::new(SystemClock),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::settings;
    use crate::infrastructure::mock::{
        mock_platform, MockMembership, MockPeerStore, MockWorkload,
    };
    use crate::types::service::{SCHEDULER_SERVICE, WORKER_SERVICE};
    use std::path::PathBuf;

    fn test_data(suffix: &str, configure: impl FnOnce(&mut Settings)) -> Data {
        let dir = std::env::temp_dir().join(format!(
            "icf-sys-test-{}-{}",
            suffix,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let mut cfg = settings::default_settings();
        configure(&mut cfg);
        settings::save(&dir.join("settings.yaml"), &cfg).unwrap();
        Data::new(&dir).unwrap()
    }

    fn test_sys(suffix: &str) -> Sys {
        Sys::from_parts(test_data(suffix, |_| {}), mock_platform())
    }

    #[test]
    fn workload_ready_unreachable_changes_nothing() {
        let mut sys = test_sys("unreachable");
        sys.platform.workload = Box::new(MockWorkload::disconnected());

        let resp = sys.execute(Command::WorkloadReady);
        assert!(matches!(resp, Response::Ok { .. }));
        assert!(sys.unit_status().is_none());
        assert!(sys.platform.workload.declared_services().is_empty());
    }

    #[test]
    fn workload_ready_leader_goes_active() {
        let mut sys = test_sys("leader-active");
        sys.platform.membership = Box::new(MockMembership::leader("10.0.0.5"));
        let mut workload = MockWorkload::new();
        workload.set_running(SCHEDULER_SERVICE);
        sys.platform.workload = Box::new(workload);

        let resp = sys.execute(Command::WorkloadReady);
        match resp {
            Response::Ok { output } => assert!(output.contains("active")),
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
        assert_eq!(sys.unit_status(), Some(&UnitStatus::Active));
        // Leader published its address for the peers.
        assert_eq!(
            sys.platform.peers.scheduler_address().as_deref(),
            Some("10.0.0.5")
        );
        // Scenario 1: scheduler planned, worker untouched.
        let declared = sys.platform.workload.declared_services();
        assert!(declared.contains(SCHEDULER_SERVICE));
        assert!(!declared.contains(WORKER_SERVICE));
    }

    #[test]
    fn install_failure_blocks_and_halts_setup() {
        let mut sys = test_sys("install-fail");
        sys.platform.membership = Box::new(MockMembership::leader("10.0.0.5"));
        let mut workload = MockWorkload::new();
        workload.set_exec_responses(vec![Err("no network".into())]);
        sys.platform.workload = Box::new(workload);

        let resp = sys.execute(Command::WorkloadReady);
        match resp {
            Response::Ok { output } => assert!(output.contains("failed icecc install")),
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
        assert_eq!(
            sys.unit_status(),
            Some(&UnitStatus::Blocked("failed icecc install".into()))
        );
        // Setup halted: nothing was declared this event.
        assert!(sys.platform.workload.declared_services().is_empty());
    }

    #[test]
    fn peers_changed_without_address_keeps_status() {
        let mut sys = test_sys("no-address");
        let resp = sys.execute(Command::PeersChanged);
        match resp {
            Response::Ok { output } => assert_eq!(output, "status unchanged"),
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
        assert!(sys.unit_status().is_none());
    }

    #[test]
    fn peers_changed_with_address_starts_worker() {
        let mut sys = test_sys("worker-start");
        sys.platform.peers = Box::new(MockPeerStore::with_address("10.0.0.5"));
        let mut workload = MockWorkload::new();
        workload.set_running(WORKER_SERVICE);
        sys.platform.workload = Box::new(workload);

        let resp = sys.execute(Command::PeersChanged);
        assert!(matches!(resp, Response::Ok { .. }));
        assert_eq!(sys.unit_status(), Some(&UnitStatus::Active));
        // Scenario 2: command references the published address.
        let declared = sys.platform.workload.declared_services();
        assert_eq!(
            declared.get(WORKER_SERVICE).unwrap().command,
            "iceccd -vvv -s 10.0.0.5"
        );
        assert!(declared.get(WORKER_SERVICE).unwrap().environment.is_empty());
    }

    #[test]
    fn no_plan_event_does_not_downgrade_status() {
        let mut sys = test_sys("keep-status");
        sys.platform.peers = Box::new(MockPeerStore::with_address("10.0.0.5"));
        let mut workload = MockWorkload::new();
        workload.set_running(WORKER_SERVICE);
        sys.platform.workload = Box::new(workload);
        sys.execute(Command::PeersChanged);
        assert_eq!(sys.unit_status(), Some(&UnitStatus::Active));

        // Later event with the workload gone: status must survive.
        sys.platform.workload = Box::new(MockWorkload::disconnected());
        let resp = sys.execute(Command::PeersChanged);
        match resp {
            Response::Ok { output } => assert_eq!(output, "status unchanged"),
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
        assert_eq!(sys.unit_status(), Some(&UnitStatus::Active));
    }

    #[test]
    fn config_changed_records_tag_once() {
        let data = test_data("config-tags", |cfg| {
            cfg.cluster_tag = "farm-a".into();
        });
        let mut sys = Sys::from_parts(data, mock_platform());

        sys.execute(Command::ConfigChanged);
        sys.execute(Command::ConfigChanged);
        assert_eq!(sys.data().store().observed_tags(), vec!["farm-a"]);
    }

    #[test]
    fn cache_stats_disconnected_fails_with_fixed_message() {
        let mut sys = test_sys("stats-disconnected");
        sys.platform.workload = Box::new(MockWorkload::disconnected());

        let resp = sys.execute(Command::CacheStats);
        assert_eq!(resp, Response::error("not connected to workload"));
    }

    #[test]
    fn cache_stats_returns_raw_stdout() {
        let mut sys = test_sys("stats-ok");
        let mut workload = MockWorkload::new();
        workload.set_exec_responses(vec![Ok("cache hit rate 95%\n".into())]);
        sys.platform.workload = Box::new(workload);

        let resp = sys.execute(Command::CacheStats);
        assert_eq!(resp, Response::ok("cache hit rate 95%\n"));
    }

    #[test]
    fn diag_fail_parameter_fails_request() {
        let mut sys = test_sys("diag-fail");
        let resp = sys.execute(Command::Diag { fail: "boom".into() });
        assert_eq!(resp, Response::error("boom"));
    }

    #[test]
    fn diag_empty_returns_fixed_payload() {
        let mut sys = test_sys("diag-ok");
        let resp = sys.execute(Command::Diag { fail: String::new() });
        assert_eq!(resp, Response::ok(DIAG_PAYLOAD));
    }

    #[test]
    fn scheduler_address_query_reports_absence() {
        let mut sys = test_sys("addr-none");
        assert_eq!(sys.execute(Command::SchedulerAddress), Response::ok("(none)"));

        sys.platform.peers = Box::new(MockPeerStore::with_address("10.0.0.5"));
        assert_eq!(
            sys.execute(Command::SchedulerAddress),
            Response::ok("10.0.0.5")
        );
    }

    #[test]
    fn status_summarizes_unit_state() {
        let mut sys = test_sys("status");
        let resp = sys.execute(Command::Status);
        match resp {
            Response::Ok { output } => {
                assert!(output.contains("status: unset"));
                assert!(output.contains("observed tags: 0"));
            }
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
    }

    #[test]
    fn worker_cache_augmentation_flows_from_settings() {
        // Scenario 3: cache requested and storage mounted.
        let data = test_data("cache-env", |cfg| {
            cfg.cache_enabled = true;
        });
        let mut sys = Sys::from_parts(data, mock_platform());
        sys.platform.peers = Box::new(MockPeerStore::with_address("10.0.0.5"));
        sys.platform.mounts =
            Box::new(crate::infrastructure::mock::MockMounts::at("/var/cache/build"));
        let mut workload = MockWorkload::new();
        workload.set_running(WORKER_SERVICE);
        sys.platform.workload = Box::new(workload);

        sys.execute(Command::PeersChanged);
        let declared = sys.platform.workload.declared_services();
        let env = &declared.get(WORKER_SERVICE).unwrap().environment;
        assert_eq!(env["CACHE_DIR"], "/var/cache/build");
        assert!(env["PATH"].starts_with("/usr/lib/ccache:"));
    }

    #[test]
    fn local_platform_wires_from_settings() {
        let dir = std::env::temp_dir().join(format!("icf-sys-local-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let mut cfg = settings::default_settings();
        cfg.leader = true;
        cfg.bind_address = Some("10.0.0.7".into());
        cfg.cache_volume = Some(PathBuf::from("/nonexistent/cache"));

        let platform = local_platform(&dir, &cfg);
        assert!(platform.membership.is_leader());
        assert_eq!(platform.membership.bind_address().as_deref(), Some("10.0.0.7"));
        assert!(platform.mounts.cache_volume().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
