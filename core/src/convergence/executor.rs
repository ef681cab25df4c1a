//! Convergence engine — applies a desired service through the supervisor.
//!
//! Applying merges the named service into the supervisor's declared set
//! (replace by name, leave the rest untouched) and triggers one replan so
//! running processes converge to the full declared set. Applying the same
//! definition twice yields the same declared set.

use tracing::debug;

use crate::infrastructure::Workload;
use crate::types::service::ServiceDefinition;

/// Apply a planned service to the supervisor, or do nothing at all when
/// there is no plan.
pub fn apply(workload: &mut dyn Workload, desired: Option<&ServiceDefinition>) -> Result<(), String> {
    let def = match desired {
        Some(def) => def,
        None => {
            debug!("no service due for change, skipping supervisor");
            return Ok(());
        }
    };
    workload.merge_service_layer(def)?;
    workload.replan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockWorkload;
    use crate::types::service::{ServiceDefinition, ServiceSet};

    fn def(name: &str, command: &str) -> ServiceDefinition {
        ServiceDefinition::new(name, "test service", command)
    }

    #[test]
    fn apply_merges_and_replans() {
        let mut mock = MockWorkload::new();
        apply(&mut mock, Some(&def("scheduler", "icecc-scheduler -vvv"))).unwrap();
        assert!(mock.declared.contains("scheduler"));
        assert_eq!(mock.replan_count, 1);
    }

    #[test]
    fn apply_none_is_true_noop() {
        let mut mock = MockWorkload::new();
        apply(&mut mock, None).unwrap();
        assert!(mock.declared.is_empty());
        assert_eq!(mock.replan_count, 0);
    }

    #[test]
    fn apply_twice_yields_same_declared_set() {
        let mut mock = MockWorkload::new();
        let d = def("worker", "iceccd -vvv -s 10.0.0.5");

        apply(&mut mock, Some(&d)).unwrap();
        let once = mock.declared.clone();
        apply(&mut mock, Some(&d)).unwrap();
        assert_eq!(mock.declared, once);
        assert_eq!(mock.declared.len(), 1);
    }

    #[test]
    fn apply_leaves_other_services_untouched() {
        let mut mock = MockWorkload::new();
        apply(&mut mock, Some(&def("scheduler", "icecc-scheduler -vvv"))).unwrap();
        apply(&mut mock, Some(&def("worker", "iceccd -vvv -s 10.0.0.5"))).unwrap();

        assert_eq!(mock.declared.len(), 2);
        assert_eq!(
            mock.declared.get("scheduler").unwrap().command,
            "icecc-scheduler -vvv"
        );
    }

    #[test]
    fn apply_replaces_changed_definition_by_name() {
        let mut mock = MockWorkload::new();
        apply(&mut mock, Some(&def("worker", "iceccd -vvv -s 10.0.0.5"))).unwrap();
        apply(&mut mock, Some(&def("worker", "iceccd -vvv -s 10.0.0.9"))).unwrap();

        assert_eq!(mock.declared.len(), 1);
        assert_eq!(
            mock.declared.get("worker").unwrap().command,
            "iceccd -vvv -s 10.0.0.9"
        );
    }

    #[test]
    fn merge_failure_skips_replan() {
        struct FailingMerge {
            inner: MockWorkload,
        }
        impl crate::infrastructure::Workload for FailingMerge {
            fn can_connect(&self) -> bool {
                true
            }
            fn exec(&mut self, argv: &[&str]) -> Result<String, String> {
                self.inner.exec(argv)
            }
            fn search_path(&self) -> String {
                self.inner.search_path()
            }
            fn merge_service_layer(&mut self, _def: &ServiceDefinition) -> Result<(), String> {
                Err("layer rejected".into())
            }
            fn replan(&mut self) -> Result<(), String> {
                self.inner.replan()
            }
            fn service_running(&self, name: &str) -> crate::types::health::ServiceQuery {
                self.inner.service_running(name)
            }
            fn declared_services(&self) -> ServiceSet {
                self.inner.declared_services()
            }
        }

        let mut workload = FailingMerge {
            inner: MockWorkload::new(),
        };
        let result = apply(&mut workload, Some(&def("scheduler", "icecc-scheduler -vvv")));
        assert_eq!(result.unwrap_err(), "layer rejected");
        assert_eq!(workload.inner.replan_count, 0);
    }
}
