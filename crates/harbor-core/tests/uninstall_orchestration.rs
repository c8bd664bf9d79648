mod support;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use harbor_core::backend::{App, Framework, MemoryCoordinator};
use harbor_core::config::PlatformConfig;
use harbor_core::error::ErrorKind;
use harbor_core::orchestration::labels::{
    DCOS_FRAMEWORK_NAME, PACKAGE_FRAMEWORK_NAME, PACKAGE_NAME, PACKAGE_UNINSTALL, PACKAGE_VERSION,
};
use harbor_core::orchestration::{FrameworkTeardown, PackageRequest};
use pretty_assertions::assert_eq;

use support::{FakeResources, Harness, RecordingScheduler, kafka_catalog};

fn uninstall_label(json: &str) -> String {
    STANDARD.encode(json)
}

fn kafka_app(id: &str) -> App {
    App::new(id)
        .with_label(PACKAGE_NAME, "kafka")
        .with_label(PACKAGE_VERSION, "0.9.4.0")
        .with_label(PACKAGE_FRAMEWORK_NAME, "kafka")
        .with_label(
            PACKAGE_UNINSTALL,
            uninstall_label(
                r#"{"zookeeper": {"delete": [
                    {"path": "zk:/kafka", "always": true},
                    {"path": "/kafka-audit", "always": false}
                ]}}"#,
            ),
        )
}

fn zookeeper() -> MemoryCoordinator {
    MemoryCoordinator::new()
        .with_node("/kafka/brokers/ids")
        .with_node("/kafka/config")
        .with_node("/kafka-audit/log")
}

fn harness(apps: Vec<App>, resources: FakeResources) -> Harness {
    Harness::new(
        kafka_catalog().build(),
        RecordingScheduler::with_apps(apps),
        resources,
        zookeeper(),
        PlatformConfig::empty(),
    )
}

#[test]
fn ambiguous_match_is_conflict_without_mutation() {
    let h = harness(
        vec![kafka_app("/kafka"), kafka_app("/kafka-east")],
        FakeResources::default(),
    );
    let err = h.service.uninstall(&PackageRequest::new("kafka")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("/kafka-east"));
    assert!(h.scheduler.destroyed().is_empty());
    assert!(h.resources.torn_down().is_empty());
    assert!(h.coordinator.deletions().is_empty());
}

#[test]
fn app_id_disambiguates_and_full_teardown_runs() {
    let h = harness(
        vec![kafka_app("/kafka"), kafka_app("/kafka-east")],
        FakeResources::with_frameworks(vec![
            Framework::new("kafka", "fw-0001"),
            Framework::new("marathon", "fw-0000"),
        ]),
    );
    let report = h
        .service
        .uninstall(&PackageRequest::new("kafka").with_app_id("kafka-east"))
        .unwrap();

    assert_eq!(report.app_id, "/kafka-east");
    assert_eq!(h.scheduler.destroyed(), vec!["/kafka-east"]);
    assert_eq!(
        report.framework,
        FrameworkTeardown::TornDown {
            name: "kafka".to_string(),
            id: "fw-0001".to_string()
        }
    );
    assert_eq!(h.resources.torn_down(), vec!["fw-0001"]);

    assert_eq!(
        h.coordinator.deletions(),
        vec!["/kafka/config", "/kafka/brokers/ids", "/kafka/brokers", "/kafka"]
    );
    assert!(report.cleanup_failed.is_empty());
    assert!(h.coordinator.contains("/kafka-audit/log"));
}

#[test]
fn nothing_installed_is_not_found() {
    let h = harness(
        vec![App::new("/other").with_label(PACKAGE_NAME, "chronos")],
        FakeResources::default(),
    );
    let err = h.service.uninstall(&PackageRequest::new("kafka")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .service
        .uninstall(&PackageRequest::new("chronos").with_app_id("/nope"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.scheduler.destroyed().is_empty());
}

#[test]
fn unregistered_framework_is_a_no_op() {
    let h = harness(vec![kafka_app("/kafka")], FakeResources::default());
    let report = h.service.uninstall(&PackageRequest::new("kafka")).unwrap();
    assert_eq!(
        report.framework,
        FrameworkTeardown::NotRegistered {
            name: "kafka".to_string()
        }
    );
    assert!(h.resources.torn_down().is_empty());
    assert!(!h.coordinator.contains("/kafka"));
}

#[test]
fn ambiguous_framework_fails_after_app_removal_but_cleans_up() {
    let mut resources = FakeResources::with_frameworks(vec![Framework::new("kafka", "fw-1")]);
    resources.state.completed_frameworks = vec![Framework::new("kafka", "fw-0")];
    let h = harness(vec![kafka_app("/kafka")], resources);

    let err = h.service.uninstall(&PackageRequest::new("kafka")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.scheduler.destroyed(), vec!["/kafka"]);
    assert!(h.resources.torn_down().is_empty());
    assert!(!h.coordinator.contains("/kafka"));
}

#[test]
fn teardown_failure_is_reported_and_cleanup_still_runs() {
    let mut resources = FakeResources::with_frameworks(vec![Framework::new("kafka", "fw-1")]);
    resources.fail_teardown = true;
    let h = harness(vec![kafka_app("/kafka")], resources);

    let err = h.service.uninstall(&PackageRequest::new("kafka")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(h.scheduler.destroyed(), vec!["/kafka"]);
    assert!(!h.coordinator.contains("/kafka"));
}

#[test]
fn external_framework_label_is_used_as_fallback() {
    let app = App::new("/cassandra/dcos")
        .with_label(PACKAGE_NAME, "cassandra")
        .with_label(DCOS_FRAMEWORK_NAME, "cassandra.dcos");
    let h = harness(
        vec![app],
        FakeResources::with_frameworks(vec![Framework::new("cassandra.dcos", "fw-9")]),
    );
    let report = h.service.uninstall(&PackageRequest::new("cassandra")).unwrap();
    assert_eq!(h.resources.torn_down(), vec!["fw-9"]);
    assert!(report.cleanup_deleted.is_empty());
}

#[test]
fn missing_uninstall_label_is_recomputed_from_catalog() {
    let app = App::new("/kafka")
        .with_label(PACKAGE_NAME, "kafka")
        .with_label(PACKAGE_VERSION, "0.9.4.0");
    let h = Harness::new(
        kafka_catalog().build(),
        RecordingScheduler::with_apps(vec![app]),
        FakeResources::default(),
        MemoryCoordinator::new().with_node("/kafka/kafka/state"),
        PlatformConfig::empty(),
    );

    let report = h.service.uninstall(&PackageRequest::new("kafka")).unwrap();
    assert_eq!(report.framework, FrameworkTeardown::NotAFramework);
    assert_eq!(
        report.cleanup_deleted,
        vec!["/kafka/kafka/state", "/kafka/kafka"]
    );
}

#[test]
fn cleanup_failures_do_not_fail_the_uninstall() {
    let h = Harness::new(
        kafka_catalog().build(),
        RecordingScheduler::with_apps(vec![kafka_app("/kafka")]),
        FakeResources::default(),
        MemoryCoordinator::new(),
        PlatformConfig::empty(),
    );
    let report = h.service.uninstall(&PackageRequest::new("kafka")).unwrap();
    assert_eq!(h.scheduler.destroyed(), vec!["/kafka"]);
    assert_eq!(report.cleanup_failed, vec!["zk:/kafka"]);
}

#[test]
fn find_installed_narrows_by_id() {
    let h = harness(
        vec![kafka_app("/kafka"), kafka_app("/kafka-east")],
        FakeResources::default(),
    );
    let all = h.service.find_installed(&PackageRequest::new("kafka")).unwrap();
    assert_eq!(all.len(), 2);
    let one = h
        .service
        .find_installed(&PackageRequest::new("kafka").with_app_id("/kafka"))
        .unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].id, "/kafka");
}
