#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use harbor_core::backend::{
    App, ClusterState, Framework, MemoryCoordinator, ResourceManager, Scheduler,
};
use harbor_core::catalog::{Catalog, Keyspace};
use harbor_core::config::PlatformConfig;
use harbor_core::error::{HarborError, Result};
use harbor_core::kv::MemoryKv;
use harbor_core::orchestration::PackageService;

/// Scheduler fake that records every mutation.
#[derive(Default)]
pub struct RecordingScheduler {
    pub apps: Mutex<Vec<App>>,
    pub created: Mutex<Vec<App>>,
    pub destroyed: Mutex<Vec<String>>,
}

impl RecordingScheduler {
    pub fn with_apps(apps: Vec<App>) -> Self {
        Self {
            apps: Mutex::new(apps),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<App> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl Scheduler for RecordingScheduler {
    fn apps(&self) -> Result<Vec<App>> {
        Ok(self.apps.lock().unwrap().clone())
    }

    fn create_app(&self, app: &App) -> Result<String> {
        let mut apps = self.apps.lock().unwrap();
        if apps.iter().any(|existing| existing.id == app.id) {
            return Err(HarborError::AlreadyInstalled(app.id.clone()));
        }
        apps.push(app.clone());
        self.created.lock().unwrap().push(app.clone());
        Ok(format!("{{\"id\": \"{}\"}}", app.id))
    }

    fn destroy_app(&self, id: &str) -> Result<String> {
        let mut apps = self.apps.lock().unwrap();
        let before = apps.len();
        apps.retain(|app| app.id != id);
        if apps.len() == before {
            return Err(HarborError::upstream("destroy app", id, "HTTP 404"));
        }
        self.destroyed.lock().unwrap().push(id.to_string());
        Ok("{}".to_string())
    }
}

/// Resource-manager fake with a fixed framework list.
#[derive(Default)]
pub struct FakeResources {
    pub state: ClusterState,
    pub torn_down: Mutex<Vec<String>>,
    pub fail_teardown: bool,
}

impl FakeResources {
    pub fn with_frameworks(frameworks: Vec<Framework>) -> Self {
        Self {
            state: ClusterState {
                frameworks,
                ..ClusterState::default()
            },
            ..Self::default()
        }
    }

    pub fn torn_down(&self) -> Vec<String> {
        self.torn_down.lock().unwrap().clone()
    }
}

impl ResourceManager for FakeResources {
    fn state(&self) -> Result<ClusterState> {
        Ok(self.state.clone())
    }

    fn teardown(&self, framework_id: &str) -> Result<()> {
        if self.fail_teardown {
            return Err(HarborError::upstream("teardown framework", framework_id, "HTTP 503"));
        }
        self.torn_down.lock().unwrap().push(framework_id.to_string());
        Ok(())
    }
}

const ROOT: &str = "mantl-install/repository";

/// Builder for a catalog laid out in a `MemoryKv`.
pub struct CatalogFixture {
    kv: MemoryKv,
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self { kv: MemoryKv::new() }
    }

    pub fn repository(self, index: u32, name: &str) -> Self {
        Self {
            kv: self.kv.with(format!("{}/{}/name", ROOT, index), name),
        }
    }

    pub fn index(self, json: &str) -> Self {
        Self {
            kv: self
                .kv
                .with(format!("{}/0/repo/meta/index.json", ROOT), json),
        }
    }

    pub fn artifact(self, index: u32, package: &str, release: &str, file: &str, content: &str) -> Self {
        let key = Keyspace::default().artifact_key(index, package, release, file);
        Self {
            kv: self.kv.with(key, content),
        }
    }

    /// Mark a release supported in a layer.
    pub fn support(self, index: u32, package: &str, release: &str) -> Self {
        self.artifact(index, package, release, "mantl.json", "{}")
    }

    pub fn raw(self, key: &str, value: &str) -> Self {
        Self {
            kv: self.kv.with(key, value),
        }
    }

    pub fn build(self) -> Arc<MemoryKv> {
        Arc::new(self.kv)
    }
}

pub fn catalog(kv: Arc<MemoryKv>) -> Catalog {
    Catalog::new(kv, Keyspace::default())
}

pub const KAFKA_CONFIG: &str = r#"{
    "type": "object",
    "properties": {
        "mesos": {"type": "object", "properties": {
            "master": {"type": "string", "default": "zk://master.mesos:2181/mesos"}
        }},
        "kafka": {"type": "object", "properties": {
            "app-id": {"type": "string", "default": "/kafka"},
            "cpus": {"type": "number", "default": 0.5},
            "instances": {"type": "integer", "default": 1},
            "framework-name": {"type": "string", "default": "kafka"}
        }}
    }
}"#;

pub const KAFKA_MARATHON: &str = r#"{
    "id": "{{kafka.app-id}}",
    "cpus": {{kafka.cpus}},
    "instances": {{kafka.instances}},
    "env": {"MESOS_MASTER": "{{mesos.master}}"{{#mantl.mesos.authentication-enabled}}, "PRINCIPAL": "{{mantl.mesos.principal}}"{{/mantl.mesos.authentication-enabled}}},
    "labels": {"team": "data"}
}"#;

pub const KAFKA_UNINSTALL: &str = r#"{"zookeeper": {"delete": [
    {"path": "zk:/kafka/{{kafka.framework-name}}", "always": true},
    {"path": "/kafka-keep", "always": false}
]}}"#;

pub const KAFKA_INDEX: &str = r#"{"packages": [
    {"name": "kafka", "description": "Apache Kafka", "framework": true,
     "currentVersion": "0.9.4.0", "tags": ["message", "broker"],
     "versions": {"0.9.3.0": "2", "0.9.4.0": "3"}}
]}"#;

/// Base + one layer with kafka release 3 supported and installable.
pub fn kafka_catalog() -> CatalogFixture {
    CatalogFixture::new()
        .repository(0, "mantl-universe")
        .repository(1, "mantl")
        .index(KAFKA_INDEX)
        .artifact(0, "kafka", "3", "config.json", KAFKA_CONFIG)
        .artifact(0, "kafka", "3", "marathon.json", KAFKA_MARATHON)
        .artifact(0, "kafka", "3", "package.json", r#"{"name": "kafka"}"#)
        .artifact(0, "kafka", "3", "uninstall.json", KAFKA_UNINSTALL)
        .artifact(1, "kafka", "3", "mantl.json", r#"{"mantl": {"load-balancer": "external"}}"#)
}

pub struct Harness {
    pub kv: Arc<MemoryKv>,
    pub scheduler: Arc<RecordingScheduler>,
    pub resources: Arc<FakeResources>,
    pub coordinator: Arc<MemoryCoordinator>,
    pub service: PackageService,
}

impl Harness {
    pub fn new(
        kv: Arc<MemoryKv>,
        scheduler: RecordingScheduler,
        resources: FakeResources,
        coordinator: MemoryCoordinator,
        platform: PlatformConfig,
    ) -> Self {
        let scheduler = Arc::new(scheduler);
        let resources = Arc::new(resources);
        let coordinator = Arc::new(coordinator);
        let service = PackageService::new(
            catalog(kv.clone()),
            scheduler.clone(),
            resources.clone(),
            coordinator.clone(),
            platform,
        );
        Self {
            kv,
            scheduler,
            resources,
            coordinator,
            service,
        }
    }
}
