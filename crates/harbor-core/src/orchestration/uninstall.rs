//! Uninstall orchestration.
//!
//! Lookups and validation fail hard before anything is mutated. Once the
//! scheduler has destroyed the app, framework teardown errors are reported
//! but coordination-service cleanup still runs, and cleanup problems are only
//! logged.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::labels::{self, PACKAGE_NAME, PACKAGE_UNINSTALL, PACKAGE_VERSION};
use super::request::PackageRequest;
use crate::backend::{App, CleanupReport, Coordinator, ResourceManager, Scheduler, delete_tree};
use crate::catalog::Catalog;
use crate::config::PlatformConfig;
use crate::error::{HarborError, Result};

/// Post-uninstall steps declared by a package's `uninstall.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallSpec {
    #[serde(default)]
    pub zookeeper: Option<ZookeeperCommands>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZookeeperCommands {
    #[serde(default)]
    pub delete: Vec<ZookeeperNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZookeeperNode {
    pub path: String,
    #[serde(default)]
    pub always: bool,
}

impl UninstallSpec {
    /// Parse rendered uninstall JSON. Blank input means no steps.
    pub fn parse(rendered: &str) -> Result<Self> {
        if rendered.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(rendered)
            .map_err(|e| HarborError::upstream("parse uninstall spec", "uninstall.json", e))
    }

    pub fn decode_label(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| HarborError::upstream("decode uninstall label", PACKAGE_UNINSTALL, e))?;
        let text = String::from_utf8(decoded)
            .map_err(|e| HarborError::upstream("decode uninstall label", PACKAGE_UNINSTALL, e))?;
        Self::parse(&text)
    }

    /// Coordination paths to delete unconditionally.
    pub fn always_deleted(&self) -> Vec<&str> {
        self.zookeeper
            .iter()
            .flat_map(|zk| &zk.delete)
            .filter(|node| node.always)
            .map(|node| node.path.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameworkTeardown {
    /// The app carries no framework name.
    NotAFramework,
    /// No registered framework has that name.
    NotRegistered { name: String },
    TornDown { name: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    pub app_id: String,
    pub framework: FrameworkTeardown,
    pub cleanup_deleted: Vec<String>,
    pub cleanup_failed: Vec<String>,
}

pub struct UninstallOrchestrator<'a> {
    catalog: &'a Catalog,
    scheduler: &'a dyn Scheduler,
    resources: &'a dyn ResourceManager,
    coordinator: &'a dyn Coordinator,
    platform: &'a PlatformConfig,
}

impl<'a> UninstallOrchestrator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        scheduler: &'a dyn Scheduler,
        resources: &'a dyn ResourceManager,
        coordinator: &'a dyn Coordinator,
        platform: &'a PlatformConfig,
    ) -> Self {
        Self {
            catalog,
            scheduler,
            resources,
            coordinator,
            platform,
        }
    }

    /// Installed apps of the requested package, narrowed by id if given.
    pub fn find_installed(&self, request: &PackageRequest) -> Result<Vec<App>> {
        let apps = self
            .scheduler
            .apps()
            .inspect_err(|e| error!(error = %e, "could not list installed apps"))?;
        let all: Vec<&App> = apps.iter().collect();
        let mut matching = labels::filter_by_package_name(&request.name, &all);
        if let Some(id) = request.requested_app_id() {
            matching = labels::filter_by_id(id, &matching);
        }
        Ok(matching.into_iter().cloned().collect())
    }

    pub fn uninstall(&self, request: &PackageRequest) -> Result<UninstallReport> {
        request.validate()?;
        let mut matching = self.find_installed(request)?;
        match matching.len() {
            0 => Err(HarborError::NotFound(match request.requested_app_id() {
                Some(id) => format!("package {} with id {} is not installed", request.name, id),
                None => format!("package {} is not installed", request.name),
            })),
            1 => {
                let app = matching.remove(0);
                self.uninstall_app(&app)
            }
            _ => {
                let ids: Vec<&str> = matching.iter().map(|a| a.id.as_str()).collect();
                Err(HarborError::Conflict(format!(
                    "package {} is installed as multiple apps ({}); specify an id",
                    request.name,
                    ids.join(", ")
                )))
            }
        }
    }

    /// Destroy one app, tear down its framework and run cleanup.
    pub fn uninstall_app(&self, app: &App) -> Result<UninstallReport> {
        self.scheduler
            .destroy_app(&app.id)
            .inspect_err(|e| error!(app_id = %app.id, error = %e, "could not destroy app"))?;
        info!(app_id = %app.id, "app destroyed");

        let framework = self.teardown_framework(app).inspect_err(|e| {
            error!(app_id = %app.id, error = %e, "framework teardown failed after app removal")
        });

        let cleanup = self.cleanup(app);
        if !cleanup.is_clean() {
            warn!(app_id = %app.id, failed = ?cleanup.failed, "coordination cleanup incomplete");
        }

        Ok(UninstallReport {
            app_id: app.id.clone(),
            framework: framework?,
            cleanup_deleted: cleanup.deleted,
            cleanup_failed: cleanup.failed,
        })
    }

    fn teardown_framework(&self, app: &App) -> Result<FrameworkTeardown> {
        let Some(name) = labels::framework_name(app) else {
            return Ok(FrameworkTeardown::NotAFramework);
        };
        let state = self.resources.state()?;
        let matches = state.frameworks_named(name);
        match matches.as_slice() {
            [] => {
                info!(framework = name, "no registered framework to tear down");
                Ok(FrameworkTeardown::NotRegistered {
                    name: name.to_string(),
                })
            }
            [framework] => {
                self.resources.teardown(&framework.id)?;
                info!(framework = name, id = %framework.id, "framework torn down");
                Ok(FrameworkTeardown::TornDown {
                    name: name.to_string(),
                    id: framework.id.clone(),
                })
            }
            many => Err(HarborError::Conflict(format!(
                "{} frameworks are registered as {}; none were torn down",
                many.len(),
                name
            ))),
        }
    }

    fn cleanup(&self, app: &App) -> CleanupReport {
        let mut report = CleanupReport::default();
        let Some(spec) = self.uninstall_spec(app) else {
            return report;
        };
        for path in spec.always_deleted() {
            match delete_tree(self.coordinator, path) {
                Ok(result) => report.extend(result),
                Err(e) => {
                    warn!(path, error = %e, "could not delete coordination subtree");
                    report.failed.push(path.to_string());
                }
            }
        }
        report
    }

    // The uninstall spec is stored on the app at install time. Apps labelled before that
    // label existed get it recomputed from their name and version.
    fn uninstall_spec(&self, app: &App) -> Option<UninstallSpec> {
        if let Some(encoded) = app.label(PACKAGE_UNINSTALL) {
            if encoded.is_empty() {
                return None;
            }
            return UninstallSpec::decode_label(encoded)
                .inspect_err(|e| warn!(app_id = %app.id, error = %e, "unreadable uninstall label"))
                .ok();
        }

        let name = app.label(PACKAGE_NAME)?;
        let version = app.label(PACKAGE_VERSION);
        self.catalog
            .get_package_definition(name, version, None, self.platform)
            .and_then(|definition| definition.uninstall_json())
            .and_then(|rendered| UninstallSpec::parse(&rendered))
            .inspect_err(|e| warn!(app_id = %app.id, error = %e, "could not recompute uninstall spec"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_always_nodes_are_deleted() {
        let spec = UninstallSpec::parse(
            r#"{"zookeeper": {"delete": [
                {"path": "zk:/cassandra-mesos/dcos", "always": true},
                {"path": "/keep/me"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(spec.always_deleted(), vec!["zk:/cassandra-mesos/dcos"]);
    }

    #[test]
    fn label_round_trips_through_base64() {
        let encoded = STANDARD.encode(r#"{"zookeeper": {"delete": [{"path": "/a", "always": true}]}}"#);
        let spec = UninstallSpec::decode_label(&encoded).unwrap();
        assert_eq!(spec.always_deleted(), vec!["/a"]);
    }

    #[test]
    fn blank_and_empty_specs_have_no_steps() {
        assert!(UninstallSpec::parse("").unwrap().always_deleted().is_empty());
        assert!(UninstallSpec::parse("{}").unwrap().always_deleted().is_empty());
        assert!(UninstallSpec::decode_label("not base64!").is_err());
    }
}
