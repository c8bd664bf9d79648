//! Facade tying the catalog, backends and platform values together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::install::{InstallOrchestrator, InstallReport};
use super::labels;
use super::request::PackageRequest;
use super::uninstall::{UninstallOrchestrator, UninstallReport};
use crate::backend::{App, Coordinator, Framework, ResourceManager, Scheduler};
use crate::catalog::{Catalog, Package, Repository};
use crate::config::PlatformConfig;
use crate::error::{HarborError, Result};

/// A resource-manager framework as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkSummary {
    pub name: String,
    pub id: String,
    pub active: bool,
    pub hostname: String,
    pub user: String,
    pub registered_time: Option<DateTime<Utc>>,
    pub reregistered_time: Option<DateTime<Utc>>,
    pub active_tasks: usize,
}

fn epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if seconds <= 0.0 || !seconds.is_finite() {
        return None;
    }
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

impl From<&Framework> for FrameworkSummary {
    fn from(fw: &Framework) -> Self {
        Self {
            name: fw.name.clone(),
            id: fw.id.clone(),
            active: fw.active,
            hostname: fw.hostname.clone(),
            user: fw.user.clone(),
            registered_time: epoch_seconds(fw.registered_time),
            reregistered_time: epoch_seconds(fw.reregistered_time),
            active_tasks: fw.tasks.len(),
        }
    }
}

/// Entry point for frontends and the pending-install poller.
#[derive(Clone)]
pub struct PackageService {
    catalog: Catalog,
    scheduler: Arc<dyn Scheduler>,
    resources: Arc<dyn ResourceManager>,
    coordinator: Arc<dyn Coordinator>,
    platform: PlatformConfig,
}

impl PackageService {
    pub fn new(
        catalog: Catalog,
        scheduler: Arc<dyn Scheduler>,
        resources: Arc<dyn ResourceManager>,
        coordinator: Arc<dyn Coordinator>,
        platform: PlatformConfig,
    ) -> Self {
        Self {
            catalog,
            scheduler,
            resources,
            coordinator,
            platform,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    pub fn repositories(&self) -> Result<Vec<Repository>> {
        self.catalog.list_repositories()
    }

    pub fn packages(&self) -> Result<Vec<Package>> {
        self.catalog.list_packages()
    }

    pub fn package(&self, name: &str) -> Result<Package> {
        self.catalog
            .get_package(name)?
            .ok_or_else(|| HarborError::NotFound(format!("package {} not found", name.trim())))
    }

    pub fn install(&self, request: &PackageRequest) -> Result<InstallReport> {
        InstallOrchestrator::new(&self.catalog, self.scheduler.as_ref(), &self.platform)
            .install(request)
    }

    pub fn uninstall(&self, request: &PackageRequest) -> Result<UninstallReport> {
        self.uninstaller().uninstall(request)
    }

    pub fn find_installed(&self, request: &PackageRequest) -> Result<Vec<App>> {
        self.uninstaller().find_installed(request)
    }

    /// Every scheduler app carrying a package label.
    pub fn installed(&self) -> Result<Vec<App>> {
        let apps = self.scheduler.apps()?;
        Ok(labels::filter_packages(&apps).into_iter().cloned().collect())
    }

    pub fn frameworks(&self, include_completed: bool) -> Result<Vec<FrameworkSummary>> {
        let state = self.resources.state()?;
        let mut summaries: Vec<FrameworkSummary> =
            state.frameworks.iter().map(FrameworkSummary::from).collect();
        if include_completed {
            summaries.extend(state.completed_frameworks.iter().map(FrameworkSummary::from));
        }
        Ok(summaries)
    }

    pub fn teardown_framework(&self, framework_id: &str) -> Result<()> {
        if framework_id.trim().is_empty() {
            return Err(HarborError::validation("frameworkId", "is required"));
        }
        self.resources.teardown(framework_id.trim())?;
        info!(framework_id, "framework shut down");
        Ok(())
    }

    fn uninstaller(&self) -> UninstallOrchestrator<'_> {
        UninstallOrchestrator::new(
            &self.catalog,
            self.scheduler.as_ref(),
            self.resources.as_ref(),
            self.coordinator.as_ref(),
            &self.platform,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn summary_converts_epoch_seconds() {
        let mut fw = Framework::new("marathon", "20151006-0001");
        fw.registered_time = 1444139990.5;
        fw.tasks = vec![serde_json::json!({"id": "t1"}), serde_json::json!({"id": "t2"})];

        let summary = FrameworkSummary::from(&fw);
        let registered = summary.registered_time.unwrap();
        assert_eq!(registered.timestamp(), 1444139990);
        assert_eq!(registered.nanosecond(), 500_000_000);
        assert_eq!(summary.reregistered_time, None);
        assert_eq!(summary.active_tasks, 2);
        assert!(summary.active);
    }
}
