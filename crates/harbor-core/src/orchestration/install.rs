//! Install orchestration: resolve, render, label, submit.

use serde::Serialize;
use tracing::{debug, error, info};

use super::labels::{attach_provenance, normalize_app_id};
use super::request::PackageRequest;
use crate::backend::{App, Scheduler};
use crate::catalog::Catalog;
use crate::config::{PackageDefinition, PlatformConfig};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallReport {
    pub app_id: String,
    pub package: String,
    pub version: String,
    pub release: String,
    /// Scheduler response body.
    pub response: String,
}

pub struct InstallOrchestrator<'a> {
    catalog: &'a Catalog,
    scheduler: &'a dyn Scheduler,
    platform: &'a PlatformConfig,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        scheduler: &'a dyn Scheduler,
        platform: &'a PlatformConfig,
    ) -> Self {
        Self {
            catalog,
            scheduler,
            platform,
        }
    }

    /// Resolve the request into a labelled app without touching the
    /// scheduler.
    pub fn build_app(&self, request: &PackageRequest) -> Result<(PackageDefinition, App)> {
        request.validate()?;
        let definition = self
            .catalog
            .get_package_definition(
                &request.name,
                request.requested_version(),
                request.config.as_ref(),
                self.platform,
            )
            .inspect_err(|e| error!(package = %request.name, error = %e, "could not resolve package definition"))?;

        let manifest = definition.marathon_app_json()?;
        let mut app = App::from_manifest(&manifest)?;
        if let Some(id) = request.requested_app_id() {
            app.id = normalize_app_id(id);
        }
        attach_provenance(&mut app, &definition)?;
        Ok((definition, app))
    }

    pub fn install(&self, request: &PackageRequest) -> Result<InstallReport> {
        let (definition, app) = self.build_app(request)?;
        debug!(app = ?app, "submitting app to scheduler");

        let response = self
            .scheduler
            .create_app(&app)
            .inspect_err(|e| error!(app_id = %app.id, error = %e, "could not create app"))?;

        info!(
            package = %definition.name,
            version = %definition.version,
            app_id = %app.id,
            "package installed"
        );
        Ok(InstallReport {
            app_id: app.id,
            package: definition.name,
            version: definition.version,
            release: definition.release,
            response,
        })
    }
}
