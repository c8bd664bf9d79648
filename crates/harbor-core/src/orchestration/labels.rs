//! Provenance labels written onto deployed apps and read back on uninstall.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::backend::App;
use crate::config::PackageDefinition;
use crate::error::Result;

pub const PACKAGE_NAME: &str = "MANTL_PACKAGE_NAME";
pub const PACKAGE_VERSION: &str = "MANTL_PACKAGE_VERSION";
pub const PACKAGE_INDEX: &str = "MANTL_PACKAGE_INDEX";
pub const PACKAGE_IS_FRAMEWORK: &str = "MANTL_PACKAGE_IS_FRAMEWORK";
pub const PACKAGE_FRAMEWORK_NAME: &str = "MANTL_PACKAGE_FRAMEWORK_NAME";
pub const PACKAGE_UNINSTALL: &str = "MANTL_PACKAGE_UNINSTALL";
/// Set by some upstream package manifests; copied into `PACKAGE_FRAMEWORK_NAME`.
pub const DCOS_FRAMEWORK_NAME: &str = "DCOS_PACKAGE_FRAMEWORK_NAME";
pub const TRAEFIK_ENABLE: &str = "traefik.enable";

/// Attach provenance labels to a rendered app.
pub fn attach_provenance(app: &mut App, definition: &PackageDefinition) -> Result<()> {
    let uninstall = definition.uninstall_json()?;

    let labels = &mut app.labels;
    labels.insert(PACKAGE_NAME.to_string(), definition.name.clone());
    labels.insert(PACKAGE_VERSION.to_string(), definition.version.clone());
    labels.insert(PACKAGE_INDEX.to_string(), definition.release.clone());
    labels.insert(
        PACKAGE_IS_FRAMEWORK.to_string(),
        definition.framework.to_string(),
    );
    labels.insert(PACKAGE_UNINSTALL.to_string(), STANDARD.encode(uninstall));

    if let Some(name) = &definition.framework_name {
        labels.insert(PACKAGE_FRAMEWORK_NAME.to_string(), name.clone());
    }
    if let Some(name) = labels.get(DCOS_FRAMEWORK_NAME).cloned() {
        labels.insert(PACKAGE_FRAMEWORK_NAME.to_string(), name);
    }

    match definition.load_balancer() {
        Ok(lb) => {
            labels.insert(TRAEFIK_ENABLE.to_string(), (lb == "external").to_string());
        }
        Err(e) => warn!(package = %definition.name, error = %e, "load balancer setting unavailable"),
    }
    Ok(())
}

/// Framework registered by an installed app, if any.
pub fn framework_name(app: &App) -> Option<&str> {
    [PACKAGE_FRAMEWORK_NAME, DCOS_FRAMEWORK_NAME]
        .into_iter()
        .filter_map(|key| app.label(key))
        .find(|name| !name.is_empty())
}

/// Apps created by this package manager.
pub fn filter_packages(apps: &[App]) -> Vec<&App> {
    apps.iter()
        .filter(|app| app.labels.contains_key(PACKAGE_NAME))
        .collect()
}

pub fn filter_by_package_name<'a>(name: &str, apps: &[&'a App]) -> Vec<&'a App> {
    apps.iter()
        .copied()
        .filter(|app| app.label(PACKAGE_NAME) == Some(name))
        .collect()
}

/// Scheduler app ids are absolute; `kafka` and `/kafka` name the same app.
pub fn normalize_app_id(id: &str) -> String {
    let id = id.trim();
    if id.starts_with('/') {
        id.to_string()
    } else {
        format!("/{}", id)
    }
}

/// Match an app id, with or without its leading `/`.
pub fn filter_by_id<'a>(id: &str, apps: &[&'a App]) -> Vec<&'a App> {
    let wanted = normalize_app_id(id);
    apps.iter()
        .copied()
        .filter(|app| app.id == wanted)
        .collect()
}
