//! Request-scoped package definition: artifacts plus configuration inputs.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, error};

use super::merge::{ConfigMap, lookup, lookup_str, merge_config};
use super::platform::PlatformConfig;
use super::schema::ConfigSchemaGroup;
use crate::catalog::overlay::ArtifactKind;
use crate::error::{HarborError, Result};
use crate::template::render_template;

pub const LOAD_BALANCER_PATH: &str = "mantl.load-balancer";
pub const DEFAULT_LOAD_BALANCER: &str = "off";

/// Everything needed to render one package release.
///
/// Built fresh for each request and never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDefinition {
    pub name: String,
    pub version: String,
    pub release: String,
    pub framework: bool,
    pub framework_name: Option<String>,
    artifacts: BTreeMap<ArtifactKind, Vec<u8>>,
    user_config: ConfigMap,
    platform: ConfigMap,
}

impl PackageDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            ..Self::default()
        }
    }

    pub fn framework(mut self, framework: bool) -> Self {
        self.framework = framework;
        self
    }

    pub fn with_artifact(mut self, kind: ArtifactKind, content: impl Into<Vec<u8>>) -> Self {
        self.artifacts.insert(kind, content.into());
        self
    }

    pub fn with_artifacts(mut self, artifacts: BTreeMap<ArtifactKind, Vec<u8>>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn with_user_config(mut self, config: ConfigMap) -> Self {
        self.user_config = config;
        self
    }

    pub fn with_platform(mut self, platform: &PlatformConfig) -> Self {
        self.platform = platform.as_map().clone();
        self
    }

    /// Raw artifact bytes, empty when no layer supplied the file.
    pub fn artifact(&self, kind: ArtifactKind) -> &[u8] {
        self.artifacts.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn user_config(&self) -> &ConfigMap {
        &self.user_config
    }

    pub fn is_valid(&self) -> bool {
        [ArtifactKind::Config, ArtifactKind::Marathon, ArtifactKind::Package]
            .iter()
            .all(|kind| !self.artifact(*kind).is_empty())
    }

    pub fn config_schema(&self) -> Result<ConfigSchemaGroup> {
        ConfigSchemaGroup::parse(self.artifact(ArtifactKind::Config))
    }

    pub fn default_config(&self) -> Result<ConfigMap> {
        Ok(self.config_schema()?.default_config())
    }

    /// Rendered options merged with user and then platform values.
    ///
    /// Without an options template the result is empty and neither user nor
    /// platform values contribute.
    pub fn options(&self) -> Result<ConfigMap> {
        let raw = self.artifact(ArtifactKind::Options);
        if raw.is_empty() {
            return Ok(ConfigMap::new());
        }
        let source = artifact_text(raw, ArtifactKind::Options)?;
        let rendered = render_template(
            source,
            &Value::Object(self.platform.clone()),
            ArtifactKind::Options.file_name(),
        )?;
        let options: ConfigMap = serde_json::from_str(&rendered).map_err(|e| {
            error!(package = %self.name, error = %e, "rendered options are not a JSON object");
            HarborError::upstream("parse options", ArtifactKind::Options.file_name(), e)
        })?;
        let options = merge_config(options, &self.user_config);
        Ok(merge_config(options, &self.platform))
    }

    /// Schema defaults with options merged on top.
    pub fn merged_config(&self) -> Result<ConfigMap> {
        let defaults = self.default_config()?;
        let options = self.options()?;
        Ok(merge_config(defaults, &options))
    }

    /// Optional framework name override at `<name>.framework-name`.
    pub fn configured_framework_name(&self, config: &ConfigMap) -> Option<String> {
        lookup(config, &self.name)
            .and_then(|pkg| pkg.get("framework-name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    pub fn marathon_app_json(&self) -> Result<String> {
        self.render_artifact(ArtifactKind::Marathon)
    }

    pub fn uninstall_json(&self) -> Result<String> {
        self.render_artifact(ArtifactKind::Uninstall)
    }

    /// `mantl.load-balancer`, lower-cased, or `off`.
    pub fn load_balancer(&self) -> Result<String> {
        let config = self.merged_config()?;
        Ok(lookup_str(&config, LOAD_BALANCER_PATH)
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_LOAD_BALANCER.to_string()))
    }

    fn render_artifact(&self, kind: ArtifactKind) -> Result<String> {
        let config = self.merged_config()?;
        let source = artifact_text(self.artifact(kind), kind)?;
        debug!(package = %self.name, artifact = %kind, "rendering template");
        render_template(source, &Value::Object(config), kind.file_name())
    }
}

fn artifact_text(raw: &[u8], kind: ArtifactKind) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| HarborError::upstream("decode artifact", kind.file_name(), e))
}
