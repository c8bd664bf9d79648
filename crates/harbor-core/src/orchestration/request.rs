use serde::{Deserialize, Serialize};

use crate::config::ConfigMap;
use crate::error::{HarborError, Result};

/// Install or uninstall request, as submitted by callers or queued in the
/// pending-install namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uninstall_options: Option<ConfigMap>,
}

impl PackageRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_app_id(mut self, id: impl Into<String>) -> Self {
        self.app_id = Some(id.into());
        self
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = Some(config);
        self
    }

    /// Decode and validate a JSON payload. An empty payload fails on `name`.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let request: Self = if data.iter().all(u8::is_ascii_whitespace) {
            Self::default()
        } else {
            serde_json::from_slice(data)
                .map_err(|e| HarborError::validation("body", e.to_string()))?
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HarborError::validation("name", "is required"));
        }
        Ok(())
    }

    /// Requested version, ignoring blank strings.
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn requested_app_id(&self) -> Option<&str> {
        self.app_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}
