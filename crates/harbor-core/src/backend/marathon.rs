//! Marathon scheduler client and app model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::Scheduler;
use super::http::HttpEndpoint;
use crate::error::{HarborError, Result};

/// A scheduler app definition.
///
/// Only `id` and `labels` are interpreted here; every other field is carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl App {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Parse a rendered manifest.
    pub fn from_manifest(manifest: &str) -> Result<Self> {
        serde_json::from_str(manifest)
            .map_err(|e| HarborError::upstream("parse app manifest", "marathon.json", e))
    }
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    #[serde(default)]
    apps: Vec<App>,
}

#[derive(Debug, Clone)]
pub struct MarathonClient {
    endpoint: HttpEndpoint,
}

impl MarathonClient {
    pub fn new(
        address: &str,
        user: Option<String>,
        password: Option<String>,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let credentials = user.zip(password);
        Ok(Self {
            endpoint: HttpEndpoint::new(address, credentials, accept_invalid_certs)?,
        })
    }
}

fn app_path(id: &str) -> String {
    format!("v2/apps/{}", id.trim_start_matches('/'))
}

impl Scheduler for MarathonClient {
    fn apps(&self) -> Result<Vec<App>> {
        let response = self.endpoint.get("v2/apps")?;
        if !response.is_success() {
            return Err(HarborError::upstream(
                "list apps",
                "v2/apps",
                format!("HTTP {}: {}", response.status, response.body),
            ));
        }
        let parsed: AppsResponse = serde_json::from_str(&response.body)
            .map_err(|e| HarborError::upstream("list apps", "v2/apps", e))?;
        Ok(parsed.apps)
    }

    fn create_app(&self, app: &App) -> Result<String> {
        debug!(id = %app.id, "submitting app");
        let response = self.endpoint.post_json("v2/apps", app)?;
        match response.status {
            409 => Err(HarborError::AlreadyInstalled(app.id.clone())),
            _ if response.is_success() => Ok(response.body),
            status => Err(HarborError::upstream(
                "create app",
                &app.id,
                format!("HTTP {}: {}", status, response.body),
            )),
        }
    }

    fn destroy_app(&self, id: &str) -> Result<String> {
        let path = app_path(id);
        let response = self.endpoint.delete(&path)?;
        if !response.is_success() {
            return Err(HarborError::upstream(
                "destroy app",
                id,
                format!("HTTP {}: {}", response.status, response.body),
            ));
        }
        Ok(response.body)
    }
}
