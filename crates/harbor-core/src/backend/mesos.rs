//! Mesos master client and cluster-state model.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use super::ResourceManager;
use super::http::HttpEndpoint;
use crate::error::{HarborError, Result};

/// A framework registered with the resource manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub registered_time: f64,
    #[serde(default)]
    pub reregistered_time: f64,
    #[serde(default)]
    pub tasks: Vec<Value>,
}

impl Framework {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            active: true,
            ..Self::default()
        }
    }
}

/// Subset of `/master/state.json` used here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    #[serde(default, deserialize_with = "lenient_frameworks")]
    pub frameworks: Vec<Framework>,
    #[serde(default, deserialize_with = "lenient_frameworks")]
    pub completed_frameworks: Vec<Framework>,
    #[serde(default, deserialize_with = "lenient_frameworks")]
    pub unregistered_frameworks: Vec<Framework>,
    #[serde(default)]
    pub flags: BTreeMap<String, Value>,
}

impl ClusterState {
    /// Active, completed and unregistered frameworks, in that order.
    pub fn all_frameworks(&self) -> impl Iterator<Item = &Framework> {
        self.frameworks
            .iter()
            .chain(&self.completed_frameworks)
            .chain(&self.unregistered_frameworks)
    }

    /// Frameworks called `name` across the active, completed and
    /// unregistered lists.
    ///
    /// Completed frameworks are included, so a package reinstalled after an
    /// earlier framework finished matches twice: once for the live framework
    /// and once for the completed one. Uninstall treats that as ambiguous and
    /// tears nothing down; the live framework has to be shut down by id.
    pub fn frameworks_named<'a>(&'a self, name: &'a str) -> Vec<&'a Framework> {
        self.all_frameworks().filter(|fw| fw.name == name).collect()
    }

    pub fn requires_authentication(&self) -> bool {
        self.flags
            .get("authenticate")
            .and_then(Value::as_str)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

// Some masters report unregistered frameworks as bare ids; those entries
// carry nothing we can match on and are skipped.
fn lenient_frameworks<'de, D>(deserializer: D) -> std::result::Result<Vec<Framework>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

#[derive(Debug, Clone)]
pub struct MesosClient {
    endpoint: HttpEndpoint,
}

impl MesosClient {
    pub fn new(
        address: &str,
        principal: Option<String>,
        secret: Option<String>,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let credentials = principal.zip(secret);
        Ok(Self {
            endpoint: HttpEndpoint::new(address, credentials, accept_invalid_certs)?,
        })
    }
}

impl ResourceManager for MesosClient {
    fn state(&self) -> Result<ClusterState> {
        let response = self.endpoint.get("master/state.json")?;
        if !response.is_success() {
            return Err(HarborError::upstream(
                "read cluster state",
                "master/state.json",
                format!("HTTP {}", response.status),
            ));
        }
        serde_json::from_str(&response.body)
            .map_err(|e| HarborError::upstream("read cluster state", "master/state.json", e))
    }

    fn teardown(&self, framework_id: &str) -> Result<()> {
        info!(framework_id, "tearing down framework");
        let response = self
            .endpoint
            .post_form("master/teardown", &[("frameworkId", framework_id)])?;
        if !response.is_success() {
            return Err(HarborError::upstream(
                "teardown framework",
                framework_id,
                format!("HTTP {}: {}", response.status, response.body),
            ));
        }
        Ok(())
    }
}
