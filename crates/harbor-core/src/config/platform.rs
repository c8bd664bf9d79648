//! Platform-supplied configuration, built once at startup.

use serde_json::{Value, json};
use tracing::info;

use super::merge::ConfigMap;
use crate::backend::ResourceManager;
use crate::error::Result;

/// Resource-manager credentials as configured for this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MesosCredentials {
    pub principal: String,
    pub secret: String,
    pub secret_path: String,
}

/// Values every package sees under `mantl.*`, overriding user input.
///
/// Constructed explicitly and passed to each resolution; there is no
/// process-wide instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformConfig {
    values: ConfigMap,
}

impl PlatformConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        credentials: &MesosCredentials,
        authentication_enabled: bool,
        zookeeper_hosts: Option<&str>,
    ) -> Self {
        let mut mantl = json!({
            "mesos": {
                "principal": credentials.principal,
                "secret": credentials.secret,
                "secret-path": credentials.secret_path,
                "authentication-enabled": authentication_enabled,
            }
        });
        if let Some(hosts) = zookeeper_hosts.filter(|h| !h.trim().is_empty()) {
            mantl["zookeeper"] = json!({ "hosts": hosts });
        }
        let mut values = ConfigMap::new();
        values.insert("mantl".to_string(), mantl);
        Self { values }
    }

    /// Ask the resource manager whether authentication is required and build
    /// the platform values from the answer.
    pub fn discover(
        resources: &dyn ResourceManager,
        credentials: &MesosCredentials,
        zookeeper_hosts: Option<&str>,
    ) -> Result<Self> {
        let authentication_enabled = resources.state()?.requires_authentication();
        info!(authentication_enabled, "discovered platform configuration");
        Ok(Self::new(credentials, authentication_enabled, zookeeper_hosts))
    }

    /// Wrap an arbitrary object, mainly for tests and embedders.
    pub fn from_map(values: ConfigMap) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &ConfigMap {
        &self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
