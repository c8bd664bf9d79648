//! Process settings loaded from `harbor.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Keyspace;
use crate::catalog::keys::{DEFAULT_APPS_ROOT, DEFAULT_REPOSITORY_ROOT};
use crate::config::MesosCredentials;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarathonSettings {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesosSettings {
    pub url: Option<String>,
    pub principal: Option<String>,
    pub secret: Option<String>,
    pub secret_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub consul: String,
    pub repository_root: String,
    pub apps_root: String,
    pub marathon: MarathonSettings,
    pub mesos: MesosSettings,
    pub zookeeper: Vec<String>,
    pub refresh_interval_secs: u64,
    pub accept_invalid_certs: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            consul: "http://localhost:8500".to_string(),
            repository_root: DEFAULT_REPOSITORY_ROOT.to_string(),
            apps_root: DEFAULT_APPS_ROOT.to_string(),
            marathon: MarathonSettings::default(),
            mesos: MesosSettings::default(),
            zookeeper: Vec::new(),
            refresh_interval_secs: 10,
            accept_invalid_certs: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// `<config dir>/harbor/harbor.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("harbor").join("harbor.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults; an explicit path that is missing is an
    /// error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("no settings file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid settings TOML")
    }

    pub fn keyspace(&self) -> Keyspace {
        Keyspace::new(&self.repository_root, &self.apps_root)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Comma-joined server list, or `None` when no servers are configured.
    pub fn zookeeper_hosts(&self) -> Option<String> {
        (!self.zookeeper.is_empty()).then(|| self.zookeeper.join(","))
    }

    /// Resource-manager credentials, reading the secret from `secret_path`
    /// when no inline secret is set.
    pub fn mesos_credentials(&self) -> anyhow::Result<MesosCredentials> {
        let principal = self.mesos.principal.clone().unwrap_or_default();
        let secret_path = self
            .mesos
            .secret_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let inline = self.mesos.secret.clone().filter(|s| !s.is_empty());
        let secret = match (inline, &self.mesos.secret_path) {
            (Some(secret), _) => secret,
            (None, Some(path)) if !principal.is_empty() => {
                let content = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read credentials file: {}", path.display())
                })?;
                parse_credentials(&content)
                    .remove(&principal)
                    .with_context(|| {
                        format!("No secret for {} in {}", principal, path.display())
                    })?
            }
            _ => String::new(),
        };

        Ok(MesosCredentials {
            principal,
            secret,
            secret_path,
        })
    }
}

/// Parse `principal secret` pairs, one per line.
pub fn parse_credentials(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(principal), Some(secret)) => {
                    Some((principal.to_string(), secret.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_document_is_defaults() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn parses_all_sections() {
        let settings = Settings::parse(
            r#"
            consul = "consul.service.consul:8500"
            zookeeper = ["zk1:2181", "zk2:2181"]
            refresh_interval_secs = 30
            log_format = "json"

            [marathon]
            url = "https://marathon.service.consul:8080"
            user = "admin"
            password = "pw"

            [mesos]
            url = "mesos.service.consul:5050"
            principal = "mantl-api"
            "#,
        )
        .unwrap();
        assert_eq!(settings.consul, "consul.service.consul:8500");
        assert_eq!(settings.zookeeper_hosts().as_deref(), Some("zk1:2181,zk2:2181"));
        assert_eq!(settings.refresh_interval(), Duration::from_secs(30));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.marathon.user.as_deref(), Some("admin"));
        assert_eq!(settings.mesos.principal.as_deref(), Some("mantl-api"));
        assert_eq!(settings.repository_root, DEFAULT_REPOSITORY_ROOT);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Settings::parse("log_format = \"xml\"").is_err());
    }

    #[test]
    fn credentials_file_supplies_secret() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "other   nope").unwrap();
        writeln!(file, "mantl-api  s3cret").unwrap();
        writeln!(file, "incomplete").unwrap();

        let mut settings = Settings::default();
        settings.mesos.principal = Some("mantl-api".to_string());
        settings.mesos.secret_path = Some(file.path().to_path_buf());

        let creds = settings.mesos_credentials().unwrap();
        assert_eq!(creds.secret, "s3cret");
        assert_eq!(creds.secret_path, file.path().display().to_string());
    }

    #[test]
    fn inline_secret_wins_over_file() {
        let mut settings = Settings::default();
        settings.mesos.principal = Some("p".to_string());
        settings.mesos.secret = Some("inline".to_string());
        settings.mesos.secret_path = Some(PathBuf::from("/nonexistent/credentials"));
        assert_eq!(settings.mesos_credentials().unwrap().secret, "inline");
    }

    #[test]
    fn settings_file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbor.toml");
        std::fs::write(&path, "apps_root = \"queue\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.keyspace().pending_prefix(), "queue/");
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
