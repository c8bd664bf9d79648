//! Catalog reads against the key-value store.

use std::sync::Arc;

use tracing::{debug, warn};

use super::keys::Keyspace;
use super::overlay::{ArtifactKind, ArtifactOverlay, ArtifactSource};
use super::package::{Package, parse_index};
use super::repository::{self, Repository};
use crate::config::{ConfigMap, PackageDefinition, PlatformConfig};
use crate::error::{HarborError, Result};
use crate::kv::KvStore;

/// Resolves repositories, packages and package definitions.
///
/// Holds no state beyond its store handle; every call re-reads the store.
#[derive(Clone)]
pub struct Catalog {
    kv: Arc<dyn KvStore>,
    keyspace: Keyspace,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("keyspace", &self.keyspace)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    pub fn new(kv: Arc<dyn KvStore>, keyspace: Keyspace) -> Self {
        Self { kv, keyspace }
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub fn list_repositories(&self) -> Result<Vec<Repository>> {
        repository::list_repositories(self.kv.as_ref(), &self.keyspace)
    }

    pub fn base_repository(&self) -> Result<Option<Repository>> {
        let repositories = self.list_repositories()?;
        Ok(repository::base_repository(&repositories).cloned())
    }

    pub fn layer_repositories(&self) -> Result<Vec<Repository>> {
        let repositories = self.list_repositories()?;
        Ok(repository::layer_repositories(&repositories)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Packages from the base index with support computed from the layers.
    ///
    /// Each layer visited sets a version's support to whether that layer
    /// carries the version's marker, so a later layer without the marker
    /// clears support granted by an earlier one.
    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let repositories = self.list_repositories()?;
        let Some(base) = repository::base_repository(&repositories) else {
            warn!(root = %self.keyspace.repository_root(), "no base repository registered");
            return Ok(Vec::new());
        };

        let index_key = self.keyspace.index_key(base.index);
        let Some(raw) = self.kv.get(&index_key)? else {
            warn!(key = %index_key, "base repository has no package index");
            return Ok(Vec::new());
        };

        let mut packages: Vec<Package> = parse_index(&raw, &index_key)?
            .into_iter()
            .map(Package::from_index_entry)
            .collect();

        for layer in repository::layer_repositories(&repositories) {
            for package in &mut packages {
                for version in package.versions.values_mut() {
                    let marker = self
                        .keyspace
                        .support_marker_key(layer.index, &package.name, &version.index);
                    version.supported = self.kv.exists(&marker)?;
                }
            }
        }

        for package in &mut packages {
            package.refresh_support();
        }
        Ok(packages)
    }

    /// Case-insensitive lookup by name. A miss is `Ok(None)`.
    pub fn get_package(&self, name: &str) -> Result<Option<Package>> {
        let wanted = name.trim();
        Ok(self
            .list_packages()?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted)))
    }

    /// Assemble the definition of an installable release.
    pub fn get_package_definition(
        &self,
        name: &str,
        version: Option<&str>,
        user_config: Option<&ConfigMap>,
        platform: &PlatformConfig,
    ) -> Result<PackageDefinition> {
        let package = self
            .get_package(name)?
            .ok_or_else(|| HarborError::NotFound(format!("could not find {} package", name)))?;
        let release = package.find_version(version).ok_or_else(|| {
            HarborError::NotFound(format!("could not find installable version for {}", name))
        })?;

        let overlay = self.compose_artifacts(&package.name, &release.index)?;
        for kind in ArtifactKind::ALL {
            match overlay.source(kind) {
                Some(source) => debug!(
                    package = %package.name,
                    artifact = %kind,
                    repository = %source.repository,
                    "artifact resolved"
                ),
                None => debug!(package = %package.name, artifact = %kind, "artifact not provided"),
            }
        }

        let mut definition =
            PackageDefinition::new(&package.name, &release.version, &release.index)
                .framework(package.framework)
                .with_artifacts(overlay.into_artifacts())
                .with_user_config(user_config.cloned().unwrap_or_default())
                .with_platform(platform);

        let config = definition.merged_config()?;
        definition.framework_name = definition.configured_framework_name(&config);
        Ok(definition)
    }

    /// Offer every repository's copy of each artifact, lowest index first.
    pub fn compose_artifacts(&self, package: &str, release: &str) -> Result<ArtifactOverlay> {
        let mut overlay = ArtifactOverlay::new();
        for repo in self.list_repositories()? {
            let source = ArtifactSource {
                repository: repo.name.clone(),
                index: repo.index,
            };
            for kind in ArtifactKind::ALL {
                let key = self
                    .keyspace
                    .artifact_key(repo.index, package, release, kind.file_name());
                if let Some(content) = self.kv.get(&key)? {
                    overlay.offer(kind, source.clone(), content);
                }
            }
        }
        Ok(overlay)
    }
}
