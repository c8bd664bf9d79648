//! Key layout of the catalog namespace.
//!
//! ```text
//! <repoRoot>/<idx>/name
//! <repoRoot>/<idx>/updated
//! <repoRoot>/<idx>/repo/meta/index.json
//! <repoRoot>/<idx>/repo/packages/<Letter>/<name>/<release>/<file>
//! <appsRoot>/<id>
//! ```
//!
//! The single-letter bucket only limits directory fan-out.

pub const DEFAULT_REPOSITORY_ROOT: &str = "mantl-install/repository";
pub const DEFAULT_APPS_ROOT: &str = "mantl-install/apps";

/// Per-version file whose presence in a layer marks that version supported.
pub const SUPPORT_MARKER: &str = "mantl.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    repository_root: String,
    apps_root: String,
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new(DEFAULT_REPOSITORY_ROOT, DEFAULT_APPS_ROOT)
    }
}

impl Keyspace {
    pub fn new(repository_root: &str, apps_root: &str) -> Self {
        Self {
            repository_root: repository_root.trim_end_matches('/').to_string(),
            apps_root: apps_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn repository_root(&self) -> &str {
        &self.repository_root
    }

    /// Prefix under which every repository index directory lives.
    pub fn repositories_prefix(&self) -> String {
        format!("{}/", self.repository_root)
    }

    pub fn repository_key(&self, index: u32) -> String {
        format!("{}/{}", self.repository_root, index)
    }

    pub fn name_key(&self, index: u32) -> String {
        format!("{}/name", self.repository_key(index))
    }

    pub fn updated_key(&self, index: u32) -> String {
        format!("{}/updated", self.repository_key(index))
    }

    pub fn index_key(&self, index: u32) -> String {
        format!("{}/repo/meta/index.json", self.repository_key(index))
    }

    pub fn packages_key(&self, index: u32) -> String {
        format!("{}/repo/packages", self.repository_key(index))
    }

    pub fn release_key(&self, index: u32, package: &str, release: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.packages_key(index),
            bucket(package),
            package,
            release
        )
    }

    pub fn artifact_key(&self, index: u32, package: &str, release: &str, file: &str) -> String {
        format!("{}/{}", self.release_key(index, package, release), file)
    }

    pub fn support_marker_key(&self, index: u32, package: &str, release: &str) -> String {
        self.artifact_key(index, package, release, SUPPORT_MARKER)
    }

    /// Prefix of the pending-install queue.
    pub fn pending_prefix(&self) -> String {
        format!("{}/", self.apps_root)
    }
}

/// Upper-cased first character of a package name.
pub fn bucket(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}
