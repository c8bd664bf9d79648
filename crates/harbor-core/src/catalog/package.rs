//! Package index entries and the resolved package model.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{HarborError, Result};

/// Raw entry of the base repository's `index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageIndexEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub framework: bool,
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Semantic version -> release index.
    #[serde(default, deserialize_with = "release_map")]
    pub versions: BTreeMap<String, String>,
}

// Release indexes are usually strings but some synchronisers write numbers.
fn release_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(version, release)| match release {
            Value::String(s) => Some((version, s)),
            Value::Number(n) => Some((version, n.to_string())),
            _ => None,
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexDocument {
    Wrapped { packages: Vec<PackageIndexEntry> },
    Bare(Vec<PackageIndexEntry>),
}

/// Parse an index document, either `{"packages": [...]}` or a bare array.
pub fn parse_index(raw: &[u8], context: &str) -> Result<Vec<PackageIndexEntry>> {
    let document: IndexDocument = serde_json::from_slice(raw)
        .map_err(|e| HarborError::upstream("parse package index", context, e))?;
    Ok(match document {
        IndexDocument::Wrapped { packages } => packages,
        IndexDocument::Bare(packages) => packages,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersion {
    pub version: String,
    /// Opaque storage ordering token. Compared as a string.
    pub index: String,
    pub supported: bool,
}

impl PackageVersion {
    pub fn new(version: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            index: index.into(),
            supported: false,
        }
    }

    pub fn supported(mut self) -> Self {
        self.supported = true;
        self
    }
}

/// Most recent first: release indexes compared lexicographically, descending.
///
/// `"9"` ranks above `"10"`; this matches how the catalog has always ordered
/// releases and is relied on by existing repositories.
pub fn by_most_recent(a: &PackageVersion, b: &PackageVersion) -> Ordering {
    b.index.cmp(&a.index)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    pub description: String,
    pub framework: bool,
    pub current_version: String,
    pub supported: bool,
    pub tags: Vec<String>,
    pub versions: BTreeMap<String, PackageVersion>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            framework: false,
            current_version: String::new(),
            supported: false,
            tags: Vec::new(),
            versions: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: PackageVersion) -> Self {
        self.versions.insert(version.version.clone(), version);
        self
    }

    /// Build a package from its index entry with every version unsupported.
    pub fn from_index_entry(entry: PackageIndexEntry) -> Self {
        let versions = entry
            .versions
            .into_iter()
            .map(|(version, index)| (version.clone(), PackageVersion::new(version, index)))
            .collect();
        Self {
            name: entry.name,
            description: entry.description,
            framework: entry.framework,
            current_version: entry.current_version,
            supported: false,
            tags: entry.tags,
            versions,
        }
    }

    pub fn versions_by_recency(&self) -> Vec<&PackageVersion> {
        let mut versions: Vec<&PackageVersion> = self.versions.values().collect();
        versions.sort_by(|a, b| by_most_recent(a, b));
        versions
    }

    pub fn supported_versions(&self) -> Vec<&PackageVersion> {
        self.versions.values().filter(|v| v.supported).collect()
    }

    pub fn has_supported_version(&self) -> bool {
        !self.supported_versions().is_empty()
    }

    /// Case-insensitive, whitespace-trimmed exact version lookup.
    pub fn version(&self, version: &str) -> Option<&PackageVersion> {
        let wanted = version.trim();
        self.versions
            .values()
            .find(|v| v.version.eq_ignore_ascii_case(wanted))
    }

    pub fn latest_version(&self) -> Option<&PackageVersion> {
        self.versions_by_recency().into_iter().next()
    }

    pub fn latest_supported_version(&self) -> Option<&PackageVersion> {
        self.versions_by_recency().into_iter().find(|v| v.supported)
    }

    /// Resolve an installable version.
    ///
    /// Tries the requested version, then the current version, then the most
    /// recent supported release, then the most recent release of any kind.
    pub fn find_version(&self, requested: Option<&str>) -> Option<&PackageVersion> {
        requested
            .and_then(|v| self.version(v))
            .or_else(|| self.version(&self.current_version))
            .or_else(|| self.latest_supported_version())
            .or_else(|| self.latest_version())
    }

    /// Recompute `supported` and `current_version` after support markers
    /// have been applied.
    pub fn refresh_support(&mut self) {
        self.supported = self.has_supported_version();
        if !self.supported {
            return;
        }
        if self
            .version(&self.current_version)
            .is_some_and(|v| v.supported)
        {
            return;
        }
        if let Some(latest) = self.latest_supported_version() {
            self.current_version = latest.version.clone();
        }
    }
}
