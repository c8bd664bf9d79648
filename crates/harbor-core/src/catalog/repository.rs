//! Repository layers registered in the key-value store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::keys::Keyspace;
use crate::error::Result;
use crate::kv::KvStore;

/// A catalog layer. Index 0 is the base repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Repository {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
            updated: None,
        }
    }

    pub fn is_base(&self) -> bool {
        self.index == 0
    }
}

pub fn base_repository(repositories: &[Repository]) -> Option<&Repository> {
    repositories.iter().find(|r| r.is_base())
}

pub fn layer_repositories(repositories: &[Repository]) -> Vec<&Repository> {
    repositories.iter().filter(|r| !r.is_base()).collect()
}

/// Scan the namespace for repository directories, ascending by index.
///
/// A directory whose `name` key is missing is dropped from the result even
/// though its artifacts remain in the store.
pub fn list_repositories(kv: &dyn KvStore, keyspace: &Keyspace) -> Result<Vec<Repository>> {
    let prefix = keyspace.repositories_prefix();
    let mut indexes: Vec<u32> = Vec::new();
    for key in kv.keys(&prefix, Some("/"))? {
        let segment = key.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        match segment.parse::<u32>() {
            Ok(index) => indexes.push(index),
            Err(_) => warn!(key = %key, "unexpected repository index"),
        }
    }
    indexes.sort_unstable();
    indexes.dedup();

    let mut repositories = Vec::with_capacity(indexes.len());
    for index in indexes {
        let name_key = keyspace.name_key(index);
        let Some(raw_name) = kv.get(&name_key)? else {
            warn!(key = %name_key, index, "repository has no name; skipping");
            continue;
        };
        let updated = kv
            .get(&keyspace.updated_key(index))?
            .and_then(|raw| parse_sync_timestamp(&String::from_utf8_lossy(&raw)));
        repositories.push(Repository {
            name: String::from_utf8_lossy(&raw_name).trim().to_string(),
            index,
            updated,
        });
    }
    Ok(repositories)
}

/// Parse the sync timestamp written by the source synchroniser.
///
/// Accepts the Unix date layout (`Mon Jan  2 15:04:05 UTC 2006`) and RFC 3339.
pub fn parse_sync_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let [weekday, month, day, time, zone, year] = tokens.as_slice() else {
        return None;
    };
    if !zone.eq_ignore_ascii_case("UTC") {
        return None;
    }
    let normalised = format!("{} {} {} {} {}", weekday, month, day, time, year);
    NaiveDateTime::parse_from_str(&normalised, "%a %b %d %H:%M:%S %Y")
        .ok()
        .map(|naive| naive.and_utc())
}
