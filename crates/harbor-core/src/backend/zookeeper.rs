//! Coordination-service access and recursive subtree deletion.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ::zookeeper::{WatchedEvent, Watcher, ZooKeeper};
use tracing::{debug, info, warn};

use crate::error::{HarborError, Result};

/// Node-level coordination service operations.
pub trait Coordinator: Send + Sync {
    /// Immediate child names (not full paths) of `path`.
    fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Delete a single node. Fails if the node still has children.
    fn delete(&self, path: &str) -> Result<()>;
}

/// Outcome of a best-effort subtree deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn extend(&mut self, other: CleanupReport) {
        self.deleted.extend(other.deleted);
        self.failed.extend(other.failed);
    }
}

fn join(parent: &str, child: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, child)
    } else {
        format!("{}/{}", parent, child)
    }
}

fn collect_tree(coordinator: &dyn Coordinator, path: &str, out: &mut Vec<String>) -> Result<()> {
    let mut children = coordinator.children(path)?;
    children.sort();
    for child in children {
        let child_path = join(path, &child);
        out.push(child_path.clone());
        collect_tree(coordinator, &child_path, out)?;
    }
    Ok(())
}

/// Delete `path` and everything beneath it, descendants first.
///
/// A leading `zk:` scheme marker is stripped. Listing failures abort before
/// anything is deleted; individual deletion failures are logged and recorded
/// while the remaining nodes are still attempted.
pub fn delete_tree(coordinator: &dyn Coordinator, path: &str) -> Result<CleanupReport> {
    let root = path.strip_prefix("zk:").unwrap_or(path);
    let mut tree = Vec::new();
    collect_tree(coordinator, root, &mut tree)?;

    let mut report = CleanupReport::default();
    for node in tree.into_iter().rev().chain(std::iter::once(root.to_string())) {
        debug!(path = %node, "deleting znode");
        match coordinator.delete(&node) {
            Ok(()) => report.deleted.push(node),
            Err(e) => {
                warn!(path = %node, error = %e, "could not delete znode");
                report.failed.push(node);
            }
        }
    }
    Ok(report)
}

/// In-process node tree with the same delete semantics as the real service.
#[derive(Debug, Default)]
pub struct MemoryCoordinator {
    nodes: Mutex<BTreeSet<String>>,
    deletions: Mutex<Vec<String>>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` along with any missing ancestors.
    pub fn with_node(self, path: &str) -> Self {
        if let Ok(mut nodes) = self.nodes.lock() {
            let mut current = String::new();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                current.push('/');
                current.push_str(segment);
                nodes.insert(current.clone());
            }
        }
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.lock().map(|n| n.contains(path)).unwrap_or(false)
    }

    /// Paths deleted so far, in deletion order.
    pub fn deletions(&self) -> Vec<String> {
        self.deletions.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

fn direct_children(nodes: &BTreeSet<String>, path: &str) -> Vec<String> {
    let prefix = join(path, "");
    nodes
        .iter()
        .filter_map(|node| node.strip_prefix(&prefix))
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(str::to_string)
        .collect()
}

impl Coordinator for MemoryCoordinator {
    fn children(&self, path: &str) -> Result<Vec<String>> {
        let nodes = self
            .nodes
            .lock()
            .map_err(|_| HarborError::upstream("list children", path, "lock poisoned"))?;
        if path != "/" && !nodes.contains(path) {
            return Err(HarborError::upstream("list children", path, "no node"));
        }
        Ok(direct_children(&nodes, path))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| HarborError::upstream("delete node", path, "lock poisoned"))?;
        if !nodes.contains(path) {
            return Err(HarborError::upstream("delete node", path, "no node"));
        }
        if !direct_children(&nodes, path).is_empty() {
            return Err(HarborError::upstream("delete node", path, "node not empty"));
        }
        nodes.remove(path);
        if let Ok(mut deletions) = self.deletions.lock() {
            deletions.push(path.to_string());
        }
        Ok(())
    }
}

/// Session timeout negotiated with the ensemble.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        debug!(?event, "zookeeper session event");
    }
}

/// ZooKeeper ensemble access over a lazily opened session.
///
/// The session is opened on first use and reopened after a failed connect,
/// so building one never touches the network.
pub struct ZookeeperCoordinator {
    connect_string: String,
    session: Mutex<Option<Arc<ZooKeeper>>>,
}

impl std::fmt::Debug for ZookeeperCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZookeeperCoordinator")
            .field("connect_string", &self.connect_string)
            .finish_non_exhaustive()
    }
}

impl ZookeeperCoordinator {
    /// `servers` are `host:port` entries; blanks are ignored.
    pub fn new(servers: &[String]) -> Result<Self> {
        let hosts: Vec<&str> = servers
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(HarborError::validation("zookeeper", "no servers configured"));
        }
        Ok(Self {
            connect_string: hosts.join(","),
            session: Mutex::new(None),
        })
    }

    pub fn connect_string(&self) -> &str {
        &self.connect_string
    }

    fn session(&self) -> Result<Arc<ZooKeeper>> {
        let mut session = self.session.lock().map_err(|_| {
            HarborError::upstream("zookeeper connect", &self.connect_string, "lock poisoned")
        })?;
        if let Some(zk) = session.as_ref() {
            return Ok(Arc::clone(zk));
        }
        let zk = ZooKeeper::connect(&self.connect_string, SESSION_TIMEOUT, SessionWatcher)
            .map_err(|e| HarborError::upstream("zookeeper connect", &self.connect_string, e))?;
        info!(servers = %self.connect_string, "zookeeper session opened");
        let zk = Arc::new(zk);
        *session = Some(Arc::clone(&zk));
        Ok(zk)
    }
}

impl Coordinator for ZookeeperCoordinator {
    fn children(&self, path: &str) -> Result<Vec<String>> {
        self.session()?
            .get_children(path, false)
            .map_err(|e| HarborError::upstream("list children", path, e))
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.session()?
            .delete(path, None)
            .map_err(|e| HarborError::upstream("delete node", path, e))
    }
}

impl Drop for ZookeeperCoordinator {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.lock()
            && let Some(zk) = session.take()
            && let Err(e) = zk.close()
        {
            debug!(error = %e, "zookeeper session close failed");
        }
    }
}

/// The coordinator for a server list: a ZooKeeper session when servers are
/// configured, otherwise the offline stand-in.
pub fn coordinator_for(servers: &[String]) -> Arc<dyn Coordinator> {
    match ZookeeperCoordinator::new(servers) {
        Ok(zk) => Arc::new(zk),
        Err(_) => {
            warn!("no zookeeper servers configured; uninstall cleanup will be reported as failed");
            Arc::new(OfflineCoordinator::new(servers.to_vec()))
        }
    }
}

/// Stand-in used when no coordination session is configured.
///
/// Every call fails, so uninstall cleanup logs and skips its deletions.
#[derive(Debug, Clone, Default)]
pub struct OfflineCoordinator {
    servers: Vec<String>,
}

impl OfflineCoordinator {
    pub fn new(servers: Vec<String>) -> Self {
        Self { servers }
    }

    fn unavailable(&self, operation: &str, path: &str) -> HarborError {
        HarborError::upstream(
            operation,
            path,
            format!("no coordination session for [{}]", self.servers.join(",")),
        )
    }
}

impl Coordinator for OfflineCoordinator {
    fn children(&self, path: &str) -> Result<Vec<String>> {
        Err(self.unavailable("list children", path))
    }

    fn delete(&self, path: &str) -> Result<()> {
        Err(self.unavailable("delete node", path))
    }
}
