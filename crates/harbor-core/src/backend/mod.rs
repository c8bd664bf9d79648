//! External systems driven by the orchestrator.
//!
//! Each backend is a trait so the orchestrator can be exercised against
//! in-process fakes; the HTTP implementations live next to their models.

pub mod http;
pub mod marathon;
pub mod mesos;
pub mod zookeeper;

use crate::error::Result;

pub use marathon::{App, MarathonClient};
pub use mesos::{ClusterState, Framework, MesosClient};
pub use zookeeper::{
    CleanupReport, Coordinator, MemoryCoordinator, OfflineCoordinator, ZookeeperCoordinator,
    coordinator_for, delete_tree,
};

/// Container scheduler surface: list, create and destroy apps.
pub trait Scheduler: Send + Sync {
    fn apps(&self) -> Result<Vec<App>>;

    /// Submit a new app. Returns the scheduler's response text.
    ///
    /// A duplicate id surfaces as `HarborError::AlreadyInstalled`.
    fn create_app(&self, app: &App) -> Result<String>;

    fn destroy_app(&self, id: &str) -> Result<String>;
}

/// Cluster resource manager surface.
pub trait ResourceManager: Send + Sync {
    fn state(&self) -> Result<ClusterState>;

    fn teardown(&self, framework_id: &str) -> Result<()>;
}
