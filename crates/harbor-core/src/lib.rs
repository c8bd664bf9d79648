//! Harbor Core Library
//!
//! Package catalog resolution, configuration rendering and install/uninstall
//! orchestration for a Marathon/Mesos/ZooKeeper cluster whose catalog lives in
//! a shared key-value store.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod kv;
pub mod orchestration;
pub mod settings;
pub mod template;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{ErrorKind, HarborError, Result};

    // Key-value store
    pub use crate::kv::{ConsulKv, KvStore, MemoryKv};

    // Catalog
    pub use crate::catalog::{Catalog, Keyspace, Package, PackageVersion, Repository};

    // Configuration
    pub use crate::config::{MesosCredentials, PackageDefinition, PlatformConfig};
    pub use crate::settings::Settings;

    // Backends
    pub use crate::backend::{
        App, Coordinator, MarathonClient, MemoryCoordinator, MesosClient, OfflineCoordinator,
        ResourceManager, Scheduler,
    };

    // Orchestration
    pub use crate::orchestration::{
        FrameworkSummary, PackageRequest, PackageService, PendingInstallPoller,
    };
}
