//! Install and uninstall orchestration across the scheduler, the resource
//! manager and the coordination service.

pub mod install;
pub mod labels;
pub mod poller;
pub mod request;
pub mod service;
pub mod uninstall;

pub use install::{InstallOrchestrator, InstallReport};
pub use poller::{PendingInstallPoller, PollSummary};
pub use request::PackageRequest;
pub use service::{FrameworkSummary, PackageService};
pub use uninstall::{FrameworkTeardown, UninstallOrchestrator, UninstallReport, UninstallSpec};
