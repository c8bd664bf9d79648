//! Layered package catalog.
//!
//! Repository 0 holds the package index; higher-index repositories mark
//! releases as supported and override individual release artifacts.

pub mod keys;
pub mod overlay;
pub mod package;
pub mod repository;
pub mod resolver;

pub use keys::Keyspace;
pub use overlay::{ArtifactKind, ArtifactOverlay, ArtifactSource};
pub use package::{Package, PackageIndexEntry, PackageVersion};
pub use repository::Repository;
pub use resolver::Catalog;
