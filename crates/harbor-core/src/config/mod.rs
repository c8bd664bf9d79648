//! Configuration resolution for package releases.
//!
//! Schema defaults, rendered options, caller overrides and platform values
//! are merged into one tree, which then drives manifest rendering.

pub mod definition;
pub mod merge;
pub mod platform;
pub mod schema;

pub use definition::PackageDefinition;
pub use merge::{ConfigMap, lookup, merge_config, transform_value};
pub use platform::{MesosCredentials, PlatformConfig};
pub use schema::ConfigSchemaGroup;
