//! Error taxonomy shared by the catalog, the config engine and the orchestrator.

use std::fmt::Display;

use thiserror::Error;

/// Coarse classification used by frontends to pick exit codes or statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Upstream,
}

#[derive(Debug, Error)]
pub enum HarborError {
    /// A request field is missing or malformed.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A package, version or installed app could not be located.
    #[error("{0}")]
    NotFound(String),

    /// More than one candidate matched where exactly one was required.
    #[error("{0}")]
    Conflict(String),

    /// The scheduler already runs an app with the submitted id.
    #[error("{0} is already installed")]
    AlreadyInstalled(String),

    /// A key-value, scheduler, resource-manager or coordination call failed,
    /// or a stored artifact could not be parsed or rendered.
    #[error("{operation} failed for {context}: {message}")]
    Upstream {
        operation: String,
        context: String,
        message: String,
    },
}

impl HarborError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(
        operation: impl Into<String>,
        context: impl Into<String>,
        err: impl Display,
    ) -> Self {
        Self::Upstream {
            operation: operation.into(),
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::AlreadyInstalled(_) => ErrorKind::Conflict,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarborError>;
