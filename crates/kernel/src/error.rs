//! Registry error types with clear, actionable messages.
//!
//! Structural errors abort the call that caused them and leave the registry
//! untouched. Side-effect failures (migrations, permission records) never
//! abort; they are collected in [`SideEffectFailure`] values and reported.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// One or more route names are already owned by another module.
    #[error("module '{module}': duplicate routes detected: {}", .routes.join(", "))]
    DuplicateRoute { module: String, routes: Vec<String> },

    /// A module with this name is already registered.
    #[error("module '{module}' is already registered; deregister it first")]
    DuplicateModuleName { module: String },

    /// No module with this name is registered.
    #[error("module '{module}' not found")]
    ModuleNotFound { module: String },

    /// The module failed validation.
    #[error("module '{module}': invalid configuration: {}", .issues.join("; "))]
    InvalidConfiguration { module: String, issues: Vec<String> },

    /// The module is forbidden or missing from the allow list.
    #[error("module '{module}' is not allowed by MODULIO_ALLOWED_MODULES / MODULIO_FORBIDDEN_MODULES")]
    ModuleNotAllowed { module: String },

    /// The registry already holds the configured maximum number of modules.
    #[error("module '{module}': cannot register, limit of {max} modules reached (MODULIO_MAX_MODULES)")]
    ModuleLimitReached { module: String, max: usize },
}

impl RegistryError {
    pub fn duplicate_route(module: impl Into<String>, routes: Vec<String>) -> Self {
        Self::DuplicateRoute {
            module: module.into(),
            routes,
        }
    }

    pub fn not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
        }
    }

    pub fn invalid(module: impl Into<String>, issues: Vec<String>) -> Self {
        Self::InvalidConfiguration {
            module: module.into(),
            issues,
        }
    }

    /// Name of the module the error is about.
    pub fn module(&self) -> &str {
        match self {
            Self::DuplicateRoute { module, .. }
            | Self::DuplicateModuleName { module }
            | Self::ModuleNotFound { module }
            | Self::InvalidConfiguration { module, .. }
            | Self::ModuleNotAllowed { module }
            | Self::ModuleLimitReached { module, .. } => module,
        }
    }
}

/// Result type alias using RegistryError.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// The side effect that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    MigrationRun,
    MigrationRollback,
    PermissionCreate,
    PermissionDelete,
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MigrationRun => "migration run",
            Self::MigrationRollback => "migration rollback",
            Self::PermissionCreate => "permission create",
            Self::PermissionDelete => "permission delete",
        };
        f.write_str(s)
    }
}

/// A non-fatal failure of a collaborator call during registration or
/// deregistration.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("module '{module}': {operation} failed for '{target}': {details}")]
pub struct SideEffectFailure {
    pub module: String,
    pub operation: SideEffect,
    /// Migration path or permission name.
    pub target: String,
    pub details: String,
}

impl SideEffectFailure {
    pub fn new(
        module: impl Into<String>,
        operation: SideEffect,
        target: impl Into<String>,
        error: &anyhow::Error,
    ) -> Self {
        Self {
            module: module.into(),
            operation,
            target: target.into(),
            details: format!("{error:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_route_lists_routes() {
        let err = RegistryError::duplicate_route(
            "shop",
            vec!["blog.index".to_string(), "blog.show".to_string()],
        );
        let msg = err.to_string();
        assert!(msg.contains("shop"));
        assert!(msg.contains("blog.index, blog.show"));
        assert_eq!(err.module(), "shop");
    }

    #[test]
    fn limit_message_names_the_setting() {
        let err = RegistryError::ModuleLimitReached {
            module: "blog".to_string(),
            max: 3,
        };
        assert!(err.to_string().contains("MODULIO_MAX_MODULES"));
    }

    #[test]
    fn side_effect_failure_keeps_error_chain() {
        let cause = anyhow::anyhow!("connection refused").context("migrate blog");
        let failure = SideEffectFailure::new("blog", SideEffect::MigrationRun, "db/blog", &cause);

        assert_eq!(failure.details, "migrate blog: connection refused");
        assert!(failure.to_string().contains("migration run failed for 'db/blog'"));
    }
}
