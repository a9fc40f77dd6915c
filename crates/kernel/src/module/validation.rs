//! Module validation.
//!
//! The registry itself only enforces structural invariants (unique names and
//! routes). Format rules live here so hosts can run them before registering,
//! or skip them entirely.

use std::sync::LazyLock;

use regex::Regex;

use super::definition::Module;
use super::dependency::version_satisfies;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::ModuleRegistry;

#[allow(clippy::expect_used)]
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9\-_]+$").expect("valid regex")
});

#[allow(clippy::expect_used)]
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+").expect("valid regex")
});

#[allow(clippy::expect_used)]
static PERMISSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.\-_]+$").expect("valid regex")
});

/// Check that a module name uses only lowercase letters, digits, hyphens
/// and underscores.
pub fn is_valid_module_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Check that a version starts with `MAJOR.MINOR.PATCH`.
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// Check that a permission uses only lowercase letters, digits, dots,
/// hyphens and underscores.
pub fn is_valid_permission(permission: &str) -> bool {
    PERMISSION_RE.is_match(permission)
}

/// List everything wrong with a module's declared configuration.
///
/// An empty list means the module is valid.
pub fn module_issues(module: &Module) -> Vec<String> {
    let mut issues = Vec::new();

    if module.name.is_empty() {
        issues.push("missing required field: name".to_string());
    } else if !is_valid_module_name(&module.name) {
        issues.push(format!(
            "invalid module name '{}': use only lowercase letters, numbers, hyphens and underscores",
            module.name
        ));
    }

    match module.version.as_deref() {
        None | Some("") => issues.push("missing required field: version".to_string()),
        Some(v) if !is_valid_version(v) => issues.push(format!(
            "invalid version '{v}': use semantic versioning (e.g., 1.0.0)"
        )),
        Some(_) => {}
    }

    for permission in &module.permissions {
        if permission.trim().is_empty() {
            issues.push("invalid permission: permissions must be non-empty strings".to_string());
        } else if !is_valid_permission(permission) {
            issues.push(format!(
                "invalid permission '{permission}': use only lowercase letters, numbers, dots, hyphens and underscores"
            ));
        }
    }

    for route in &module.routes {
        if route.name.trim().is_empty() {
            issues.push(format!("route '{}' has an empty name", route.uri));
        }
    }

    issues
}

/// Validate a module, failing with every issue found.
pub fn validate_module(module: &Module) -> RegistryResult<()> {
    let issues = module_issues(module);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::invalid(&module.name, issues))
    }
}

/// Dependencies of `module` that `registry` cannot satisfy.
///
/// Each entry reads like "forum (required version: 2.0.0)" or
/// "forum (current: 1.0.0, required: 2.0.0)".
pub fn missing_dependencies(module: &Module, registry: &ModuleRegistry) -> Vec<String> {
    let mut missing = Vec::new();

    for (dependency, required) in &module.dependencies {
        let Some(installed) = registry.module(dependency) else {
            missing.push(format!("{dependency} (required version: {required})"));
            continue;
        };

        let current = installed.version.as_deref().unwrap_or("0.0.0");
        if !version_satisfies(current, required) {
            missing.push(format!(
                "{dependency} (current: {current}, required: {required})"
            ));
        }
    }

    missing
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(is_valid_module_name("blog"));
        assert!(is_valid_module_name("user-profiles_2"));
        assert!(!is_valid_module_name("Blog"));
        assert!(!is_valid_module_name("blog posts"));
        assert!(!is_valid_module_name(""));
    }

    #[test]
    fn version_rules() {
        assert!(is_valid_version("1.0.0"));
        assert!(is_valid_version("2.10.3-beta.1"));
        assert!(!is_valid_version("1.0"));
        assert!(!is_valid_version("v1.0.0"));
    }

    #[test]
    fn valid_module_has_no_issues() {
        let module = Module::new("blog")
            .version("1.0.0")
            .permissions(["blog.view", "blog.edit-own"]);
        assert!(module_issues(&module).is_empty());
        assert!(validate_module(&module).is_ok());
    }

    #[test]
    fn every_problem_is_reported() {
        let module = Module::new("My Blog").permissions(["", "Blog.View"]);
        let issues = module_issues(&module);

        assert_eq!(issues.len(), 4);
        assert!(issues[0].contains("invalid module name"));
        assert!(issues[1].contains("missing required field: version"));
        assert!(issues[2].contains("non-empty"));
        assert!(issues[3].contains("Blog.View"));

        let err = validate_module(&module).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfiguration { .. }));
    }
}
