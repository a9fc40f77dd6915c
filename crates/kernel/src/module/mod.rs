//! Module model, registration builder, manifests and validation.

mod builder;
mod definition;
mod dependency;
mod manifest;
mod validation;

pub use builder::ModuleBuilder;
pub use definition::{Module, RouteDefinition};
pub use dependency::{compare_versions, resolve_load_order, version_satisfies};
pub use manifest::{MANIFEST_SUFFIX, ManifestNavigation, ModuleManifest, register_all};
pub use validation::{
    is_valid_module_name, is_valid_permission, is_valid_version, missing_dependencies,
    module_issues, validate_module,
};
