//! Module registry: ownership, lifecycle and aggregation.

mod aggregate;
mod manager;
mod report;
mod set;

pub use aggregate::{collect_navigation, collect_permissions, route_conflicts};
pub use manager::{ModuleRegistry, RegistryServices};
pub use report::LifecycleReport;
pub use set::ModuleSet;
