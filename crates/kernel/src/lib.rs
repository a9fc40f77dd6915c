//! Modulio Kernel Library
//!
//! Module registry and navigation aggregation. Modules declare routes,
//! permissions and navigation; the registry owns them, keeps route names
//! unique, runs their lifecycle side effects and merges their navigation
//! into ordered per-menu lists.
//!
//! The `modulio` binary is a thin CLI over this library.

pub mod cache;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod events;
pub mod module;
pub mod navigation;
pub mod registry;

pub use config::ModulioConfig;
pub use error::{RegistryError, RegistryResult, SideEffectFailure};
pub use module::{Module, ModuleBuilder};
pub use navigation::{Navigation, NavigationGroup, NavigationItem};
pub use registry::{LifecycleReport, ModuleRegistry, RegistryServices};
