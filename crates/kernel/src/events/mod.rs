//! Typed lifecycle events and their dispatch.

mod dispatcher;
mod listeners;
mod types;

pub use dispatcher::EventDispatcher;
pub use listeners::{LOGGING_WEIGHT, install_logging_listeners};
pub use types::{
    EventBus, EventKind, MigrationDirection, MigrationsCompleted, ModuleDeregistered, ModuleEvent,
    ModuleRegistered, NullEventBus, PermissionsCreated,
};
