//! Built-in logging listeners.

use tracing::{info, warn};

use super::dispatcher::EventDispatcher;
use super::types::{EventKind, ModuleEvent};

/// Weight of the logging listeners; runs after regular handlers.
pub const LOGGING_WEIGHT: i32 = 1000;

/// Log every lifecycle transition through `tracing`.
pub fn install_logging_listeners(dispatcher: &EventDispatcher) {
    dispatcher.listen(
        EventKind::ModuleRegistered,
        "log_module_registered",
        LOGGING_WEIGHT,
        |event| {
            if let ModuleEvent::Registered(e) = event {
                info!(
                    module = %e.module.name,
                    version = e.module.version.as_deref().unwrap_or("-"),
                    context = ?e.context,
                    "module registered"
                );
            }
            Ok(())
        },
    );

    dispatcher.listen(
        EventKind::ModuleDeregistered,
        "log_module_deregistered",
        LOGGING_WEIGHT,
        |event| {
            if let ModuleEvent::Deregistered(e) = event {
                info!(
                    module = %e.module.name,
                    reason = e.reason.as_deref().unwrap_or("-"),
                    "module deregistered"
                );
            }
            Ok(())
        },
    );

    dispatcher.listen(
        EventKind::PermissionsCreated,
        "log_permissions_created",
        LOGGING_WEIGHT,
        |event| {
            if let ModuleEvent::PermissionsCreated(e) = event
                && !e.created.is_empty()
            {
                info!(
                    module = %e.module.name,
                    created = e.created.len(),
                    existing = e.existing.len(),
                    "permissions created"
                );
            }
            Ok(())
        },
    );

    dispatcher.listen(
        EventKind::MigrationsCompleted,
        "log_migrations_completed",
        LOGGING_WEIGHT,
        |event| {
            if let ModuleEvent::MigrationsCompleted(e) = event {
                if e.errors.is_empty() {
                    info!(
                        module = %e.module.name,
                        direction = %e.direction,
                        executed = e.executed.len(),
                        "migrations completed"
                    );
                } else {
                    warn!(
                        module = %e.module.name,
                        direction = %e.direction,
                        errors = ?e.errors,
                        "migrations completed with errors"
                    );
                }
            }
            Ok(())
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_one_listener_per_kind() {
        let dispatcher = EventDispatcher::new();
        install_logging_listeners(&dispatcher);

        for kind in [
            EventKind::ModuleRegistered,
            EventKind::ModuleDeregistered,
            EventKind::PermissionsCreated,
            EventKind::MigrationsCompleted,
        ] {
            assert_eq!(dispatcher.handler_count(kind), 1, "{kind}");
        }
    }
}
