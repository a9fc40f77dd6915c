//! Lifecycle events emitted by the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::module::Module;

/// Discriminant used to route events to their handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ModuleRegistered,
    ModuleDeregistered,
    PermissionsCreated,
    MigrationsCompleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ModuleRegistered => "module_registered",
            Self::ModuleDeregistered => "module_deregistered",
            Self::PermissionsCreated => "permissions_created",
            Self::MigrationsCompleted => "migrations_completed",
        };
        f.write_str(s)
    }
}

/// Direction of a migration batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    Up,
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A module entered the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleRegistered {
    pub id: Uuid,
    pub module: Arc<Module>,
    pub context: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// A module left the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDeregistered {
    pub id: Uuid,
    pub module: Arc<Module>,
    pub reason: Option<String>,
    pub context: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Permission records were synchronized for a module.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionsCreated {
    pub id: Uuid,
    pub module: Arc<Module>,
    /// Permissions this registration created.
    pub created: Vec<String>,
    /// Permissions that were already present in the store.
    pub existing: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A module's migration paths were run or rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationsCompleted {
    pub id: Uuid,
    pub module: Arc<Module>,
    pub direction: MigrationDirection,
    /// Paths that completed.
    pub executed: Vec<String>,
    /// `path: error` for each path that failed.
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Every event the registry emits.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ModuleEvent {
    Registered(ModuleRegistered),
    Deregistered(ModuleDeregistered),
    PermissionsCreated(PermissionsCreated),
    MigrationsCompleted(MigrationsCompleted),
}

impl ModuleEvent {
    pub fn registered(module: Arc<Module>, context: HashMap<String, serde_json::Value>) -> Self {
        Self::Registered(ModuleRegistered {
            id: Uuid::now_v7(),
            module,
            context,
            timestamp: Utc::now(),
        })
    }

    pub fn deregistered(
        module: Arc<Module>,
        reason: Option<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self::Deregistered(ModuleDeregistered {
            id: Uuid::now_v7(),
            module,
            reason,
            context,
            timestamp: Utc::now(),
        })
    }

    pub fn permissions_created(
        module: Arc<Module>,
        created: Vec<String>,
        existing: Vec<String>,
    ) -> Self {
        Self::PermissionsCreated(PermissionsCreated {
            id: Uuid::now_v7(),
            module,
            created,
            existing,
            timestamp: Utc::now(),
        })
    }

    pub fn migrations_completed(
        module: Arc<Module>,
        direction: MigrationDirection,
        executed: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        Self::MigrationsCompleted(MigrationsCompleted {
            id: Uuid::now_v7(),
            module,
            direction,
            executed,
            errors,
            timestamp: Utc::now(),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Registered(_) => EventKind::ModuleRegistered,
            Self::Deregistered(_) => EventKind::ModuleDeregistered,
            Self::PermissionsCreated(_) => EventKind::PermissionsCreated,
            Self::MigrationsCompleted(_) => EventKind::MigrationsCompleted,
        }
    }

    /// The module the event is about.
    pub fn module(&self) -> &Module {
        match self {
            Self::Registered(e) => &e.module,
            Self::Deregistered(e) => &e.module,
            Self::PermissionsCreated(e) => &e.module,
            Self::MigrationsCompleted(e) => &e.module,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Registered(e) => e.timestamp,
            Self::Deregistered(e) => e.timestamp,
            Self::PermissionsCreated(e) => e.timestamp,
            Self::MigrationsCompleted(e) => e.timestamp,
        }
    }

    /// Flat key/value summary for structured logs.
    pub fn logging_context(&self) -> serde_json::Value {
        let module = self.module();
        let mut ctx = serde_json::json!({
            "event": self.kind().to_string(),
            "module": module.name,
            "version": module.version,
            "timestamp": self.timestamp().to_rfc3339(),
        });

        if let Some(obj) = ctx.as_object_mut() {
            match self {
                Self::Registered(e) => {
                    obj.insert("context".into(), serde_json::json!(e.context));
                }
                Self::Deregistered(e) => {
                    obj.insert("reason".into(), serde_json::json!(e.reason));
                    obj.insert("context".into(), serde_json::json!(e.context));
                }
                Self::PermissionsCreated(e) => {
                    obj.insert("created".into(), serde_json::json!(e.created));
                    obj.insert("existing".into(), serde_json::json!(e.existing));
                }
                Self::MigrationsCompleted(e) => {
                    obj.insert("direction".into(), serde_json::json!(e.direction));
                    obj.insert("executed".into(), serde_json::json!(e.executed));
                    obj.insert("errors".into(), serde_json::json!(e.errors));
                }
            }
        }

        ctx
    }
}

/// Receives registry events.
///
/// Implementations must not call back into registry mutations.
pub trait EventBus: Send + Sync {
    fn emit(&self, event: &ModuleEvent);
}

/// Event bus that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _event: &ModuleEvent) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn blog() -> Arc<Module> {
        Arc::new(Module::new("blog").version("1.0.0"))
    }

    #[test]
    fn kind_matches_variant() {
        let event = ModuleEvent::registered(blog(), HashMap::new());
        assert_eq!(event.kind(), EventKind::ModuleRegistered);
        assert_eq!(event.module().name, "blog");

        let event = ModuleEvent::deregistered(blog(), Some("retired".into()), HashMap::new());
        assert_eq!(event.kind(), EventKind::ModuleDeregistered);
    }

    #[test]
    fn logging_context_carries_variant_fields() {
        let event = ModuleEvent::deregistered(blog(), Some("retired".into()), HashMap::new());
        let ctx = event.logging_context();
        assert_eq!(ctx["event"], "module_deregistered");
        assert_eq!(ctx["module"], "blog");
        assert_eq!(ctx["version"], "1.0.0");
        assert_eq!(ctx["reason"], "retired");

        let event = ModuleEvent::migrations_completed(
            blog(),
            MigrationDirection::Up,
            vec!["db/blog".into()],
            Vec::new(),
        );
        let ctx = event.logging_context();
        assert_eq!(ctx["direction"], "up");
        assert_eq!(ctx["executed"][0], "db/blog");
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = ModuleEvent::permissions_created(blog(), vec!["blog.view".into()], Vec::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "permissions_created");
        assert_eq!(json["created"][0], "blog.view");
    }
}
