//! Interfaces to the systems the registry delegates to.
//!
//! The registry never touches a database or the router directly. Migrations,
//! permission records and route URLs belong to the surrounding application,
//! which plugs them in through these traits.

use std::path::Path;

use anyhow::Result;
use dashmap::DashSet;
use tracing::debug;

/// Runs and rolls back a module's migrations.
pub trait MigrationRunner: Send + Sync {
    /// Apply all pending migrations under `path`.
    fn run(&self, path: &Path) -> Result<()>;

    /// Roll back the migrations under `path`.
    fn rollback(&self, path: &Path) -> Result<()>;
}

/// Persistent permission records.
pub trait PermissionStore: Send + Sync {
    fn exists(&self, name: &str) -> Result<bool>;

    fn create(&self, name: &str) -> Result<()>;

    /// Delete a permission. Returns `false` if it did not exist.
    fn delete(&self, name: &str) -> Result<bool>;
}

/// Maps route names to URLs.
pub trait RouteResolver {
    fn resolve(&self, route_name: &str) -> Option<String>;
}

/// Migration runner that only logs. Used when the host application manages
/// its own schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMigrationRunner;

impl MigrationRunner for NullMigrationRunner {
    fn run(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "skipping migration run");
        Ok(())
    }

    fn rollback(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "skipping migration rollback");
        Ok(())
    }
}

/// Process-local permission store backed by a concurrent set.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    names: DashSet<String>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored permissions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Snapshot of stored names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.names.contains(name))
    }

    fn create(&self, name: &str) -> Result<()> {
        self.names.insert(name.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.names.remove(name).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_create_and_delete() {
        let store = InMemoryPermissionStore::new();
        assert!(!store.exists("blog.view").unwrap());

        store.create("blog.view").unwrap();
        store.create("blog.view").unwrap();
        assert!(store.exists("blog.view").unwrap());
        assert_eq!(store.len(), 1);

        assert!(store.delete("blog.view").unwrap());
        assert!(!store.delete("blog.view").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn null_runner_always_succeeds() {
        let runner = NullMigrationRunner;
        assert!(runner.run(Path::new("/nowhere")).is_ok());
        assert!(runner.rollback(Path::new("/nowhere")).is_ok());
    }
}
