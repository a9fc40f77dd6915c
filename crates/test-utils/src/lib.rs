//! Modulio test utilities.
//!
//! Helpers for integration testing: module fixtures, recording doubles for
//! the registry's collaborators, and assertion utilities.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use modulio_kernel::cache::Cache;
use modulio_kernel::collaborators::{MigrationRunner, PermissionStore};
use modulio_kernel::config::ModulioConfig;
use modulio_kernel::events::{EventBus, EventKind, ModuleEvent};
use modulio_kernel::module::Module;
use modulio_kernel::navigation::{Navigation, NavigationItem};
use modulio_kernel::registry::{ModuleRegistry, RegistryServices};
use parking_lot::Mutex;

/// Create a module with a version and nothing else.
pub fn test_module(name: &str) -> Module {
    Module::new(name).version("1.0.0")
}

/// Create a module with one route per name, URIs derived from the name.
pub fn module_with_routes(name: &str, routes: &[&str]) -> Module {
    routes.iter().fold(test_module(name), |module, route| {
        module.route(
            *route,
            format!("/{}", route.replace('.', "/")),
            format!("{name}@{route}"),
            ["web"],
        )
    })
}

/// Create a module contributing `(title, order)` items to `menu`.
pub fn module_with_nav(name: &str, menu: &str, items: &[(&str, i32)]) -> Module {
    test_module(name).nav(Navigation::make(
        menu,
        items
            .iter()
            .map(|(title, order)| NavigationItem::make(*title).order(*order)),
    ))
}

/// Titles of navigation items, in order.
pub fn titles(items: &[NavigationItem]) -> Vec<String> {
    items.iter().map(|i| i.title.clone()).collect()
}

/// Migration runner that records calls and fails for chosen paths.
#[derive(Debug, Default)]
pub struct RecordingMigrationRunner {
    runs: Mutex<Vec<PathBuf>>,
    rollbacks: Mutex<Vec<PathBuf>>,
    failing: Mutex<HashSet<PathBuf>>,
}

impl RecordingMigrationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `path` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing.lock().insert(path.into());
    }

    pub fn runs(&self) -> Vec<PathBuf> {
        self.runs.lock().clone()
    }

    pub fn rollbacks(&self) -> Vec<PathBuf> {
        self.rollbacks.lock().clone()
    }

    fn check(&self, path: &Path) -> Result<()> {
        if self.failing.lock().contains(path) {
            bail!("migration at {} failed", path.display());
        }
        Ok(())
    }
}

impl MigrationRunner for RecordingMigrationRunner {
    fn run(&self, path: &Path) -> Result<()> {
        self.runs.lock().push(path.to_path_buf());
        self.check(path)
    }

    fn rollback(&self, path: &Path) -> Result<()> {
        self.rollbacks.lock().push(path.to_path_buf());
        self.check(path)
    }
}

/// Permission store that records calls and fails for chosen names.
#[derive(Debug, Default)]
pub struct RecordingPermissionStore {
    names: Mutex<HashSet<String>>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `names`.
    pub fn with_existing(names: &[&str]) -> Self {
        let store = Self::new();
        store
            .names
            .lock()
            .extend(names.iter().map(|n| n.to_string()));
        store
    }

    /// Make every call for `name` fail.
    pub fn fail_on(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().contains(name)
    }

    /// Names passed to `create`, in call order.
    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    /// Names passed to `delete`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing.lock().contains(name) {
            bail!("permission store unavailable for '{name}'");
        }
        Ok(())
    }
}

impl PermissionStore for RecordingPermissionStore {
    fn exists(&self, name: &str) -> Result<bool> {
        self.check(name)?;
        Ok(self.names.lock().contains(name))
    }

    fn create(&self, name: &str) -> Result<()> {
        self.created.lock().push(name.to_string());
        self.check(name)?;
        self.names.lock().insert(name.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        self.deleted.lock().push(name.to_string());
        self.check(name)?;
        Ok(self.names.lock().remove(name))
    }
}

/// Event bus that keeps every emitted event.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<ModuleEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModuleEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(ModuleEvent::kind).collect()
    }

    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: EventKind) -> Vec<ModuleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, event: &ModuleEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Plain map cache without expiry, with direct access for planting values.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    ttls: Mutex<HashMap<String, Duration>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw value, bypassing the registry.
    pub fn plant(&self, key: &str, value: impl Into<String>) {
        self.entries.lock().insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// TTL the key was last stored with through [`Cache::put`].
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().get(key).copied()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        self.entries.lock().insert(key.to_string(), value);
        self.ttls.lock().insert(key.to_string(), ttl);
    }

    fn forget(&self, key: &str) {
        self.entries.lock().remove(key);
        self.ttls.lock().remove(key);
    }
}

/// A registry wired to recording doubles, with handles to each double.
pub struct TestRegistry {
    pub registry: ModuleRegistry,
    pub cache: Arc<InMemoryCache>,
    pub migrations: Arc<RecordingMigrationRunner>,
    pub permissions: Arc<RecordingPermissionStore>,
    pub events: Arc<RecordingEventBus>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::with_config(ModulioConfig::default())
    }

    pub fn with_config(config: ModulioConfig) -> Self {
        Self::with_parts(config, RecordingPermissionStore::new())
    }

    /// Registry whose permission store starts as `permissions`.
    pub fn with_parts(config: ModulioConfig, permissions: RecordingPermissionStore) -> Self {
        let cache = Arc::new(InMemoryCache::new());
        let migrations = Arc::new(RecordingMigrationRunner::new());
        let permissions = Arc::new(permissions);
        let events = Arc::new(RecordingEventBus::new());

        let services = RegistryServices {
            cache: cache.clone(),
            migrations: migrations.clone(),
            permissions: permissions.clone(),
            events: events.clone(),
        };

        Self {
            registry: ModuleRegistry::new(config, services),
            cache,
            migrations,
            permissions,
            events,
        }
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestRegistry {
    type Target = ModuleRegistry;

    fn deref(&self) -> &ModuleRegistry {
        &self.registry
    }
}

/// Assertion helpers.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}
