//! The module registry.
//!
//! Owns every registered module, enforces name and route uniqueness, drives
//! the register/deregister lifecycle and serves cached aggregates.
//!
//! Mutations are serialized by `write_lock`. The module set sits behind a
//! read/write lock that is only held for writing while the set itself
//! changes, so reads proceed while a mutation waits on its collaborators.
//! Aggregate computation keeps the read lock until the result is cached,
//! which keeps a stale aggregate from being written after an invalidation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::aggregate::{collect_navigation, collect_permissions, route_conflicts};
use super::report::LifecycleReport;
use super::set::ModuleSet;
use crate::cache::{Cache, CacheKeys, MokaCache};
use crate::collaborators::{
    InMemoryPermissionStore, MigrationRunner, NullMigrationRunner, PermissionStore, RouteResolver,
};
use crate::config::ModulioConfig;
use crate::error::{RegistryError, RegistryResult, SideEffect, SideEffectFailure};
use crate::events::{
    EventBus, EventDispatcher, MigrationDirection, ModuleEvent, install_logging_listeners,
};
use crate::module::{Module, ModuleBuilder};
use crate::navigation::NavigationItem;

/// The collaborators a registry delegates to.
#[derive(Clone)]
pub struct RegistryServices {
    pub cache: Arc<dyn Cache>,
    pub migrations: Arc<dyn MigrationRunner>,
    pub permissions: Arc<dyn PermissionStore>,
    pub events: Arc<dyn EventBus>,
}

impl RegistryServices {
    /// Process-local services: Moka cache, logging-only migrations, an
    /// in-memory permission store and an event dispatcher (with the logging
    /// listeners when `log_events` is on).
    pub fn in_memory(config: &ModulioConfig) -> Self {
        let dispatcher = EventDispatcher::new();
        if config.log_events {
            install_logging_listeners(&dispatcher);
        }

        Self {
            cache: Arc::new(MokaCache::new(config.cache_capacity)),
            migrations: Arc::new(NullMigrationRunner),
            permissions: Arc::new(InMemoryPermissionStore::new()),
            events: Arc::new(dispatcher),
        }
    }
}

/// Registry of modules.
pub struct ModuleRegistry {
    config: ModulioConfig,
    keys: CacheKeys,
    services: RegistryServices,
    modules: RwLock<ModuleSet>,
    write_lock: Mutex<()>,
}

impl ModuleRegistry {
    pub fn new(config: ModulioConfig, services: RegistryServices) -> Self {
        let keys = CacheKeys::new(config.cache_prefix.clone());
        Self {
            config,
            keys,
            services,
            modules: RwLock::new(ModuleSet::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Registry wired to [`RegistryServices::in_memory`].
    pub fn in_memory(config: ModulioConfig) -> Self {
        let services = RegistryServices::in_memory(&config);
        Self::new(config, services)
    }

    pub fn config(&self) -> &ModulioConfig {
        &self.config
    }

    pub fn cache_keys(&self) -> &CacheKeys {
        &self.keys
    }

    /// Start registering a module named `name`.
    ///
    /// Finalizing the returned builder calls [`add_module`](Self::add_module).
    pub fn register(
        &self,
        name: impl Into<String>,
    ) -> ModuleBuilder<'_, RegistryResult<LifecycleReport>> {
        ModuleBuilder::new(name, move |module| self.add_module(module))
    }

    /// Add a fully configured module.
    ///
    /// Fails without changing anything if the module is not allowed, the
    /// registry is full, the name is taken or a route name collides.
    /// Collaborator failures after that point are reported, not returned.
    pub fn add_module(&self, module: Module) -> RegistryResult<LifecycleReport> {
        let _guard = self.write_lock.lock();

        self.check_admissible(&module)?;

        let module = Arc::new(module);
        self.modules.write().insert(Arc::clone(&module));

        let mut report = LifecycleReport::new(&module.name);

        if module.run_migrations_on_register {
            self.run_migrations(&module, MigrationDirection::Up, &mut report);
        }

        if self.config.auto_create_permissions && !module.permissions.is_empty() {
            self.sync_permissions(&module, &mut report);
        }

        self.invalidate_aggregates(&[]);
        self.remember_modules();

        info!(
            module = %module.name,
            routes = module.routes.len(),
            failures = report.failures.len(),
            "module added"
        );

        self.services
            .events
            .emit(&ModuleEvent::registered(Arc::clone(&module), report.context()));

        Ok(report)
    }

    /// Remove a module.
    pub fn deregister(&self, name: &str) -> RegistryResult<LifecycleReport> {
        self.deregister_with_reason(name, None, HashMap::new())
    }

    /// Remove a module, recording why in the emitted event.
    pub fn deregister_with_reason(
        &self,
        name: &str,
        reason: Option<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> RegistryResult<LifecycleReport> {
        let _guard = self.write_lock.lock();

        let module = self
            .modules
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(name))?;

        let mut report = LifecycleReport::new(name);

        if module.rollback_migrations_on_deregister {
            self.run_migrations(&module, MigrationDirection::Down, &mut report);
        }

        self.modules.write().remove(name);

        if self.config.auto_delete_permissions && !module.permissions.is_empty() {
            self.delete_orphaned_permissions(&module, &mut report);
        }

        self.invalidate_aggregates(&module.menu_names());
        self.remember_modules();

        info!(
            module = %name,
            reason = reason.as_deref().unwrap_or("-"),
            failures = report.failures.len(),
            "module removed"
        );

        let mut event_context = report.context();
        event_context.extend(context);
        self.services
            .events
            .emit(&ModuleEvent::deregistered(module, reason, event_context));

        Ok(report)
    }

    pub fn module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.read().get(name).cloned()
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.read().contains(name)
    }

    /// All modules in registration order.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.modules.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// Ordered navigation for `menu` across all modules.
    pub fn navigation_items(&self, menu: &str) -> Vec<NavigationItem> {
        let key = self.keys.navigation(menu);
        if let Some(items) = self.cached(&key) {
            return items;
        }

        let modules = self.modules.read();
        let items = collect_navigation(&modules, menu, self.config.order_conflict_resolution);
        if self.config.cache_enabled {
            self.store(&key, &items);
            self.index_navigation_menu(menu);
        }
        items
    }

    /// Navigation for `menu` limited to what `user_permissions` may see.
    pub fn authorized_navigation_items<S: AsRef<str>>(
        &self,
        menu: &str,
        user_permissions: &[S],
    ) -> Vec<NavigationItem> {
        self.navigation_items(menu)
            .into_iter()
            .filter(|item| item.is_authorized(user_permissions))
            .collect()
    }

    /// Breadcrumb titles for `current_route` in `menu`, as seen by a user
    /// holding `user_permissions`.
    ///
    /// The item's `group` name, when set, precedes its title. Empty when no
    /// visible item links to the route.
    pub fn breadcrumbs<S: AsRef<str>>(
        &self,
        menu: &str,
        current_route: &str,
        user_permissions: &[S],
    ) -> Vec<String> {
        self.authorized_navigation_items(menu, user_permissions)
            .into_iter()
            .find(|item| item.is_active(current_route))
            .map(|item| item.group.into_iter().chain([item.title]).collect())
            .unwrap_or_default()
    }

    /// Deduplicated permissions of all modules.
    pub fn all_permissions(&self) -> Vec<String> {
        let key = self.keys.permissions();
        if let Some(permissions) = self.cached(&key) {
            return permissions;
        }

        let modules = self.modules.read();
        let permissions = collect_permissions(&modules);
        if self.config.cache_enabled {
            self.store(&key, &permissions);
        }
        permissions
    }

    /// Forget every cache entry under the registry's prefix.
    ///
    /// Navigation entries are found through the cached menu index, the
    /// configured menus and the menus registered modules declare, so entries
    /// written by another registry sharing the backend are cleared as well.
    pub fn clear_cache(&self) {
        let _guard = self.write_lock.lock();
        self.services.cache.forget(&self.keys.modules());
        self.invalidate_aggregates(&[]);
        debug!(prefix = %self.config.cache_prefix, "registry cache cleared");
    }

    /// Reload modules from the cached collection.
    ///
    /// No side effects run and no events are emitted. Modules whose name or
    /// routes clash with what is already registered are skipped. Returns the
    /// number of modules restored.
    pub fn restore_from_cache(&self) -> usize {
        let _guard = self.write_lock.lock();

        let Some(cached) = self.cached::<Vec<Module>>(&self.keys.modules()) else {
            return 0;
        };

        let mut restored = 0;
        let mut modules = self.modules.write();
        for module in cached {
            if modules.contains(&module.name) || !route_conflicts(&modules, &module).is_empty() {
                warn!(module = %module.name, "skipping cached module that clashes with the registry");
                continue;
            }
            modules.insert(Arc::new(module));
            restored += 1;
        }
        drop(modules);

        if restored > 0 {
            self.invalidate_aggregates(&[]);
        }
        info!(restored, "modules restored from cache");
        restored
    }

    fn check_admissible(&self, module: &Module) -> RegistryResult<()> {
        if !self.config.is_module_allowed(&module.name) {
            return Err(RegistryError::ModuleNotAllowed {
                module: module.name.clone(),
            });
        }

        let modules = self.modules.read();

        if modules.contains(&module.name) {
            return Err(RegistryError::DuplicateModuleName {
                module: module.name.clone(),
            });
        }

        if modules.len() >= self.config.max_modules {
            return Err(RegistryError::ModuleLimitReached {
                module: module.name.clone(),
                max: self.config.max_modules,
            });
        }

        let conflicts = route_conflicts(&modules, module);
        if !conflicts.is_empty() {
            warn!(module = %module.name, routes = ?conflicts, "duplicate routes, module rejected");
            return Err(RegistryError::duplicate_route(&module.name, conflicts));
        }

        Ok(())
    }

    fn run_migrations(
        &self,
        module: &Arc<Module>,
        direction: MigrationDirection,
        report: &mut LifecycleReport,
    ) {
        let operation = match direction {
            MigrationDirection::Up => SideEffect::MigrationRun,
            MigrationDirection::Down => SideEffect::MigrationRollback,
        };

        let mut executed = Vec::new();
        let mut errors = Vec::new();

        for path in &module.migration_paths {
            let target = path.display().to_string();
            let result = match direction {
                MigrationDirection::Up => self.services.migrations.run(path),
                MigrationDirection::Down => self.services.migrations.rollback(path),
            };

            match result {
                Ok(()) => executed.push(target),
                Err(e) => {
                    warn!(
                        module = %module.name,
                        path = %target,
                        direction = %direction,
                        error = %e,
                        "migration failed"
                    );
                    errors.push(format!("{target}: {e:#}"));
                    report
                        .failures
                        .push(SideEffectFailure::new(&module.name, operation, target, &e));
                }
            }
        }

        report.migrations.extend(executed.iter().cloned());
        self.services.events.emit(&ModuleEvent::migrations_completed(
            Arc::clone(module),
            direction,
            executed,
            errors,
        ));
    }

    fn sync_permissions(&self, module: &Arc<Module>, report: &mut LifecycleReport) {
        let mut existing = Vec::new();
        let mut seen = HashSet::new();

        for permission in &module.permissions {
            if !seen.insert(permission.as_str()) {
                continue;
            }

            let outcome = self
                .services
                .permissions
                .exists(permission)
                .and_then(|present| {
                    if present {
                        Ok(false)
                    } else {
                        self.services.permissions.create(permission).map(|()| true)
                    }
                });

            match outcome {
                Ok(true) => report.permissions_created.push(permission.clone()),
                Ok(false) => existing.push(permission.clone()),
                Err(e) => {
                    warn!(
                        module = %module.name,
                        permission = %permission,
                        error = %e,
                        "permission create failed"
                    );
                    report.failures.push(SideEffectFailure::new(
                        &module.name,
                        SideEffect::PermissionCreate,
                        permission,
                        &e,
                    ));
                }
            }
        }

        self.services.events.emit(&ModuleEvent::permissions_created(
            Arc::clone(module),
            report.permissions_created.clone(),
            existing,
        ));
    }

    /// Delete `module`'s permissions that no remaining module declares.
    fn delete_orphaned_permissions(&self, module: &Module, report: &mut LifecycleReport) {
        let still_declared: HashSet<String> = collect_permissions(&self.modules.read())
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        for permission in &module.permissions {
            if still_declared.contains(permission) || !seen.insert(permission.as_str()) {
                continue;
            }

            match self.services.permissions.delete(permission) {
                Ok(true) => report.permissions_deleted.push(permission.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        module = %module.name,
                        permission = %permission,
                        error = %e,
                        "permission delete failed"
                    );
                    report.failures.push(SideEffectFailure::new(
                        &module.name,
                        SideEffect::PermissionDelete,
                        permission,
                        &e,
                    ));
                }
            }
        }
    }

    /// Drop cached permission and navigation aggregates.
    ///
    /// `extra_menus` covers menus of a module that was just removed.
    fn invalidate_aggregates(&self, extra_menus: &[&str]) {
        let cache = &self.services.cache;
        cache.forget(&self.keys.permissions());

        let indexed: Vec<String> = self
            .cached(&self.keys.navigation_menus())
            .unwrap_or_default();
        let declared: Vec<String> = self
            .modules
            .read()
            .iter()
            .flat_map(|m| m.menu_names().into_iter().map(String::from))
            .collect();

        let menus: BTreeSet<&str> = indexed
            .iter()
            .chain(&declared)
            .chain(&self.config.available_menus)
            .map(String::as_str)
            .chain(extra_menus.iter().copied())
            .collect();
        for menu in menus {
            cache.forget(&self.keys.navigation(menu));
        }
        cache.forget(&self.keys.navigation_menus());
    }

    /// Record `menu` in the cached menu index.
    fn index_navigation_menu(&self, menu: &str) {
        let key = self.keys.navigation_menus();
        let mut menus: Vec<String> = self.cached(&key).unwrap_or_default();
        if !menus.iter().any(|m| m == menu) {
            menus.push(menu.to_string());
            self.store(&key, &menus);
        }
    }

    /// Write the current module collection to the cache.
    fn remember_modules(&self) {
        if !self.config.cache_enabled {
            return;
        }
        let modules: Vec<Arc<Module>> = self.modules.read().iter().cloned().collect();
        self.store(&self.keys.modules(), &modules);
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.config.cache_enabled {
            return None;
        }
        let raw = self.services.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "discarding undecodable cache entry");
                self.services.cache.forget(key);
                None
            }
        }
    }

    fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.services.cache.put(key, json, self.config.cache_ttl),
            Err(e) => warn!(key = %key, error = %e, "failed to encode cache entry"),
        }
    }
}

impl RouteResolver for ModuleRegistry {
    fn resolve(&self, route_name: &str) -> Option<String> {
        self.modules
            .read()
            .iter()
            .flat_map(|m| m.routes.iter())
            .find(|r| r.name == route_name)
            .map(|r| r.uri.clone())
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .modules
            .read()
            .iter()
            .map(|m| m.name.clone())
            .collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .field("cache_prefix", &self.config.cache_prefix)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::navigation::Navigation;

    fn registry() -> ModuleRegistry {
        ModuleRegistry::in_memory(ModulioConfig::default())
    }

    #[test]
    fn register_through_builder() {
        let registry = registry();
        let report = registry
            .register("blog")
            .version("1.0.0")
            .route("blog.index", "/blog", "index", ["web"])
            .register()
            .unwrap();

        assert!(report.is_clean());
        assert!(registry.has_module("blog"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("blog.index").as_deref(), Some("/blog"));
        assert!(registry.resolve("shop.index").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = registry();
        registry.add_module(Module::new("blog")).unwrap();
        let err = registry.add_module(Module::new("blog")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateModuleName {
                module: "blog".into()
            }
        );
    }

    #[test]
    fn policy_limits_apply() {
        let config = ModulioConfig {
            max_modules: 1,
            forbidden_modules: vec!["legacy".into()],
            ..ModulioConfig::default()
        };
        let registry = ModuleRegistry::in_memory(config);

        assert!(matches!(
            registry.add_module(Module::new("legacy")),
            Err(RegistryError::ModuleNotAllowed { .. })
        ));
        registry.add_module(Module::new("blog")).unwrap();
        assert!(matches!(
            registry.add_module(Module::new("shop")),
            Err(RegistryError::ModuleLimitReached { max: 1, .. })
        ));
    }

    #[test]
    fn permissions_are_created_once() {
        let store = Arc::new(InMemoryPermissionStore::new());
        store.create("blog.view").unwrap();

        let config = ModulioConfig::default();
        let mut services = RegistryServices::in_memory(&config);
        services.permissions = store.clone();
        let registry = ModuleRegistry::new(config, services);

        let report = registry
            .add_module(Module::new("blog").permissions(["blog.view", "blog.edit", "blog.edit"]))
            .unwrap();

        assert_eq!(report.permissions_created, vec!["blog.edit"]);
        assert_eq!(store.names(), vec!["blog.edit", "blog.view"]);
    }

    #[test]
    fn navigation_is_cached_until_mutation() {
        let registry = registry();
        registry
            .add_module(Module::new("a").nav(Navigation::make(
                "admin",
                [NavigationItem::make("Users")],
            )))
            .unwrap();

        assert_eq!(registry.navigation_items("admin").len(), 1);

        registry
            .add_module(Module::new("b").nav(Navigation::make(
                "admin",
                [NavigationItem::make("Posts")],
            )))
            .unwrap();

        let titles: Vec<_> = registry
            .navigation_items("admin")
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Posts", "Users"]);
    }

    #[test]
    fn restore_rehydrates_from_shared_cache() {
        let config = ModulioConfig::default();
        let services = RegistryServices::in_memory(&config);

        let first = ModuleRegistry::new(config.clone(), services.clone());
        first
            .add_module(Module::new("blog").permission("blog.view"))
            .unwrap();
        first.add_module(Module::new("shop")).unwrap();

        let second = ModuleRegistry::new(config, services);
        assert_eq!(second.restore_from_cache(), 2);
        let names: Vec<_> = second.modules().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["blog", "shop"]);
        assert_eq!(second.all_permissions(), vec!["blog.view"]);

        assert_eq!(second.restore_from_cache(), 0);
    }
}
