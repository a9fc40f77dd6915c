//! Fluent registration handle.

use std::fmt;
use std::path::PathBuf;

use super::definition::Module;
use crate::navigation::Navigation;

type Completion<'r, T> = Box<dyn FnOnce(Module) -> T + 'r>;

/// A module under construction, bound to whatever will receive it.
///
/// The completion callback is supplied when the builder is created, so a
/// builder can never be finalized into nothing. Finalizing consumes the
/// builder, which makes the callback run exactly once.
///
/// `T` is whatever the owner returns on completion; for
/// [`ModuleRegistry::register`](crate::registry::ModuleRegistry::register) it
/// is the registration result.
pub struct ModuleBuilder<'r, T> {
    module: Module,
    on_registered: Completion<'r, T>,
}

impl<'r, T> ModuleBuilder<'r, T> {
    /// Start a module named `name` that is handed to `on_registered` when
    /// finalized.
    pub fn new<F>(name: impl Into<String>, on_registered: F) -> Self
    where
        F: FnOnce(Module) -> T + 'r,
    {
        Self {
            module: Module::new(name),
            on_registered: Box::new(on_registered),
        }
    }

    /// Hand the finished module to its owner.
    pub fn finalize_registration(self) -> T {
        (self.on_registered)(self.module)
    }

    /// Alias of [`finalize_registration`](Self::finalize_registration) for
    /// fluent chains.
    pub fn register(self) -> T {
        self.finalize_registration()
    }

    /// The module as configured so far.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Apply an arbitrary transformation to the module.
    pub fn configure(self, f: impl FnOnce(Module) -> Module) -> Self {
        Self {
            module: f(self.module),
            on_registered: self.on_registered,
        }
    }

    pub fn version(self, version: impl Into<String>) -> Self {
        self.configure(|m| m.version(version))
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.configure(|m| m.description(description))
    }

    pub fn config(self, path: impl Into<PathBuf>) -> Self {
        self.configure(|m| m.config(path))
    }

    pub fn migrations(self, path: impl Into<PathBuf>) -> Self {
        self.configure(|m| m.migrations(path))
    }

    pub fn run_migrations(self, run: bool) -> Self {
        self.configure(|m| m.run_migrations(run))
    }

    pub fn rollback_migrations(self, rollback: bool) -> Self {
        self.configure(|m| m.rollback_migrations(rollback))
    }

    pub fn nav(self, navigation: Navigation) -> Self {
        self.configure(|m| m.nav(navigation))
    }

    pub fn navs(self, navigations: impl IntoIterator<Item = Navigation>) -> Self {
        self.configure(|m| m.navs(navigations))
    }

    pub fn permission(self, permission: impl Into<String>) -> Self {
        self.configure(|m| m.permission(permission))
    }

    pub fn permissions<I, S>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure(|m| m.permissions(permissions))
    }

    pub fn route<I, S>(
        self,
        name: impl Into<String>,
        uri: impl Into<String>,
        action: impl Into<String>,
        middleware: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure(|m| m.route(name, uri, action, middleware))
    }

    pub fn meta(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.configure(|m| m.meta(key, value))
    }

    pub fn depends_on(self, module: impl Into<String>, min_version: impl Into<String>) -> Self {
        self.configure(|m| m.depends_on(module, min_version))
    }
}

impl<T> fmt::Debug for ModuleBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("module", &self.module.name)
            .finish()
    }
}
