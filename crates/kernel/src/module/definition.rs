//! The module model.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::navigation::{Navigation, NavigationItem};

/// A route declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Route name, unique across all registered modules.
    pub name: String,
    /// URI pattern (e.g., "/blog/{slug}").
    pub uri: String,
    /// Opaque reference to the handler.
    pub action: String,
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// A feature bundle registered into the application.
///
/// Configured by value through chained setters. Once the registry accepts a
/// module it is shared read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Machine name (lowercase, e.g. "blog").
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config_paths: Vec<PathBuf>,
    #[serde(default)]
    pub migration_paths: Vec<PathBuf>,
    /// Run migrations when the module is registered.
    #[serde(default)]
    pub run_migrations_on_register: bool,
    /// Roll migrations back when the module is deregistered.
    #[serde(default)]
    pub rollback_migrations_on_deregister: bool,
    #[serde(default)]
    pub navigations: Vec<Navigation>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Other modules this one needs, with their minimum version.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            description: None,
            config_paths: Vec::new(),
            migration_paths: Vec::new(),
            run_migrations_on_register: false,
            rollback_migrations_on_deregister: false,
            navigations: Vec::new(),
            permissions: Vec::new(),
            routes: Vec::new(),
            metadata: HashMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a configuration file path.
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_paths.push(path.into());
        self
    }

    /// Add a migration directory.
    pub fn migrations(mut self, path: impl Into<PathBuf>) -> Self {
        self.migration_paths.push(path.into());
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations_on_register = run;
        self
    }

    pub fn rollback_migrations(mut self, rollback: bool) -> Self {
        self.rollback_migrations_on_deregister = rollback;
        self
    }

    pub fn nav(mut self, navigation: Navigation) -> Self {
        self.navigations.push(navigation);
        self
    }

    pub fn navs(mut self, navigations: impl IntoIterator<Item = Navigation>) -> Self {
        self.navigations.extend(navigations);
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn route<I, S>(
        mut self,
        name: impl Into<String>,
        uri: impl Into<String>,
        action: impl Into<String>,
        middleware: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes.push(RouteDefinition {
            name: name.into(),
            uri: uri.into(),
            action: action.into(),
            middleware: middleware.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Require another module at `min_version` or newer.
    pub fn depends_on(mut self, module: impl Into<String>, min_version: impl Into<String>) -> Self {
        self.dependencies.insert(module.into(), min_version.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route names in declaration order.
    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.name.as_str())
    }

    /// Look up a metadata value.
    pub fn get_meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Items of every navigation declared for `menu_name`, groups expanded,
    /// in declaration order.
    pub fn navigation_items<'a>(
        &'a self,
        menu_name: &'a str,
    ) -> impl Iterator<Item = &'a NavigationItem> + 'a {
        self.navigations
            .iter()
            .filter(move |n| n.menu_name == menu_name)
            .flat_map(Navigation::flattened_items)
    }

    /// Menu names this module contributes to, without duplicates.
    pub fn menu_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for nav in &self.navigations {
            if !names.contains(&nav.menu_name.as_str()) {
                names.push(&nav.menu_name);
            }
        }
        names
    }
}
