//! Parser for `{name}.module.toml` manifest files.
//!
//! A manifest declares a module without code:
//! - name, version, description
//! - dependencies (other modules that must register first)
//! - config and migration paths, relative to the manifest's directory
//! - permissions, routes, navigation and metadata

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::builder::ModuleBuilder;
use super::definition::{Module, RouteDefinition};
use super::dependency::resolve_load_order;
use crate::error::RegistryResult;
use crate::navigation::{Navigation, NavigationEntry};
use crate::registry::{LifecycleReport, ModuleRegistry};

/// File name suffix of module manifests.
pub const MANIFEST_SUFFIX: &str = ".module.toml";

/// Module metadata parsed from `.module.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleManifest {
    /// Module machine name.
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Required modules and their minimum versions.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Configuration files.
    #[serde(default)]
    pub config: Vec<PathBuf>,

    /// Migration directories.
    #[serde(default)]
    pub migrations: Vec<PathBuf>,

    #[serde(default)]
    pub run_migrations: bool,

    #[serde(default)]
    pub rollback_migrations: bool,

    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub routes: Vec<RouteDefinition>,

    #[serde(default)]
    pub navigation: Vec<ManifestNavigation>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Directory holding the manifest; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A `[[navigation]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestNavigation {
    pub menu: String,
    #[serde(default)]
    pub items: Vec<NavigationEntry>,
}

impl ModuleManifest {
    /// Parse a manifest file from the given path.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read module manifest: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self> {
        let mut manifest: ModuleManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse module manifest TOML at {}", path.display()))?;

        if manifest.name.trim().is_empty() {
            bail!("module manifest at {} has empty 'name' field", path.display());
        }

        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Find every manifest file in `dir` and its immediate subdirectories,
    /// sorted by path.
    pub fn discover_paths(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            info!(?dir, "modules directory does not exist, nothing to discover");
            return Ok(Vec::new());
        }

        let mut found = manifest_files(dir)
            .with_context(|| format!("failed to read modules directory: {}", dir.display()))?;

        let subdirs: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read modules directory: {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();

        for subdir in subdirs {
            match manifest_files(&subdir) {
                Ok(files) => found.extend(files),
                Err(e) => {
                    warn!(dir = %subdir.display(), error = %e, "failed to read module dir");
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Parse every manifest under `dir`. Manifests that fail to parse are
    /// logged and skipped.
    pub fn discover(dir: &Path) -> Result<Vec<Self>> {
        let mut manifests = Vec::new();
        for path in Self::discover_paths(dir)? {
            match Self::parse(&path) {
                Ok(manifest) => {
                    debug!(module = %manifest.name, path = %path.display(), "discovered module");
                    manifests.push(manifest);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %format!("{e:#}"), "invalid module manifest, skipping");
                }
            }
        }
        Ok(manifests)
    }

    /// Copy everything the manifest declares onto `builder`.
    pub fn apply<'r, T>(&self, builder: ModuleBuilder<'r, T>) -> ModuleBuilder<'r, T> {
        let mut builder = builder;

        if let Some(version) = &self.version {
            builder = builder.version(version.clone());
        }
        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }
        for path in &self.config {
            builder = builder.config(self.resolve(path));
        }
        for path in &self.migrations {
            builder = builder.migrations(self.resolve(path));
        }
        builder = builder
            .run_migrations(self.run_migrations)
            .rollback_migrations(self.rollback_migrations)
            .permissions(self.permissions.iter().cloned());

        for route in &self.routes {
            builder = builder.route(
                route.name.clone(),
                route.uri.clone(),
                route.action.clone(),
                route.middleware.iter().cloned(),
            );
        }

        builder = builder.navs(
            self.navigation
                .iter()
                .map(|nav| Navigation::make(nav.menu.clone(), nav.items.iter().cloned())),
        );

        for (key, value) in &self.metadata {
            builder = builder.meta(key.clone(), value.clone());
        }
        for (dependency, version) in &self.dependencies {
            builder = builder.depends_on(dependency.clone(), version.clone());
        }

        builder
    }

    /// Build the module this manifest describes.
    pub fn to_module(&self) -> Module {
        self.apply(ModuleBuilder::new(self.name.clone(), |module| module))
            .finalize_registration()
    }

    /// Register the described module into `registry`.
    pub fn register_into(&self, registry: &ModuleRegistry) -> RegistryResult<LifecycleReport> {
        self.apply(registry.register(self.name.clone())).register()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Register `manifests` in dependency order.
///
/// Dependencies already present in `registry` count as satisfied. A module
/// the registry rejects is logged and skipped. Returns how many modules
/// were registered.
///
/// # Errors
/// Returns error if two manifests share a name, a dependency is missing or
/// dependencies form a cycle.
pub fn register_all(manifests: &[ModuleManifest], registry: &ModuleRegistry) -> Result<usize> {
    let mut by_name: BTreeMap<String, &ModuleManifest> = BTreeMap::new();
    for manifest in manifests {
        if by_name.insert(manifest.name.clone(), manifest).is_some() {
            bail!("module '{}' is declared by more than one manifest", manifest.name);
        }
    }

    // Only ordering matters here, so drop edges to already registered modules.
    let graph: BTreeMap<String, Module> = by_name
        .iter()
        .map(|(name, manifest)| {
            let mut module = Module::new(name.clone());
            module.dependencies = manifest
                .dependencies
                .iter()
                .filter(|(dep, _)| !registry.has_module(dep))
                .map(|(dep, version)| (dep.clone(), version.clone()))
                .collect();
            (name.clone(), module)
        })
        .collect();

    let order = resolve_load_order(&graph)?;

    let mut registered = 0;
    for name in order {
        let Some(manifest) = by_name.get(&name) else {
            continue;
        };
        match manifest.register_into(registry) {
            Ok(report) => {
                registered += 1;
                if !report.is_clean() {
                    warn!(
                        module = %name,
                        failures = report.failures.len(),
                        "module registered with side-effect failures"
                    );
                }
            }
            Err(e) => {
                warn!(module = %name, error = %e, "failed to register module, skipping");
            }
        }
    }

    info!(count = registered, "registered modules from manifests");
    Ok(registered)
}

fn manifest_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX))
        })
        .collect())
}
