//! CLI command implementations.
//!
//! Commands build a process-local registry from the manifests directory,
//! using the no-op migration runner and the in-memory permission store.

use std::path::Path;

use anyhow::{Result, bail};

use crate::config::ModulioConfig;
use crate::module::{ModuleManifest, missing_dependencies, module_issues, register_all};
use crate::registry::ModuleRegistry;

/// Build a registry holding every module under `config.modules_dir`.
pub fn load_registry(config: &ModulioConfig) -> Result<ModuleRegistry> {
    let registry = ModuleRegistry::in_memory(config.clone());
    let manifests = ModuleManifest::discover(&config.modules_dir)?;
    register_all(&manifests, &registry)?;
    Ok(registry)
}

/// List registered modules.
pub fn cmd_list(config: &ModulioConfig) -> Result<()> {
    let registry = load_registry(config)?;

    if registry.is_empty() {
        println!("No modules found in {}.", config.modules_dir.display());
        return Ok(());
    }

    println!(
        "{:<20} {:<12} {:<8} {:<12} {:<10}",
        "MODULE", "VERSION", "ROUTES", "PERMISSIONS", "MENUS"
    );
    println!("{}", "-".repeat(70));

    for module in registry.modules() {
        println!(
            "{:<20} {:<12} {:<8} {:<12} {}",
            module.name,
            module.version.as_deref().unwrap_or("-"),
            module.routes.len(),
            module.permissions.len(),
            module.menu_names().join(",")
        );
    }

    Ok(())
}

/// Print the ordered navigation for `menu`.
pub fn cmd_nav(config: &ModulioConfig, menu: Option<&str>) -> Result<()> {
    let registry = load_registry(config)?;
    let menu = menu.unwrap_or(&config.default_menu);
    let items = registry.navigation_items(menu);

    if items.is_empty() {
        println!("Menu '{menu}' is empty.");
        return Ok(());
    }

    println!("{:<6} {:<28} {:<30} {:<20}", "ORDER", "TITLE", "URL", "PERMISSIONS");
    println!("{}", "-".repeat(84));

    for item in &items {
        let url = item.resolve_url(&registry).unwrap_or_else(|| "-".to_string());
        let permissions = if item.permissions.is_empty() {
            "public".to_string()
        } else {
            item.permissions.join(",")
        };
        println!(
            "{:<6} {:<28} {:<30} {}",
            item.order, item.title, url, permissions
        );
    }

    Ok(())
}

/// Print the aggregated permissions.
pub fn cmd_permissions(config: &ModulioConfig) -> Result<()> {
    let registry = load_registry(config)?;
    let permissions = registry.all_permissions();

    if permissions.is_empty() {
        println!("No permissions declared.");
        return Ok(());
    }

    for permission in permissions {
        println!("{permission}");
    }
    Ok(())
}

/// Validate every manifest in the modules directory. Fails if any has problems.
pub fn cmd_check(config: &ModulioConfig) -> Result<()> {
    let problems = check_manifests(config, &config.modules_dir)?;

    if problems.is_empty() {
        println!("All module manifests are valid.");
        return Ok(());
    }

    for problem in &problems {
        println!("  - {problem}");
    }
    bail!("{} problem(s) found", problems.len());
}

/// Every problem found in the manifests under `dir`, one line each.
pub fn check_manifests(config: &ModulioConfig, dir: &Path) -> Result<Vec<String>> {
    let paths = ModuleManifest::discover_paths(dir)?;
    let mut problems = Vec::new();
    let mut manifests = Vec::new();

    for path in paths {
        match ModuleManifest::parse(&path) {
            Ok(manifest) => manifests.push(manifest),
            Err(e) => problems.push(format!("{e:#}")),
        }
    }

    for manifest in &manifests {
        let module = manifest.to_module();
        for issue in module_issues(&module) {
            problems.push(format!("{}: {issue}", module.name));
        }
    }

    let scratch = ModulioConfig {
        cache_enabled: false,
        log_events: false,
        ..config.clone()
    };
    let registry = ModuleRegistry::in_memory(scratch);
    if let Err(e) = register_all(&manifests, &registry) {
        problems.push(format!("{e:#}"));
    }

    for manifest in &manifests {
        if !registry.has_module(&manifest.name) {
            if problems.iter().all(|p| !p.starts_with(&manifest.name)) {
                problems.push(format!("{}: could not be registered", manifest.name));
            }
            continue;
        }
        for missing in missing_dependencies(&manifest.to_module(), &registry) {
            problems.push(format!("{}: unmet dependency {missing}", manifest.name));
        }
    }

    Ok(problems)
}
