//! Configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// How navigation items sharing the same `order` are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderConflictResolution {
    /// Sort ties by title.
    #[default]
    Alphabet,
    /// Keep ties in module registration order.
    Registration,
}

impl FromStr for OrderConflictResolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "alphabet" => Ok(Self::Alphabet),
            "registration" => Ok(Self::Registration),
            other => bail!("unknown order conflict resolution '{other}' (expected 'alphabet' or 'registration')"),
        }
    }
}

impl fmt::Display for OrderConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alphabet => f.write_str("alphabet"),
            Self::Registration => f.write_str("registration"),
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct ModulioConfig {
    /// Memoize modules and aggregates in the cache (default: true).
    pub cache_enabled: bool,

    /// Lifetime of cache entries (default: 60 minutes).
    pub cache_ttl: Duration,

    /// Prefix for every cache key (default: "modulio").
    pub cache_prefix: String,

    /// Maximum entries held by the in-process cache (default: 10,000).
    pub cache_capacity: u64,

    /// Menu used when none is named (default: "default").
    pub default_menu: String,

    /// Menus known up front (default: default, admin, sidebar, footer, mobile).
    pub available_menus: Vec<String>,

    /// Tie-break for equal navigation order (default: alphabet).
    pub order_conflict_resolution: OrderConflictResolution,

    /// Create missing permission records on registration (default: true).
    pub auto_create_permissions: bool,

    /// Delete permission records no remaining module declares on
    /// deregistration (default: false).
    pub auto_delete_permissions: bool,

    /// Upper bound on registered modules (default: 100).
    pub max_modules: usize,

    /// When non-empty, only these modules may register.
    pub allowed_modules: Vec<String>,

    /// Modules that may never register.
    pub forbidden_modules: Vec<String>,

    /// Install the logging event listeners (default: true).
    pub log_events: bool,

    /// Directory scanned for `*.module.toml` manifests (default: ./modules).
    pub modules_dir: PathBuf,
}

impl Default for ModulioConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: Duration::from_secs(60 * 60),
            cache_prefix: "modulio".to_string(),
            cache_capacity: 10_000,
            default_menu: "default".to_string(),
            available_menus: ["default", "admin", "sidebar", "footer", "mobile"]
                .into_iter()
                .map(String::from)
                .collect(),
            order_conflict_resolution: OrderConflictResolution::Alphabet,
            auto_create_permissions: true,
            auto_delete_permissions: false,
            max_modules: 100,
            allowed_modules: Vec::new(),
            forbidden_modules: Vec::new(),
            log_events: true,
            modules_dir: PathBuf::from("./modules"),
        }
    }
}

impl ModulioConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_enabled = parse_bool(&lookup, "MODULIO_CACHE_ENABLED", defaults.cache_enabled)?;

        let cache_ttl_minutes: u64 = lookup("MODULIO_CACHE_TTL")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .context("MODULIO_CACHE_TTL must be a whole number of minutes")?;

        let cache_prefix = lookup("MODULIO_CACHE_PREFIX")
            .map(|p| p.trim().trim_end_matches('.').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.cache_prefix);

        let cache_capacity = lookup("MODULIO_CACHE_CAPACITY")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("MODULIO_CACHE_CAPACITY must be a valid u64")?
            .unwrap_or(defaults.cache_capacity);

        let default_menu = lookup("MODULIO_DEFAULT_MENU").unwrap_or(defaults.default_menu);

        let mut available_menus = lookup("MODULIO_AVAILABLE_MENUS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.available_menus);
        if !available_menus.contains(&default_menu) {
            available_menus.insert(0, default_menu.clone());
        }

        let order_conflict_resolution = lookup("MODULIO_ORDER_CONFLICT_RESOLUTION")
            .map(|v| v.parse::<OrderConflictResolution>())
            .transpose()
            .context("invalid MODULIO_ORDER_CONFLICT_RESOLUTION")?
            .unwrap_or_default();

        let auto_create_permissions = parse_bool(
            &lookup,
            "MODULIO_AUTO_CREATE_PERMISSIONS",
            defaults.auto_create_permissions,
        )?;

        let auto_delete_permissions = parse_bool(
            &lookup,
            "MODULIO_AUTO_DELETE_PERMISSIONS",
            defaults.auto_delete_permissions,
        )?;

        let max_modules = lookup("MODULIO_MAX_MODULES")
            .unwrap_or_else(|| "100".to_string())
            .parse()
            .context("MODULIO_MAX_MODULES must be a valid usize")?;

        let allowed_modules = lookup("MODULIO_ALLOWED_MODULES")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let forbidden_modules = lookup("MODULIO_FORBIDDEN_MODULES")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let log_events = parse_bool(&lookup, "MODULIO_LOG_EVENTS", defaults.log_events)?;

        let modules_dir = lookup("MODULIO_MODULES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.modules_dir);

        let cache_ttl_secs = cache_ttl_minutes
            .checked_mul(60)
            .context("MODULIO_CACHE_TTL is too large")?;

        Ok(Self {
            cache_enabled,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_prefix,
            cache_capacity,
            default_menu,
            available_menus,
            order_conflict_resolution,
            auto_create_permissions,
            auto_delete_permissions,
            max_modules,
            allowed_modules,
            forbidden_modules,
            log_events,
            modules_dir,
        })
    }

    /// Check the allow and deny lists for a module name.
    pub fn is_module_allowed(&self, name: &str) -> bool {
        if self.forbidden_modules.iter().any(|m| m == name) {
            return false;
        }
        self.allowed_modules.is_empty() || self.allowed_modules.iter().any(|m| m == name)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ModulioConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ModulioConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.cache_prefix, "modulio");
        assert_eq!(config.default_menu, "default");
        assert_eq!(config.available_menus.len(), 5);
        assert_eq!(
            config.order_conflict_resolution,
            OrderConflictResolution::Alphabet
        );
        assert_eq!(config.max_modules, 100);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("MODULIO_CACHE_ENABLED", "false"),
            ("MODULIO_CACHE_TTL", "5"),
            ("MODULIO_CACHE_PREFIX", "app.modules."),
            ("MODULIO_DEFAULT_MENU", "main"),
            ("MODULIO_AVAILABLE_MENUS", "admin, sidebar"),
            ("MODULIO_ORDER_CONFLICT_RESOLUTION", "Registration"),
            ("MODULIO_FORBIDDEN_MODULES", "legacy,,  beta "),
        ])
        .unwrap();

        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_prefix, "app.modules");
        assert_eq!(config.available_menus, vec!["main", "admin", "sidebar"]);
        assert_eq!(
            config.order_conflict_resolution,
            OrderConflictResolution::Registration
        );
        assert_eq!(config.forbidden_modules, vec!["legacy", "beta"]);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = load(&[("MODULIO_CACHE_TTL", "soon")]).unwrap_err();
        assert!(err.to_string().contains("MODULIO_CACHE_TTL"));

        let huge = u64::MAX.to_string();
        let err = load(&[("MODULIO_CACHE_TTL", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let err = load(&[("MODULIO_LOG_EVENTS", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("MODULIO_LOG_EVENTS"));

        let err = load(&[("MODULIO_ORDER_CONFLICT_RESOLUTION", "random")]).unwrap_err();
        assert!(format!("{err:#}").contains("random"));
    }

    #[test]
    fn allow_and_deny_lists() {
        let mut config = ModulioConfig::default();
        assert!(config.is_module_allowed("blog"));

        config.forbidden_modules = vec!["blog".to_string()];
        assert!(!config.is_module_allowed("blog"));

        config.forbidden_modules.clear();
        config.allowed_modules = vec!["shop".to_string()];
        assert!(!config.is_module_allowed("blog"));
        assert!(config.is_module_allowed("shop"));
    }
}
