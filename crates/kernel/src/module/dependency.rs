//! Module dependency resolution using topological sort.
//!
//! Ensures modules are registered in the correct order based on their
//! dependencies. Uses Kahn's algorithm for topological sorting with cycle
//! detection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};

use super::definition::Module;

/// Resolve registration order based on dependencies.
///
/// Returns module names sorted so that dependencies come before dependents.
/// Independent modules keep their alphabetical order so the result is
/// deterministic.
///
/// # Errors
/// Returns error if:
/// - A module declares a dependency that isn't in `modules`
/// - There is a circular dependency
pub fn resolve_load_order(modules: &BTreeMap<String, Module>) -> Result<Vec<String>> {
    // in_degree[m] = number of modules that m depends on (that must register first)
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for name in modules.keys() {
        in_degree.insert(name, 0);
        dependents.entry(name.as_str()).or_default();
    }

    for (name, module) in modules {
        for dep in module.dependencies.keys() {
            if !modules.contains_key(dep) {
                bail!("module '{name}' depends on '{dep}' which is not available");
            }

            if let Some(degree) = in_degree.get_mut(name.as_str()) {
                *degree += 1;
            }
            dependents.entry(dep.as_str()).or_default().push(name);
        }
    }

    let mut result = Vec::with_capacity(modules.len());
    // BTreeMap iteration keeps the initial queue alphabetical
    let mut queue: VecDeque<&str> = modules
        .keys()
        .map(String::as_str)
        .filter(|name| in_degree.get(name) == Some(&0))
        .collect();

    while let Some(module) = queue.pop_front() {
        result.push(module.to_string());

        if let Some(deps) = dependents.get(module) {
            for dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
    }

    if result.len() != modules.len() {
        let loaded: HashSet<_> = result.iter().map(String::as_str).collect();
        let in_cycle: Vec<_> = modules
            .keys()
            .filter(|k| !loaded.contains(k.as_str()))
            .cloned()
            .collect();

        bail!(
            "circular dependency detected involving modules: {}",
            in_cycle.join(", ")
        );
    }

    Ok(result)
}

/// Compare two dotted versions numerically ("1.10.0" > "1.9.3").
///
/// Leading `v` is ignored, missing components count as zero and anything
/// after a `-` or `+` (pre-release, build) is dropped.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let pa = version_parts(a);
    let pb = version_parts(b);
    let len = pa.len().max(pb.len());

    for i in 0..len {
        let x = pa.get(i).copied().unwrap_or(0);
        let y = pb.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn version_parts(version: &str) -> Vec<u64> {
    let core = version
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()
        .unwrap_or_default();

    core.split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// True if `installed` is at least `required`.
pub fn version_satisfies(installed: &str, required: &str) -> bool {
    compare_versions(installed, required) != Ordering::Less
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn make_module(name: &str, deps: Vec<&str>) -> Module {
        deps.into_iter()
            .fold(Module::new(name).version("1.0.0"), |m, dep| {
                m.depends_on(dep, "1.0.0")
            })
    }

    fn set(modules: Vec<Module>) -> BTreeMap<String, Module> {
        modules.into_iter().map(|m| (m.name.clone(), m)).collect()
    }

    #[test]
    fn no_dependencies_is_alphabetical() {
        let modules = set(vec![
            make_module("c", vec![]),
            make_module("a", vec![]),
            make_module("b", vec![]),
        ]);

        let order = resolve_load_order(&modules).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn simple_chain() {
        let modules = set(vec![
            make_module("a", vec!["b"]),
            make_module("b", vec!["c"]),
            make_module("c", vec![]),
        ]);

        let order = resolve_load_order(&modules).unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_dependency() {
        // a depends on b and c, both depend on d
        let modules = set(vec![
            make_module("d", vec![]),
            make_module("b", vec!["d"]),
            make_module("c", vec!["d"]),
            make_module("a", vec!["b", "c"]),
        ]);

        let order = resolve_load_order(&modules).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();

        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn missing_dependency() {
        let modules = set(vec![make_module("a", vec!["missing"])]);

        let result = resolve_load_order(&modules);
        assert!(result.unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn circular_dependency() {
        let modules = set(vec![
            make_module("a", vec!["b"]),
            make_module("b", vec!["a"]),
            make_module("c", vec![]),
        ]);

        let err = resolve_load_order(&modules).unwrap_err().to_string();
        assert!(err.contains("circular"));
        assert!(err.contains("a, b"));
        assert!(err.ends_with("a, b"));
    }

    #[test]
    fn version_comparison_is_numeric() {
        assert_eq!(compare_versions("1.10.0", "1.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("v2.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0"), Ordering::Equal);
        assert!(version_satisfies("1.2.0", "1.1.9"));
        assert!(!version_satisfies("0.9.0", "1.0.0"));
    }
}
