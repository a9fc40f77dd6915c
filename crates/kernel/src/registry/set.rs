//! Insertion-ordered module collection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::module::Module;

/// Modules keyed by name, iterated in registration order.
#[derive(Debug, Default, Clone)]
pub struct ModuleSet {
    order: Vec<String>,
    by_name: HashMap<String, Arc<Module>>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module. Returns false (and changes nothing) if the name is
    /// already present.
    pub fn insert(&mut self, module: Arc<Module>) -> bool {
        if self.by_name.contains_key(&module.name) {
            return false;
        }
        self.order.push(module.name.clone());
        self.by_name.insert(module.name.clone(), module);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Module>> {
        let module = self.by_name.remove(name)?;
        self.order.retain(|n| n != name);
        Some(module)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Module>> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }
}

impl FromIterator<Arc<Module>> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = Arc<Module>>>(iter: I) -> Self {
        let mut set = Self::new();
        for module in iter {
            set.insert(module);
        }
        set
    }
}
