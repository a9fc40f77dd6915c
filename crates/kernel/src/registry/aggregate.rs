//! Aggregation over registered modules.
//!
//! Pure functions over a [`ModuleSet`]; caching is the registry's concern.

use std::collections::HashSet;

use super::set::ModuleSet;
use crate::config::OrderConflictResolution;
use crate::module::Module;
use crate::navigation::NavigationItem;

/// Every item contributed to `menu`, ordered for display.
///
/// Items are gathered in registration order and stable-sorted by `order`.
/// Ties are broken by title under [`OrderConflictResolution::Alphabet`] and
/// left in registration order under [`OrderConflictResolution::Registration`].
pub fn collect_navigation(
    modules: &ModuleSet,
    menu: &str,
    policy: OrderConflictResolution,
) -> Vec<NavigationItem> {
    let mut items: Vec<NavigationItem> = modules
        .iter()
        .flat_map(|m| m.navigation_items(menu))
        .cloned()
        .collect();

    match policy {
        OrderConflictResolution::Alphabet => {
            items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        }
        OrderConflictResolution::Registration => items.sort_by_key(|i| i.order),
    }

    items
}

/// Union of all declared permissions, first occurrence wins.
pub fn collect_permissions(modules: &ModuleSet) -> Vec<String> {
    let mut seen = HashSet::new();
    modules
        .iter()
        .flat_map(|m| m.permissions.iter())
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect()
}

/// Route names of `candidate` that are already taken, either by a registered
/// module or earlier in `candidate` itself. Each name is listed once.
pub fn route_conflicts(modules: &ModuleSet, candidate: &Module) -> Vec<String> {
    let taken: HashSet<&str> = modules
        .iter()
        .filter(|m| m.name != candidate.name)
        .flat_map(|m| m.route_names())
        .collect();

    let mut own = HashSet::new();
    let mut conflicts: Vec<String> = Vec::new();
    for name in candidate.route_names() {
        let duplicate = taken.contains(name) || !own.insert(name);
        if duplicate && !conflicts.iter().any(|c| c == name) {
            conflicts.push(name.to_string());
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::navigation::Navigation;

    fn module_with_items(name: &str, menu: &str, items: &[(&str, i32)]) -> Arc<Module> {
        Arc::new(Module::new(name).nav(Navigation::make(
            menu,
            items
                .iter()
                .map(|(title, order)| NavigationItem::make(*title).order(*order)),
        )))
    }

    fn titles(items: &[NavigationItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn navigation_sorted_by_order_then_title() {
        let set: ModuleSet = [
            module_with_items("one", "main", &[("Zeta", 10)]),
            module_with_items("two", "main", &[("Alpha", 10), ("Beta", 5)]),
        ]
        .into_iter()
        .collect();

        let items = collect_navigation(&set, "main", OrderConflictResolution::Alphabet);
        assert_eq!(titles(&items), vec!["Beta", "Alpha", "Zeta"]);
    }

    #[test]
    fn registration_policy_keeps_ties_in_module_order() {
        let set: ModuleSet = [
            module_with_items("one", "main", &[("Zeta", 10)]),
            module_with_items("two", "main", &[("Alpha", 10), ("Beta", 5)]),
        ]
        .into_iter()
        .collect();

        let items = collect_navigation(&set, "main", OrderConflictResolution::Registration);
        assert_eq!(titles(&items), vec!["Beta", "Zeta", "Alpha"]);
    }

    #[test]
    fn other_menus_are_ignored() {
        let set: ModuleSet = [
            module_with_items("one", "admin", &[("Users", 1)]),
            module_with_items("two", "sidebar", &[("Recent", 1)]),
        ]
        .into_iter()
        .collect();

        let items = collect_navigation(&set, "admin", OrderConflictResolution::Alphabet);
        assert_eq!(titles(&items), vec!["Users"]);
        assert!(collect_navigation(&set, "footer", OrderConflictResolution::Alphabet).is_empty());
    }

    #[test]
    fn permissions_deduplicated_in_first_occurrence_order() {
        let set: ModuleSet = [
            Arc::new(Module::new("a").permissions(["p1", "p2"])),
            Arc::new(Module::new("b").permissions(["p2", "p3"])),
        ]
        .into_iter()
        .collect();

        assert_eq!(collect_permissions(&set), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn route_conflicts_cover_registered_and_internal_duplicates() {
        let set: ModuleSet = [Arc::new(
            Module::new("blog").route("blog.index", "/blog", "index", Vec::<String>::new()),
        )]
        .into_iter()
        .collect();

        let candidate = Module::new("shop")
            .route("blog.index", "/x", "a", Vec::<String>::new())
            .route("shop.index", "/shop", "b", Vec::<String>::new())
            .route("shop.index", "/shop2", "c", Vec::<String>::new())
            .route("shop.index", "/shop3", "d", Vec::<String>::new());

        assert_eq!(
            route_conflicts(&set, &candidate),
            vec!["blog.index", "shop.index"]
        );

        let clean = Module::new("news").route("news.index", "/news", "a", Vec::<String>::new());
        assert!(route_conflicts(&set, &clean).is_empty());
    }
}
