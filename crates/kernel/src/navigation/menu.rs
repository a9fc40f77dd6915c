//! Per-menu navigation contributed by a module.

use serde::{Deserialize, Serialize};

use super::group::NavigationGroup;
use super::item::NavigationItem;

/// Top-level entry of a navigation: a plain item or a group of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NavigationEntry {
    Item(NavigationItem),
    Group(NavigationGroup),
}

impl NavigationEntry {
    pub fn title(&self) -> &str {
        match self {
            Self::Item(item) => &item.title,
            Self::Group(group) => &group.title,
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            Self::Item(item) => item.order,
            Self::Group(group) => group.order,
        }
    }

    /// An item is active when it links to `current_route`; a group is
    /// active when any of its items is.
    pub fn is_active(&self, current_route: &str) -> bool {
        match self {
            Self::Item(item) => item.is_active(current_route),
            Self::Group(group) => group.items.iter().any(|i| i.is_active(current_route)),
        }
    }
}

impl From<NavigationItem> for NavigationEntry {
    fn from(item: NavigationItem) -> Self {
        Self::Item(item)
    }
}

impl From<NavigationGroup> for NavigationEntry {
    fn from(group: NavigationGroup) -> Self {
        Self::Group(group)
    }
}

/// Navigation for one named menu ("admin", "sidebar", ...).
///
/// A module may declare several of these, one per menu. Presentation order
/// is decided when the registry aggregates menus across modules; the order
/// kept here only breaks ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub menu_name: String,
    #[serde(default)]
    pub items: Vec<NavigationEntry>,
}

impl Navigation {
    /// Create a navigation from a list of entries.
    pub fn make<I, E>(menu_name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<NavigationEntry>,
    {
        Self {
            menu_name: menu_name.into(),
            items: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a navigation with no entries.
    pub fn empty(menu_name: impl Into<String>) -> Self {
        Self {
            menu_name: menu_name.into(),
            items: Vec::new(),
        }
    }

    /// Create a navigation whose entries come from a deferred builder.
    ///
    /// The builder runs once, here.
    pub fn deferred<F>(menu_name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce() -> Vec<NavigationEntry>,
    {
        Self {
            menu_name: menu_name.into(),
            items: build(),
        }
    }

    /// Append an item or group.
    pub fn add_item(mut self, entry: impl Into<NavigationEntry>) -> Self {
        self.items.push(entry.into());
        self
    }

    pub fn menu_name(&self) -> &str {
        &self.menu_name
    }

    pub fn items(&self) -> &[NavigationEntry] {
        &self.items
    }

    /// Top-level plain items only.
    pub fn plain_items(&self) -> impl Iterator<Item = &NavigationItem> {
        self.items.iter().filter_map(|e| match e {
            NavigationEntry::Item(item) => Some(item),
            NavigationEntry::Group(_) => None,
        })
    }

    /// Top-level groups only.
    pub fn groups(&self) -> impl Iterator<Item = &NavigationGroup> {
        self.items.iter().filter_map(|e| match e {
            NavigationEntry::Group(group) => Some(group),
            NavigationEntry::Item(_) => None,
        })
    }

    /// All items with groups expanded one level.
    ///
    /// The iterator borrows the navigation, so calling this again restarts
    /// from the first entry.
    pub fn flattened_items(&self) -> impl Iterator<Item = &NavigationItem> {
        self.items.iter().flat_map(|e| match e {
            NavigationEntry::Item(item) => std::slice::from_ref(item).iter(),
            NavigationEntry::Group(group) => group.items.iter(),
        })
    }

    /// Titles leading to the item for `current_route`, outermost first.
    ///
    /// Empty when no item links to the route.
    pub fn breadcrumbs(&self, current_route: &str) -> Vec<&str> {
        for entry in &self.items {
            match entry {
                NavigationEntry::Item(item) if item.is_active(current_route) => {
                    return vec![item.title.as_str()];
                }
                NavigationEntry::Group(group) => {
                    if let Some(item) = group.items.iter().find(|i| i.is_active(current_route)) {
                        return vec![group.title.as_str(), item.title.as_str()];
                    }
                }
                NavigationEntry::Item(_) => {}
            }
        }
        Vec::new()
    }

    /// Entries visible to the user: authorized items, and groups that have at
    /// least one authorized item.
    pub fn authorized_items<'a, S: AsRef<str>>(
        &'a self,
        user_permissions: &'a [S],
    ) -> impl Iterator<Item = &'a NavigationEntry> + 'a {
        self.items.iter().filter(move |e| match e {
            NavigationEntry::Item(item) => item.is_authorized(user_permissions),
            NavigationEntry::Group(group) => group.has_authorized_items(user_permissions),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn admin_nav() -> Navigation {
        Navigation::make(
            "admin",
            vec![
                NavigationEntry::from(NavigationItem::make("Dashboard").order(1)),
                NavigationGroup::make("Blog")
                    .item(NavigationItem::make("Posts").permission("blog.view"))
                    .item(NavigationItem::make("Tags").permission("blog.tags"))
                    .into(),
                NavigationItem::make("Settings").permission("settings.edit").into(),
            ],
        )
    }

    #[test]
    fn flattening_expands_groups_in_place() {
        let nav = admin_nav();
        let titles: Vec<_> = nav.flattened_items().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Dashboard", "Posts", "Tags", "Settings"]);
    }

    #[test]
    fn flattening_is_restartable() {
        let nav = admin_nav();
        let first = nav.flattened_items().count();
        let second = nav.flattened_items().count();
        assert_eq!(first, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn items_and_groups_split() {
        let nav = admin_nav();
        assert_eq!(nav.plain_items().count(), 2);
        assert_eq!(nav.groups().count(), 1);
    }

    #[test]
    fn authorized_entries() {
        let nav = admin_nav();
        let titles: Vec<_> = nav
            .authorized_items(&["blog.tags"])
            .map(NavigationEntry::title)
            .collect();
        assert_eq!(titles, vec!["Dashboard", "Blog"]);
    }

    #[test]
    fn breadcrumbs_follow_groups() {
        let nav = Navigation::make(
            "admin",
            vec![
                NavigationEntry::from(NavigationItem::make("Dashboard").route("dashboard")),
                NavigationGroup::make("Blog")
                    .item(NavigationItem::make("Posts").route("blog.posts"))
                    .into(),
            ],
        );

        assert_eq!(nav.breadcrumbs("dashboard"), vec!["Dashboard"]);
        assert_eq!(nav.breadcrumbs("blog.posts"), vec!["Blog", "Posts"]);
        assert!(nav.breadcrumbs("shop.index").is_empty());

        assert!(nav.items()[1].is_active("blog.posts"));
        assert!(!nav.items()[0].is_active("blog.posts"));
    }

    #[test]
    fn entries_are_tagged_when_serialized() {
        let nav = admin_nav();
        let value = serde_json::to_value(&nav).unwrap();
        assert_eq!(value["items"][0]["type"], "item");
        assert_eq!(value["items"][1]["type"], "group");

        let back: Navigation = serde_json::from_value(value).unwrap();
        assert_eq!(back, nav);
    }

    #[test]
    fn deferred_builder_runs_once() {
        let mut calls = 0;
        let nav = Navigation::deferred("sidebar", || {
            calls += 1;
            vec![NavigationItem::make("Help").into()]
        });
        assert_eq!(calls, 1);
        assert_eq!(nav.menu_name(), "sidebar");
        assert_eq!(nav.items().len(), 1);
    }
}
