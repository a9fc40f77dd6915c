//! A titled group of navigation items.

use serde::{Deserialize, Serialize};

use super::item::{DEFAULT_ORDER, NavigationItem};

fn default_order() -> i32 {
    DEFAULT_ORDER
}

/// A collapsible group of items shown under a shared heading.
///
/// Groups hold items only; they do not nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationGroup {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_order")]
    pub order: i32,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub items: Vec<NavigationItem>,
}

impl NavigationGroup {
    /// Create an empty group.
    pub fn make(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: None,
            order: DEFAULT_ORDER,
            collapsed: false,
            items: Vec::new(),
        }
    }

    /// Create a group whose items come from a deferred builder.
    pub fn with_items<F>(title: impl Into<String>, build: F) -> Self
    where
        F: FnOnce() -> Vec<NavigationItem>,
    {
        let mut group = Self::make(title);
        group.items = build();
        group
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Append an item.
    pub fn item(mut self, item: NavigationItem) -> Self {
        self.items.push(item);
        self
    }

    /// Append an item in place.
    pub fn add_item(&mut self, item: NavigationItem) {
        self.items.push(item);
    }

    /// True if at least one item is visible to the user.
    pub fn has_authorized_items<S: AsRef<str>>(&self, user_permissions: &[S]) -> bool {
        self.items.iter().any(|i| i.is_authorized(user_permissions))
    }

    /// Items visible to the user, in declaration order.
    pub fn authorized_items<'a, S: AsRef<str>>(
        &'a self,
        user_permissions: &'a [S],
    ) -> impl Iterator<Item = &'a NavigationItem> + 'a {
        self.items
            .iter()
            .filter(move |i| i.is_authorized(user_permissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_group() -> NavigationGroup {
        NavigationGroup::make("Content")
            .icon("folder")
            .order(20)
            .item(NavigationItem::make("Pages"))
            .item(NavigationItem::make("Posts").permission("blog.view"))
    }

    #[test]
    fn builder_sets_fields() {
        let group = content_group().collapsed(true);
        assert_eq!(group.order, 20);
        assert!(group.collapsed);
        assert_eq!(group.items.len(), 2);
    }

    #[test]
    fn authorized_views_do_not_mutate() {
        let group = content_group();
        let visible: Vec<_> = group
            .authorized_items(&["users.view"])
            .map(|i| i.title.as_str())
            .collect();

        assert_eq!(visible, vec!["Pages"]);
        assert_eq!(group.items.len(), 2);
    }

    #[test]
    fn restricted_only_group() {
        let group = NavigationGroup::make("Blog")
            .item(NavigationItem::make("Posts").permission("blog.view"));
        let none: [&str; 0] = [];

        assert!(!group.has_authorized_items(&none));
        assert!(group.has_authorized_items(&["blog.view"]));
    }

    #[test]
    fn deferred_items() {
        let group = NavigationGroup::with_items("Reports", || {
            vec![NavigationItem::make("Daily"), NavigationItem::make("Weekly")]
        });
        assert_eq!(group.items.len(), 2);
        assert_eq!(group.order, DEFAULT_ORDER);
    }
}
