//! A single navigation link.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collaborators::RouteResolver;

/// Default sort weight for items and groups that don't set one.
pub const DEFAULT_ORDER: i32 = 100;

fn default_order() -> i32 {
    DEFAULT_ORDER
}

/// One entry in a navigation menu.
///
/// Items are plain data: every builder method accepts its input as-is and
/// returns the item for chaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationItem {
    /// Human-readable label.
    pub title: String,
    /// Opaque icon token (e.g., "heroicon-o-home").
    #[serde(default)]
    pub icon: Option<String>,
    /// Named route the link points at.
    #[serde(default)]
    pub route: Option<String>,
    /// Explicit URL; takes precedence over `route`.
    #[serde(default)]
    pub url: Option<String>,
    /// Sort weight (lower = earlier).
    #[serde(default = "default_order")]
    pub order: i32,
    /// Any one of these grants visibility (empty = public).
    #[serde(default)]
    pub permissions: Vec<String>,
    /// CSS class tags.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Extra attributes passed through to the renderer.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Badge text.
    #[serde(default)]
    pub badge: Option<String>,
    /// Name of the group this item belongs to.
    #[serde(default)]
    pub group: Option<String>,
}

impl NavigationItem {
    /// Create an item with the given title and default settings.
    pub fn make(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: None,
            route: None,
            url: None,
            order: DEFAULT_ORDER,
            permissions: Vec::new(),
            classes: Vec::new(),
            attributes: HashMap::new(),
            badge: None,
            group: None,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Add one required permission.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Append required permissions (existing ones are kept).
    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merge attributes; later keys overwrite earlier ones.
    pub fn attributes<I, K>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Check whether a user holding `user_permissions` may see this item.
    ///
    /// Public items (no permissions) are always visible. Otherwise a single
    /// shared permission is enough.
    pub fn is_authorized<S: AsRef<str>>(&self, user_permissions: &[S]) -> bool {
        if self.permissions.is_empty() {
            return true;
        }

        user_permissions
            .iter()
            .any(|p| self.permissions.iter().any(|req| req == p.as_ref()))
    }

    /// Whether this item links to `current_route`.
    pub fn is_active(&self, current_route: &str) -> bool {
        self.route.as_deref() == Some(current_route)
    }

    /// Resolve the link target.
    ///
    /// An explicit URL wins; otherwise the route name is looked up through
    /// `resolver`. Returns `None` when neither yields a URL.
    pub fn resolve_url(&self, resolver: &dyn RouteResolver) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }

        self.route
            .as_deref()
            .and_then(|route| resolver.resolve(route))
    }
}
