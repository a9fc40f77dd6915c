//! Navigation trees contributed by modules.
//!
//! Each module declares zero or more [`Navigation`]s, one per menu name.
//! The registry merges them across modules into ordered per-menu lists.

mod group;
mod item;
mod menu;

pub use group::NavigationGroup;
pub use item::{DEFAULT_ORDER, NavigationItem};
pub use menu::{Navigation, NavigationEntry};
