// Pagekeep Core Library
//
// Component trees with versioned pages: traversal, change recording and
// undo, and the version window kept for every page.

// Traversal
// Pre-order and post-order walks with filters and early stop
pub mod visit;

// Component tree
// Arena of components, models and path lookup
pub mod model;
pub mod component;

// Versioning
// Change records, change lists and the per-page version manager
pub mod change;
pub mod version;

// Pages
pub mod page;

// Settings and tracing
pub mod config;
pub mod tracing;

pub use change::{Change, ChangeList};
pub use component::{Component, ComponentId, ComponentTree, Subtree, PATH_SEPARATOR};
pub use config::PageSettings;
pub use model::{Model, ModelValue};
pub use page::{Page, PageId};
pub use version::{VersionManager, DEFAULT_MAX_VERSIONS};
pub use visit::{
    visit, visit_children, visit_children_filtered, visit_children_mut, visit_parents,
    visit_post_order, visit_post_order_mut, AllVisitFilter, ChildrenFilter, ObjectFilter,
    PreOrderCursor, Traversable, Visit, VisitFilter,
};
