// Pages
//
// A page is the versioned root unit of UI state. It owns the component tree,
// the version history and a listener side table. Every mutation goes through
// the page so that it can be recorded as a change of the open version.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use pagekeep_error::{TreeError, TreeResult};

use crate::change::Change;
use crate::component::{Component, ComponentId, ComponentTree};
use crate::config::PageSettings;
use crate::model::{Model, ModelValue};
use crate::version::VersionManager;
use crate::visit::{self, AllVisitFilter, Traversable};

/// Session-scoped numeric page id
pub type PageId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    page_id: PageId,
    page_type: String,
    tree: ComponentTree,
    versions: VersionManager,
    versioned: bool,
    /// Off until the request that built the page ends, so construction is version 0
    #[serde(default)]
    track_changes: bool,
    dirty: bool,
    /// Side table of listener registrations. Never traversed.
    listeners: BTreeMap<ComponentId, Vec<ComponentId>>,
    #[serde(skip)]
    session_id: Option<String>,
    #[serde(skip)]
    detach_count: u32,
    #[serde(skip)]
    last_request: Option<u64>,
}

impl Page {
    /// Create a page with default settings
    pub fn new(page_id: PageId, page_type: impl Into<String>) -> Self {
        Self::with_settings(page_id, page_type, &PageSettings::default())
    }

    /// Create a page using the versioning settings given
    pub fn with_settings(page_id: PageId, page_type: impl Into<String>, settings: &PageSettings) -> Self {
        Self {
            page_id,
            page_type: page_type.into(),
            tree: ComponentTree::new(page_id.to_string()),
            versions: VersionManager::new(settings.max_versions),
            versioned: settings.versioned_by_default,
            track_changes: false,
            // pages are born dirty so they get stored right away
            dirty: true,
            listeners: BTreeMap::new(),
            session_id: None,
            detach_count: 0,
            last_request: None,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Assign the session-scoped id. Only meant for the page manager.
    pub fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    /// Type tag of the page, stored next to serialized data
    pub fn page_type(&self) -> &str {
        &self.page_type
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn root(&self) -> ComponentId {
        self.tree.root()
    }

    pub fn component(&self, component: ComponentId) -> Option<&Component> {
        self.tree.get(component)
    }

    /// Resolve a `:`-separated component path
    pub fn get(&self, path: &str) -> Option<ComponentId> {
        self.tree.resolve(path)
    }

    pub fn path(&self, component: ComponentId) -> Option<String> {
        self.tree.path(component)
    }

    // ---------------------------------------------------------------------
    // Versioning
    // ---------------------------------------------------------------------

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    /// Turn change recording on or off for this page
    pub fn set_versioned(&mut self, versioned: bool) {
        self.versioned = versioned;
    }

    /// Whether mutations open versions yet
    pub fn is_tracking_changes(&self) -> bool {
        self.track_changes
    }

    /// Record later mutations as versions. Called when the building request ends.
    pub fn track_changes(&mut self) {
        self.track_changes = true;
    }

    pub fn current_version(&self) -> u32 {
        self.versions.current_version()
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    pub fn set_max_versions(&mut self, max_versions: usize) {
        self.versions.set_max_versions(max_versions);
    }

    /// Open a version explicitly. Mutations open one implicitly when needed.
    pub fn begin_version(&mut self) -> TreeResult<u32> {
        self.versions.begin_version()
    }

    /// Close the open version, if any. Returns the version now current.
    pub fn end_version(&mut self) -> TreeResult<u32> {
        if self.versions.is_recording() {
            self.versions.end_version()
        } else {
            Ok(self.versions.current_version())
        }
    }

    /// Rewind this page to `version`.
    ///
    /// Returns `None` when the version is no longer retained; the page is
    /// then left exactly as it was.
    pub fn get_version(&mut self, version: u32) -> Option<&mut Page> {
        if self.versions.rewind(&mut self.tree, version) {
            Some(self)
        } else {
            None
        }
    }

    /// Mark the page as modified in this request and open a version if it records changes
    pub fn dirty(&mut self) {
        self.dirty = true;
        if self.versioned && self.track_changes && !self.versions.is_recording() {
            if let Ok(version) = self.versions.begin_version() {
                trace!(page_id = self.page_id, version, "opened page version");
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Note the request that is working on this page
    pub fn touch(&mut self, request_id: u64) {
        self.last_request = Some(request_id);
    }

    /// Request that last touched this page, unknown after decoding
    pub fn last_request(&self) -> Option<u64> {
        self.last_request
    }

    /// Forget the dirty mark once the page has been handed to the store
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn record(&mut self, change: Change) {
        self.dirty();
        self.versions.record(change);
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Add an empty child under `parent`
    pub fn add(&mut self, parent: ComponentId, id: &str) -> TreeResult<ComponentId> {
        self.add_with_model(parent, id, None)
    }

    /// Add a child bound to `model`
    pub fn add_with_model(&mut self, parent: ComponentId, id: &str, model: Option<Model>) -> TreeResult<ComponentId> {
        let child = self.tree.insert_child(parent, id, model)?;
        self.component_added(parent, child);
        Ok(child)
    }

    fn component_added(&mut self, parent: ComponentId, child: ComponentId) {
        self.record(Change::ComponentAdded { parent, child });
    }

    /// Remove `component` and everything below it
    pub fn remove(&mut self, component: ComponentId) -> TreeResult<()> {
        let (parent, index, subtree) = self.tree.detach_subtree(component)?;
        self.record(Change::ComponentRemoved { parent, index, subtree });
        Ok(())
    }

    /// Remove the child of `parent` with the given id
    pub fn remove_child(&mut self, parent: ComponentId, id: &str) -> TreeResult<()> {
        let child = self
            .tree
            .child_by_id(parent, id)
            .ok_or_else(|| TreeError::InvalidPath(id.to_string()))?;
        self.remove(child)
    }

    /// Record the current model of `component` before it is changed
    pub fn component_model_changing(&mut self, component: ComponentId) -> TreeResult<()> {
        let previous = self
            .tree
            .get(component)
            .ok_or(TreeError::ComponentNotFound(component.0))?
            .model()
            .map(Model::snapshot);
        self.record(Change::ModelChanged { component, previous });
        Ok(())
    }

    /// Replace the model bound to `component`
    pub fn set_model(&mut self, component: ComponentId, model: Option<Model>) -> TreeResult<()> {
        self.component_model_changing(component)?;
        self.tree.get_mut(component)?.replace_model(model);
        Ok(())
    }

    /// Change the object of the bound model, binding a new model if there is none
    pub fn set_model_object(&mut self, component: ComponentId, object: impl Into<ModelValue>) -> TreeResult<()> {
        let object = object.into();
        self.component_model_changing(component)?;
        let node = self.tree.get_mut(component)?;
        match node.model_mut() {
            Some(model) => model.set_object(object),
            None => {
                node.replace_model(Some(Model::new(object)));
            }
        }
        Ok(())
    }

    pub fn model_object(&self, component: ComponentId) -> Option<&ModelValue> {
        self.tree.get(component)?.model().map(Model::object)
    }

    /// Display form of a component's model, cached until detach
    pub fn render_model(&mut self, component: ComponentId) -> TreeResult<Option<String>> {
        let node = self.tree.get_mut(component)?;
        Ok(node.model_mut().map(|model| model.rendered().to_string()))
    }

    /// Record an arbitrary keyed state change of a component.
    /// `None` clears the entry.
    pub fn component_state_changing(&mut self, component: ComponentId, key: &str, value: Option<ModelValue>) -> TreeResult<()> {
        let previous = self.tree.get_mut(component)?.replace_state(key, value);
        self.record(Change::StateChanged { component, key: key.to_string(), previous });
        Ok(())
    }

    /// Set a keyed state entry
    pub fn set_state(&mut self, component: ComponentId, key: &str, value: impl Into<ModelValue>) -> TreeResult<()> {
        self.component_state_changing(component, key, Some(value.into()))
    }

    pub fn set_visible(&mut self, component: ComponentId, visible: bool) -> TreeResult<()> {
        let node = self.tree.get_mut(component)?;
        let previous = node.is_visible();
        if previous != visible {
            node.set_visible(visible);
            self.record(Change::VisibilityChanged { component, visible: previous });
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, component: ComponentId, enabled: bool) -> TreeResult<()> {
        let node = self.tree.get_mut(component)?;
        let previous = node.is_enabled();
        if previous != enabled {
            node.set_enabled(enabled);
            self.record(Change::EnabledChanged { component, enabled: previous });
        }
        Ok(())
    }

    /// Attach request-scoped data to a component. Not versioned, cleared on detach.
    pub fn set_transient(&mut self, component: ComponentId, key: &str, value: impl Into<ModelValue>) -> TreeResult<()> {
        self.tree.get_mut(component)?.set_transient(key, value.into());
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Register `target` as a listener of `source`
    pub fn add_listener(&mut self, source: ComponentId, target: ComponentId) -> TreeResult<()> {
        for component in [source, target] {
            if !self.tree.contains(component) {
                return Err(TreeError::ComponentNotFound(component.0));
            }
        }
        let targets = self.listeners.entry(source).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
        Ok(())
    }

    /// Listeners registered on `source` that are still attached.
    /// Registrations of a removed component come back if the removal is undone.
    pub fn listeners(&self, source: ComponentId) -> Vec<ComponentId> {
        if !self.tree.contains(source) {
            return Vec::new();
        }
        self.listeners
            .get(&source)
            .map(|targets| targets.iter().copied().filter(|t| self.tree.contains(*t)).collect())
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Request lifecycle
    // ---------------------------------------------------------------------

    /// Drop request-scoped data of every component, children before parents
    pub fn detach(&mut self) {
        let root = self.tree.root();
        visit::visit_post_order_mut::<_, (), _>(&mut self.tree, root, |tree, node, _visit| {
            if let Ok(component) = tree.get_mut(node) {
                component.detach();
            }
        });
        self.detach_count += 1;
        debug!(page_id = self.page_id, "page detached");
    }

    /// Number of detaches since this instance was built or decoded
    pub fn detach_count(&self) -> u32 {
        self.detach_count
    }

    /// Whether any component still holds request-scoped data
    pub fn is_attached(&self) -> bool {
        visit::visit(&self.tree, self.tree.root(), |node, visit| {
            if self.tree.get(node).map_or(false, Component::is_attached) {
                visit.stop_with(true);
            }
        })
        .unwrap_or(false)
    }

    /// Session the page is currently bound to. Not serialized.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Re-bind the page to a live session after it was decoded
    pub fn bind_session(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// One line per component: path, model, flags and state
    pub fn hierarchy_as_string(&self) -> String {
        let mut out = String::new();
        let filter = AllVisitFilter;
        let mut lines = Vec::new();
        visit::visit_children_filtered::<_, (), _, _>(&self.tree, self.tree.root(), &filter, |node, _visit| {
            lines.push(node);
        });
        for node in lines {
            let (Some(component), Some(path)) = (self.tree.get(node), self.tree.path(node)) else {
                continue;
            };
            let _ = write!(out, "{}", path);
            if let Some(model) = component.model() {
                let _ = write!(out, " model={}", model.object());
            }
            if !component.is_visible() {
                let _ = write!(out, " hidden");
            }
            if !component.is_enabled() {
                let _ = write!(out, " disabled");
            }
            for (key, value) in component.state_entries() {
                let _ = write!(out, " {}={}", key, value);
            }
            out.push('\n');
        }
        out
    }
}

impl Traversable for Page {
    type Node = ComponentId;

    fn children(&self, node: ComponentId) -> &[ComponentId] {
        self.tree.children(node)
    }

    fn parent(&self, node: ComponentId) -> Option<ComponentId> {
        self.tree.parent(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_page() -> (Page, ComponentId, ComponentId) {
        let mut page = Page::new(1, "FormPage");
        let root = page.root();
        let form = page.add(root, "form").unwrap();
        let name = page.add_with_model(form, "name", Some(Model::new("alice"))).unwrap();
        page.end_version().unwrap();
        page.track_changes();
        (page, form, name)
    }

    #[test]
    fn test_construction_is_version_zero() {
        let (mut page, form, name) = form_page();
        assert_eq!(page.current_version(), 0);
        assert_eq!(page.versions().retained(), 0);
        assert!(page.is_dirty());

        page.set_model_object(name, "bob").unwrap();
        page.end_version().unwrap();
        assert_eq!(page.current_version(), 1);

        let constructed = page.get_version(0).unwrap();
        assert_eq!(constructed.get("form:name"), Some(name));
        assert_eq!(constructed.get("form"), Some(form));
        assert_eq!(constructed.model_object(name), Some(&ModelValue::from("alice")));
    }

    #[test]
    fn test_unversioned_page_does_not_grow_history() {
        let mut page = Page::new(3, "Guestbook");
        page.set_versioned(false);
        page.track_changes();
        let root = page.root();
        for i in 0..5 {
            page.add(root, &format!("entry{}", i)).unwrap();
            page.end_version().unwrap();
        }
        assert_eq!(page.current_version(), 0);
        assert_eq!(page.versions().retained(), 0);
        assert!(page.get_version(0).is_some());
    }

    #[test]
    fn test_model_undo_restores_value() {
        let (mut page, _, name) = form_page();
        page.set_model_object(name, "bob").unwrap();
        page.end_version().unwrap();
        assert_eq!(page.model_object(name), Some(&ModelValue::from("bob")));

        let rewound = page.get_version(0).unwrap();
        assert_eq!(rewound.model_object(name), Some(&ModelValue::from("alice")));
        assert_eq!(rewound.current_version(), 0);
    }

    #[test]
    fn test_remove_then_undo_restores_subtree() {
        let (mut page, form, name) = form_page();
        let before = page.hierarchy_as_string();
        page.set_model_object(name, "carol").unwrap();
        page.remove(form).unwrap();
        page.end_version().unwrap();
        assert_eq!(page.get("form:name"), None);

        page.get_version(0).unwrap();
        assert_eq!(page.hierarchy_as_string(), before);
        assert_eq!(page.get("form:name"), Some(name));
    }

    #[test]
    fn test_visibility_and_state_are_versioned() {
        let (mut page, form, _) = form_page();
        page.set_visible(form, false).unwrap();
        page.set_state(form, "step", 2).unwrap();
        page.end_version().unwrap();
        assert!(page.hierarchy_as_string().contains("form hidden step=2"));

        page.get_version(0).unwrap();
        assert_eq!(page.hierarchy_as_string().lines().next(), Some("form"));
    }

    #[test]
    fn test_detach_clears_transient_state() {
        let (mut page, form, name) = form_page();
        page.set_transient(form, "row-count", 3).unwrap();
        assert_eq!(page.render_model(name).unwrap().as_deref(), Some("\"alice\""));
        assert!(page.is_attached());

        page.detach();
        assert!(!page.is_attached());
        assert_eq!(page.detach_count(), 1);
        assert!(page.component(form).unwrap().transient("row-count").is_none());
    }

    #[test]
    fn test_listener_side_table_is_not_traversed() {
        let (mut page, form, name) = form_page();
        // listener edge back up the tree would be a cycle if traversal followed it
        page.add_listener(name, form).unwrap();
        page.add_listener(name, page.root()).unwrap();
        let mut count = 0;
        visit::visit_children::<_, (), _>(&page, page.root(), |_node, _visit| count += 1);
        assert_eq!(count, 2);
        assert_eq!(page.listeners(name), vec![form, page.root()]);

        page.remove(name).unwrap();
        assert!(page.listeners(name).is_empty());
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let (mut page, _, _) = form_page();
        let err = page.set_model_object(ComponentId(99), 1).unwrap_err();
        assert_eq!(err, TreeError::ComponentNotFound(99));
    }
}
