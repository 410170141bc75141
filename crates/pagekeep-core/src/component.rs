// Component tree
//
// Components live in an arena owned by the page. Children are owned through
// the ordered `children` list of their parent; the `parent` field is only a
// back-link and is never followed by traversal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use pagekeep_error::{TreeError, TreeResult};

use crate::model::{Model, ModelValue};
use crate::visit::{self, Traversable};

/// Separator between component ids in a component path
pub const PATH_SEPARATOR: char = ':';

/// Page-unique handle of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A node of the component tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    id: String,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    model: Option<Model>,
    visible: bool,
    enabled: bool,
    state: BTreeMap<String, ModelValue>,
    #[serde(skip)]
    transient: BTreeMap<String, ModelValue>,
}

impl Component {
    fn new(id: impl Into<String>, parent: Option<ComponentId>) -> Self {
        Self {
            id: id.into(),
            parent,
            children: Vec::new(),
            model: None,
            visible: true,
            enabled: true,
            state: BTreeMap::new(),
            transient: BTreeMap::new(),
        }
    }

    /// Id of this component, unique among its siblings
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// Children in rendering order
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub(crate) fn model_mut(&mut self) -> Option<&mut Model> {
        self.model.as_mut()
    }

    pub(crate) fn replace_model(&mut self, model: Option<Model>) -> Option<Model> {
        std::mem::replace(&mut self.model, model)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Keyed component state that takes part in versioning
    pub fn state(&self, key: &str) -> Option<&ModelValue> {
        self.state.get(key)
    }

    pub fn state_entries(&self) -> &BTreeMap<String, ModelValue> {
        &self.state
    }

    pub(crate) fn replace_state(&mut self, key: &str, value: Option<ModelValue>) -> Option<ModelValue> {
        match value {
            Some(value) => self.state.insert(key.to_string(), value),
            None => self.state.remove(key),
        }
    }

    /// Request-scoped attribute, dropped on detach and never serialized
    pub fn transient(&self, key: &str) -> Option<&ModelValue> {
        self.transient.get(key)
    }

    pub(crate) fn set_transient(&mut self, key: &str, value: ModelValue) {
        self.transient.insert(key.to_string(), value);
    }

    /// Whether this component currently holds request-scoped data
    pub fn is_attached(&self) -> bool {
        !self.transient.is_empty() || self.model.as_ref().map_or(false, Model::is_attached)
    }

    /// Drop request-scoped data
    pub fn detach(&mut self) {
        self.transient.clear();
        if let Some(model) = self.model.as_mut() {
            model.detach();
        }
    }
}

/// Components cut out of a tree, kept with their original ids so they can be put back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtree {
    root: ComponentId,
    nodes: Vec<(ComponentId, Component)>,
}

impl Subtree {
    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every cut component, subtree root first
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.nodes.iter().map(|(id, _)| *id)
    }
}

/// Arena holding every component attached to a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTree {
    root: ComponentId,
    next_id: u64,
    components: BTreeMap<ComponentId, Component>,
}

impl ComponentTree {
    /// Create a tree holding only a root component
    pub fn new(root_id: impl Into<String>) -> Self {
        let root = ComponentId(0);
        let mut components = BTreeMap::new();
        components.insert(root, Component::new(root_id, None));
        Self { root, next_id: 1, components }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn get(&self, component: ComponentId) -> Option<&Component> {
        self.components.get(&component)
    }

    pub(crate) fn get_mut(&mut self, component: ComponentId) -> TreeResult<&mut Component> {
        self.components
            .get_mut(&component)
            .ok_or(TreeError::ComponentNotFound(component.0))
    }

    pub fn contains(&self, component: ComponentId) -> bool {
        self.components.contains_key(&component)
    }

    /// Number of attached components, root included
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Child of `parent` whose id is `id`
    pub fn child_by_id(&self, parent: ComponentId, id: &str) -> Option<ComponentId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.get(*child).map_or(false, |c| c.id == id))
    }

    /// Append a new child with the given sibling-unique id
    pub(crate) fn insert_child(&mut self, parent: ComponentId, id: &str, model: Option<Model>) -> TreeResult<ComponentId> {
        if !self.contains(parent) {
            return Err(TreeError::ComponentNotFound(parent.0));
        }
        if self.child_by_id(parent, id).is_some() {
            return Err(TreeError::DuplicateChild { parent: parent.0, id: id.to_string() });
        }

        let child = ComponentId(self.next_id);
        self.next_id += 1;

        let mut component = Component::new(id, Some(parent));
        component.model = model;
        self.components.insert(child, component);
        self.get_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Cut `component` and its descendants out of the tree.
    ///
    /// Returns the former parent and the position among its siblings.
    pub(crate) fn detach_subtree(&mut self, component: ComponentId) -> TreeResult<(ComponentId, usize, Subtree)> {
        if component == self.root {
            return Err(TreeError::RootNotRemovable);
        }
        let parent = self
            .get(component)
            .ok_or(TreeError::ComponentNotFound(component.0))?
            .parent
            .ok_or(TreeError::ComponentNotFound(component.0))?;

        let mut ids = Vec::new();
        visit::visit::<_, (), _>(&*self, component, |node, _visit| ids.push(node));

        let siblings = &mut self.get_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|sibling| *sibling == component)
            .ok_or(TreeError::ComponentNotFound(component.0))?;
        siblings.remove(index);

        let nodes = ids
            .into_iter()
            .filter_map(|id| self.components.remove(&id).map(|node| (id, node)))
            .collect();
        Ok((parent, index, Subtree { root: component, nodes }))
    }

    /// Put a previously detached subtree back at `index` under `parent`
    pub(crate) fn restore_subtree(&mut self, parent: ComponentId, index: usize, subtree: Subtree) -> TreeResult<()> {
        let root = subtree.root;
        {
            let siblings = &mut self.get_mut(parent)?.children;
            let index = index.min(siblings.len());
            siblings.insert(index, root);
        }
        for (id, mut node) in subtree.nodes {
            if id == root {
                node.parent = Some(parent);
            }
            self.next_id = self.next_id.max(id.0 + 1);
            self.components.insert(id, node);
        }
        Ok(())
    }

    /// Id path from the root, e.g. `form:name`. The root itself has the empty path.
    pub fn path(&self, component: ComponentId) -> Option<String> {
        let node = self.get(component)?;
        if component == self.root {
            return Some(String::new());
        }
        let mut segments = vec![node.id.as_str()];
        visit::visit_parents::<_, (), _>(self, component, |ancestor, _visit| {
            if ancestor != self.root {
                if let Some(parent) = self.get(ancestor) {
                    segments.push(parent.id.as_str());
                }
            }
        });
        segments.reverse();
        Some(segments.join(&PATH_SEPARATOR.to_string()))
    }

    /// Resolve a component path by walking children in order
    pub fn resolve(&self, path: &str) -> Option<ComponentId> {
        if path.is_empty() {
            return Some(self.root);
        }
        path.split(PATH_SEPARATOR)
            .try_fold(self.root, |current, segment| self.child_by_id(current, segment))
    }

    /// Every attached component id, in id order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.keys().copied()
    }
}

impl Traversable for ComponentTree {
    type Node = ComponentId;

    fn children(&self, node: ComponentId) -> &[ComponentId] {
        self.components.get(&node).map(|c| c.children.as_slice()).unwrap_or(&[])
    }

    fn parent(&self, node: ComponentId) -> Option<ComponentId> {
        self.components.get(&node).and_then(|c| c.parent)
    }
}
