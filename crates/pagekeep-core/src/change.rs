// Change records
//
// A change is the undo record of a single mutation of a page. Changes are
// grouped into one change list per version transition and undone newest
// first, so a structural undo always runs before any undo that relies on the
// structure it restores.

use serde::{Deserialize, Serialize};
use tracing::warn;

use pagekeep_error::TreeResult;

use crate::component::{ComponentId, ComponentTree, Subtree};
use crate::model::{Model, ModelValue};

/// Reversible record of one mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Change {
    /// A model was replaced or its object changed; holds the previous model
    ModelChanged {
        component: ComponentId,
        previous: Option<Model>,
    },
    /// A child was added; undo removes it again
    ComponentAdded {
        parent: ComponentId,
        child: ComponentId,
    },
    /// A child was removed; undo reinserts the subtree at its old position
    ComponentRemoved {
        parent: ComponentId,
        index: usize,
        subtree: Subtree,
    },
    /// A keyed state entry was set or cleared; holds the previous value
    StateChanged {
        component: ComponentId,
        key: String,
        previous: Option<ModelValue>,
    },
    /// Visibility was toggled; holds the previous flag
    VisibilityChanged { component: ComponentId, visible: bool },
    /// Enabled state was toggled; holds the previous flag
    EnabledChanged { component: ComponentId, enabled: bool },
}

impl Change {
    /// Reverse this change on `tree`
    pub fn undo(self, tree: &mut ComponentTree) -> TreeResult<()> {
        match self {
            Change::ModelChanged { component, previous } => {
                tree.get_mut(component)?.replace_model(previous);
            }
            Change::ComponentAdded { child, .. } => {
                tree.detach_subtree(child)?;
            }
            Change::ComponentRemoved { parent, index, subtree } => {
                tree.restore_subtree(parent, index, subtree)?;
            }
            Change::StateChanged { component, key, previous } => {
                tree.get_mut(component)?.replace_state(&key, previous);
            }
            Change::VisibilityChanged { component, visible } => {
                tree.get_mut(component)?.set_visible(visible);
            }
            Change::EnabledChanged { component, enabled } => {
                tree.get_mut(component)?.set_enabled(enabled);
            }
        }
        Ok(())
    }

    /// Component this change is about
    pub fn component(&self) -> ComponentId {
        match self {
            Change::ModelChanged { component, .. }
            | Change::StateChanged { component, .. }
            | Change::VisibilityChanged { component, .. }
            | Change::EnabledChanged { component, .. } => *component,
            Change::ComponentAdded { child, .. } => *child,
            Change::ComponentRemoved { subtree, .. } => subtree.root(),
        }
    }
}

/// Ordered changes recorded during one version transition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeList {
    changes: Vec<Change>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Undo every change, newest first.
    ///
    /// A change that can no longer be applied is logged and skipped; the
    /// remaining changes are still undone.
    pub fn undo(self, tree: &mut ComponentTree) {
        for change in self.changes.into_iter().rev() {
            let component = change.component();
            if let Err(err) = change.undo(tree) {
                warn!(component = %component, error = %err, "could not undo change");
            }
        }
    }
}
