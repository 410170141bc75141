// Page version manager
//
// Every request that mutates a versioned page opens a version, records one
// change list while it runs and closes the version at the end. The change
// list closed at version V is stored under V - 1: it is the diff that takes
// the page from V back to V - 1. Older versions are reached by replaying the
// stored lists backwards.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use pagekeep_error::{TreeError, TreeResult};

use crate::change::{Change, ChangeList};
use crate::component::ComponentTree;

/// Default number of change lists retained per page
pub const DEFAULT_MAX_VERSIONS: usize = 20;

/// Recording state and retained history of one page.
///
/// Not synchronized: a page is only ever mutated by the request holding its lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManager {
    current_version: u32,
    max_versions: usize,
    recording: Option<ChangeList>,
    /// Insertion ordered; keys strictly increase, so the front is the oldest
    change_lists: VecDeque<(u32, ChangeList)>,
}

impl VersionManager {
    /// Create a manager for a freshly constructed page at version 0
    pub fn new(max_versions: usize) -> Self {
        Self {
            current_version: 0,
            max_versions,
            recording: None,
            change_lists: VecDeque::new(),
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    /// Change the retention bound, evicting the oldest lists if needed
    pub fn set_max_versions(&mut self, max_versions: usize) {
        self.max_versions = max_versions;
        self.evict();
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Number of change lists currently retained
    pub fn retained(&self) -> usize {
        self.change_lists.len()
    }

    /// Oldest version still reachable by undo
    pub fn oldest_available_version(&self) -> u32 {
        self.change_lists
            .front()
            .map(|(version, _)| *version)
            .unwrap_or(self.current_version)
    }

    /// Open a new version: bump the version number and start recording
    pub fn begin_version(&mut self) -> TreeResult<u32> {
        if self.recording.is_some() {
            return Err(TreeError::RecordingState(format!(
                "version {} is already being recorded",
                self.current_version
            )));
        }
        self.current_version += 1;
        self.recording = Some(ChangeList::new());
        Ok(self.current_version)
    }

    /// Seal the recording list and store it under the version it leads back to
    pub fn end_version(&mut self) -> TreeResult<u32> {
        let list = self.recording.take().ok_or_else(|| {
            TreeError::RecordingState("no version is being recorded".to_string())
        })?;
        let key = self.current_version - 1;
        debug!(version = self.current_version, changes = list.len(), "closing page version");
        self.change_lists.push_back((key, list));
        self.evict();
        Ok(self.current_version)
    }

    fn evict(&mut self) {
        while self.change_lists.len() > self.max_versions {
            if let Some((version, _)) = self.change_lists.pop_front() {
                debug!(version, "evicting page version");
            }
        }
    }

    /// Append a change to the open version. Without an open version this is a no-op.
    pub fn record(&mut self, change: Change) {
        if let Some(list) = self.recording.as_mut() {
            list.push(change);
        }
    }

    /// Whether `version` can be reconstructed from the retained lists
    pub fn is_available(&self, version: u32) -> bool {
        if self.recording.is_some() || version > self.current_version {
            return false;
        }
        version == self.current_version || version >= self.oldest_available_version()
    }

    /// Undo retained change lists until `tree` is at `version`.
    ///
    /// Returns false, leaving the tree untouched, when the version is not
    /// reachable. A version is never partially rewound.
    pub fn rewind(&mut self, tree: &mut ComponentTree, version: u32) -> bool {
        if !self.is_available(version) {
            debug!(version, current = self.current_version, "page version not available");
            return false;
        }
        while self.current_version > version {
            let expected = self.current_version - 1;
            match self.change_lists.pop_back() {
                Some((key, list)) if key == expected => {
                    list.undo(tree);
                    self.current_version = expected;
                }
                _ => return false,
            }
        }
        true
    }
}

impl Default for VersionManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VERSIONS)
    }
}
