// In-memory durable store
//
// Keeps the latest serialized form of every page, partitioned by session.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use pagekeep_core::PageId;
use pagekeep_error::{StoreError, StoreResult};

use crate::page::{PageContext, SerializedPage, StoredPage};
use crate::store::PageStore;

/// Thread-safe durable store holding serialized pages in memory
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    sessions: RwLock<HashMap<String, BTreeMap<PageId, SerializedPage>>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the pages held for a session, ascending
    pub fn page_ids(&self, context: &PageContext) -> Vec<PageId> {
        self.sessions
            .read()
            .get(context.session_id())
            .map(|pages| pages.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of sessions with at least one page
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl PageStore for MemoryPageStore {
    fn can_be_asynchronous(&self, _context: &PageContext) -> bool {
        true
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        let page = match page {
            StoredPage::Serialized(page) => page,
            StoredPage::Live(handle) => {
                return Err(StoreError::LivePageRejected { page_id: handle.page_id() })
            }
        };
        debug!(session_id = context.session_id(), page_id = page.page_id, version = page.version, "storing page in memory");
        self.sessions
            .write()
            .entry(context.session_id().to_string())
            .or_default()
            .insert(page.page_id, page);
        Ok(())
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        Ok(self
            .sessions
            .read()
            .get(context.session_id())
            .and_then(|pages| pages.get(&page_id))
            .cloned()
            .map(StoredPage::Serialized))
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        let mut sessions = self.sessions.write();
        if let Some(pages) = sessions.get_mut(context.session_id()) {
            pages.remove(&page_id);
            if pages.is_empty() {
                sessions.remove(context.session_id());
            }
        }
        Ok(())
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        self.sessions.write().remove(context.session_id());
        Ok(())
    }

    fn destroy(&self) {
        self.sessions.write().clear();
    }
}
