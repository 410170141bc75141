// In-session store
//
// Fast path of the pipeline: keeps the most recently added live pages of
// every session so that a request can resume a page without decoding it.
// Writes go through to the delegate.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use pagekeep_core::PageId;
use pagekeep_error::StoreResult;

use crate::page::{PageContext, PageHandle, StoredPage};
use crate::store::PageStore;

/// Default number of live pages kept per session
pub const DEFAULT_MAX_PAGES: usize = 40;

/// Live pages of one session, oldest added first
#[derive(Debug, Default)]
struct SessionPages {
    pages: VecDeque<PageHandle>,
}

impl SessionPages {
    fn get(&self, page_id: PageId) -> Option<PageHandle> {
        self.pages.iter().find(|page| page.page_id() == page_id).cloned()
    }

    fn remove(&mut self, page_id: PageId) {
        self.pages.retain(|page| page.page_id() != page_id);
    }

    /// Append as newest, evicting the oldest pages beyond `max_pages`
    fn add(&mut self, page: PageHandle, max_pages: usize) -> Vec<PageId> {
        self.remove(page.page_id());
        self.pages.push_back(page);
        let mut evicted = Vec::new();
        while self.pages.len() > max_pages {
            if let Some(oldest) = self.pages.pop_front() {
                evicted.push(oldest.page_id());
            }
        }
        evicted
    }
}

pub struct InSessionPageStore {
    delegate: Arc<dyn PageStore>,
    max_pages: usize,
    sessions: Mutex<HashMap<String, SessionPages>>,
}

impl InSessionPageStore {
    pub fn new(delegate: Arc<dyn PageStore>, max_pages: usize) -> Self {
        Self { delegate, max_pages, sessions: Mutex::new(HashMap::new()) }
    }

    /// Ids of the cached pages of a session, oldest first
    pub fn cached_page_ids(&self, context: &PageContext) -> Vec<PageId> {
        self.sessions
            .lock()
            .get(context.session_id())
            .map(|session| session.pages.iter().map(PageHandle::page_id).collect())
            .unwrap_or_default()
    }

    fn cache(&self, context: &PageContext, handle: PageHandle) {
        let evicted = self
            .sessions
            .lock()
            .entry(context.session_id().to_string())
            .or_default()
            .add(handle, self.max_pages);
        for page_id in evicted {
            trace!(session_id = context.session_id(), page_id, "evicted page from session cache");
        }
    }
}

impl PageStore for InSessionPageStore {
    fn can_be_asynchronous(&self, _context: &PageContext) -> bool {
        // the session cache must be current when the request ends
        false
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        if let StoredPage::Live(handle) = &page {
            self.cache(context, handle.clone());
        }
        self.delegate.add_page(context, page)
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        let cached = self
            .sessions
            .lock()
            .get(context.session_id())
            .and_then(|session| session.get(page_id));
        if let Some(handle) = cached {
            trace!(session_id = context.session_id(), page_id, "session cache hit");
            return Ok(Some(StoredPage::Live(handle)));
        }

        let found = self.delegate.get_page(context, page_id)?;
        if let Some(StoredPage::Live(handle)) = &found {
            debug!(session_id = context.session_id(), page_id, "caching page read from delegate");
            self.cache(context, handle.clone());
        }
        Ok(found)
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        if let Some(session) = self.sessions.lock().get_mut(context.session_id()) {
            session.remove(page_id);
        }
        self.delegate.remove_page(context, page_id)
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        self.sessions.lock().remove(context.session_id());
        self.delegate.remove_all_pages(context)
    }

    fn destroy(&self) {
        self.sessions.lock().clear();
        self.delegate.destroy();
    }
}
