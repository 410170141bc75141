// Page manager
//
// Per-request coordinator between request handling code and the store
// pipeline. A request resolves pages through its `RequestScope`, which locks
// every page it touches. When the request ends, each touched page closes
// its open version, is detached and, if it changed, handed to the pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use pagekeep_core::{Page, PageId};
use pagekeep_error::{log_error, result_to_option, ManagerError, ManagerResult, StoreResult};
use pagekeep_store::{
    BincodeSerializer, PageContext, PageHandle, PageSerializer, PageStore, PageStorePipeline,
    PipelineBuilder, StoredPage,
};

use crate::config::ManagerSettings;
use crate::locks::PageAccessLocks;
use crate::session::{Session, SessionInvalidationListener};

struct Inner {
    settings: ManagerSettings,
    store: Arc<dyn PageStore>,
    pipeline: Option<Arc<PageStorePipeline>>,
    serializer: Arc<dyn PageSerializer>,
    locks: PageAccessLocks,
    next_request: AtomicU64,
    next_page_ids: Mutex<HashMap<String, PageId>>,
}

/// Entry point of the page lifecycle. Cheap to clone.
#[derive(Clone)]
pub struct PageManager {
    inner: Arc<Inner>,
}

impl PageManager {
    /// Create a manager over the store pipeline described by the settings
    pub fn new(settings: ManagerSettings) -> StoreResult<Self> {
        let pipeline = Arc::new(PipelineBuilder::new(settings.store.clone()).build()?);
        Ok(Self::build(settings, pipeline.clone(), Some(pipeline)))
    }

    /// Create a manager over an already assembled store
    pub fn with_store(settings: ManagerSettings, store: Arc<dyn PageStore>) -> Self {
        Self::build(settings, store, None)
    }

    fn build(settings: ManagerSettings, store: Arc<dyn PageStore>, pipeline: Option<Arc<PageStorePipeline>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                store,
                pipeline,
                serializer: Arc::new(BincodeSerializer),
                locks: PageAccessLocks::new(),
                next_request: AtomicU64::new(1),
                next_page_ids: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.inner.settings
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.inner.store
    }

    pub fn locks(&self) -> &PageAccessLocks {
        &self.inner.locks
    }

    /// Create a session whose destruction removes its pages from the stores
    pub fn new_session(&self, session_id: impl Into<String>) -> Arc<Session> {
        Arc::new(Session::new(session_id, Some(Arc::new(self.clone()))))
    }

    /// Start processing a request for `session`
    pub fn new_request(&self, session: Arc<Session>) -> ManagerResult<RequestScope> {
        if session.is_destroyed() {
            return Err(ManagerError::SessionDestroyed(session.id()));
        }
        let request_id = self.inner.next_request.fetch_add(1, Ordering::SeqCst);
        debug!(session_id = %session.id(), request_id, "request started");
        Ok(RequestScope {
            manager: self.clone(),
            session,
            request_id,
            touched: Vec::new(),
            ended: false,
        })
    }

    /// Block until queued writes reached the durable store
    pub fn flush(&self) {
        if let Some(pipeline) = &self.inner.pipeline {
            pipeline.flush();
        }
    }

    /// Remove every page of a session from every store layer
    pub fn remove_all_pages(&self, session_id: &str) -> ManagerResult<()> {
        self.inner.next_page_ids.lock().remove(session_id);
        self.inner.store.remove_all_pages(&PageContext::new(session_id))?;
        Ok(())
    }

    /// Flush and release every store
    pub fn destroy(&self) {
        self.flush();
        self.inner.store.destroy();
    }

    fn next_page_id(&self, session_id: &str) -> PageId {
        let mut ids = self.inner.next_page_ids.lock();
        let next = ids.entry(session_id.to_string()).or_insert(0);
        let id = *next;
        *next += 1;
        id
    }

    /// Keep page ids of a session ahead of any id already in use
    fn reserve_page_id(&self, session_id: &str, page_id: PageId) {
        let mut ids = self.inner.next_page_ids.lock();
        let next = ids.entry(session_id.to_string()).or_insert(0);
        *next = (*next).max(page_id + 1);
    }

    fn resolve(&self, context: &PageContext, page_id: PageId) -> ManagerResult<Option<PageHandle>> {
        match self.inner.store.get_page(context, page_id)? {
            Some(StoredPage::Live(handle)) => Ok(Some(handle)),
            Some(StoredPage::Serialized(serialized)) => {
                let mut page = self
                    .inner
                    .serializer
                    .deserialize(&serialized.data)
                    .map_err(pagekeep_error::StoreError::from)?;
                page.bind_session(context.session_id());
                Ok(Some(PageHandle::new(page)))
            }
            None => Ok(None),
        }
    }
}

impl SessionInvalidationListener for PageManager {
    fn session_destroyed(&self, session_id: &str) {
        let removed = self.remove_all_pages(session_id);
        result_to_option!(removed, "could not remove pages of destroyed session");
    }
}

/// Pages touched by one request, with the page locks the request holds
pub struct RequestScope {
    manager: PageManager,
    session: Arc<Session>,
    request_id: u64,
    touched: Vec<(String, PageHandle)>,
    ended: bool,
}

impl RequestScope {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn live_session_id(&self) -> ManagerResult<String> {
        if self.session.is_destroyed() {
            return Err(ManagerError::SessionDestroyed(self.session.id()));
        }
        Ok(self.session.id())
    }

    fn touched_page(&self, session_id: &str, page_id: PageId) -> Option<PageHandle> {
        self.touched
            .iter()
            .find(|(session, handle)| session == session_id && handle.page_id() == page_id)
            .map(|(_, handle)| handle.clone())
    }

    /// Register a page with this request so it is stored when the request ends
    pub fn touch(&mut self, handle: &PageHandle) -> ManagerResult<()> {
        let session_id = self.live_session_id()?;
        self.manager.locks().lock_page(&session_id, handle.page_id(), self.request_id);
        if !self.touched.iter().any(|(_, known)| known.ptr_eq(handle)) {
            self.touched.retain(|(session, known)| !(session == &session_id && known.page_id() == handle.page_id()));
            handle.lock().touch(self.request_id);
            self.touched.push((session_id, handle.clone()));
        }
        Ok(())
    }

    /// Create a page with the manager's versioning settings and a fresh page id
    pub fn create_page(&mut self, page_type: &str) -> ManagerResult<PageHandle> {
        let page = Page::with_settings(0, page_type, &self.manager.settings().page);
        self.add_page(page)
    }

    /// Adopt a page built by application code, assigning the next page id of the session
    pub fn add_page(&mut self, mut page: Page) -> ManagerResult<PageHandle> {
        let session_id = self.live_session_id()?;
        let page_id = self.manager.next_page_id(&session_id);
        page.set_page_id(page_id);
        page.bind_session(session_id.as_str());
        let handle = PageHandle::new(page);
        self.touch(&handle)?;
        debug!(session_id = %session_id, page_id, request_id = self.request_id, "page added");
        Ok(handle)
    }

    /// Resolve a page of the session: the instance already touched by this
    /// request, the cached live instance, or one decoded by the pipeline.
    ///
    /// Waits while another request of the session works on the page.
    /// Returns `None` when no store holds the page.
    pub fn get_page(&mut self, page_id: PageId) -> ManagerResult<Option<PageHandle>> {
        let session_id = self.live_session_id()?;
        if let Some(handle) = self.touched_page(&session_id, page_id) {
            return Ok(Some(handle));
        }

        let locks = self.manager.locks();
        locks.lock_page(&session_id, page_id, self.request_id);
        let context = PageContext::new(session_id.as_str());
        let found = match self.manager.resolve(&context, page_id) {
            Ok(found) => found,
            Err(err) => {
                locks.unlock_page(&session_id, page_id, self.request_id);
                return Err(err);
            }
        };
        match found {
            Some(handle) => {
                self.manager.reserve_page_id(&session_id, page_id);
                self.touch(&handle)?;
                Ok(Some(handle))
            }
            None => {
                debug!(session_id = %session_id, page_id, "page not found");
                locks.unlock_page(&session_id, page_id, self.request_id);
                Ok(None)
            }
        }
    }

    /// Resolve a page as it was at `version`.
    ///
    /// The current instance is returned as is when it is at `version`;
    /// otherwise a copy is rewound and replaces the page for this request. A
    /// version that is no longer retained yields `ManagerError::PageExpired`.
    pub fn get_page_version(&mut self, page_id: PageId, version: u32) -> ManagerResult<PageHandle> {
        let expired = ManagerError::PageExpired { page_id, version: Some(version) };
        let handle = self.get_page(page_id)?.ok_or_else(|| expired.clone())?;

        let mut copy = {
            let page = handle.lock();
            if page.current_version() == version {
                drop(page);
                return Ok(handle);
            }
            page.clone()
        };
        if copy.get_version(version).is_none() {
            warn!(page_id, version, "page version expired");
            return Err(expired);
        }
        let rewound = PageHandle::new(copy);
        self.touch(&rewound)?;
        Ok(rewound)
    }

    /// Finish the request: store touched pages, release page locks and
    /// destroy the session if it was invalidated
    pub fn end_request(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let touched = std::mem::take(&mut self.touched);
        let store_pages = !self.session.is_invalidated() && !self.session.is_destroyed();
        // the session may have been re-bound during the request
        let context = self.session.context();
        for (_, handle) in touched {
            let stored = {
                let mut page = handle.lock();
                if let Err(err) = page.end_version() {
                    warn!(page_id = page.page_id(), error = %err, "could not close page version");
                }
                // edits of the building request belong to version 0
                page.track_changes();
                page.detach();
                let dirty = page.is_dirty();
                page.clear_dirty();
                dirty
            };
            if !store_pages || !stored {
                continue;
            }
            let stored = self.manager.store().add_page(&context, StoredPage::Live(handle.clone()));
            log_error!(stored, format!("could not store page {} of session {}", handle.page_id(), context));
        }

        self.manager.locks().unlock_all(self.request_id);
        debug!(request_id = self.request_id, "request ended");
        self.session.end_request();
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.finish();
    }
}
