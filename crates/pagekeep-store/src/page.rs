// Page context and stored page forms
//
// Pages travel through the pipeline either live, shared with the request
// that works on them, or as serialized bytes tagged with enough metadata to
// address the durable copy without decoding it.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use pagekeep_core::{Page, PageId};

/// Session partition key for every store operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageContext {
    session_id: String,
}

impl PageContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into() }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl fmt::Display for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.session_id)
    }
}

/// Shared handle to a live page
#[derive(Clone)]
pub struct PageHandle {
    page_id: PageId,
    page: Arc<Mutex<Page>>,
}

impl PageHandle {
    pub fn new(page: Page) -> Self {
        Self { page_id: page.page_id(), page: Arc::new(Mutex::new(page)) }
    }

    /// Id the page had when the handle was created
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn lock(&self) -> MutexGuard<'_, Page> {
        self.page.lock()
    }

    /// Whether both handles point to the same page instance
    pub fn ptr_eq(&self, other: &PageHandle) -> bool {
        Arc::ptr_eq(&self.page, &other.page)
    }
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle").field("page_id", &self.page_id).finish()
    }
}

/// Serialized form of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPage {
    pub page_id: PageId,
    /// Version the page was at when it was serialized
    pub version: u32,
    /// Type tag of the page
    pub page_type: String,
    pub data: Vec<u8>,
}

impl SerializedPage {
    pub fn new(page_id: PageId, version: u32, page_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { page_id, version, page_type: page_type.into(), data }
    }
}

/// A page as handed between stores
#[derive(Debug, Clone)]
pub enum StoredPage {
    Live(PageHandle),
    Serialized(SerializedPage),
}

impl StoredPage {
    pub fn page_id(&self) -> PageId {
        match self {
            StoredPage::Live(handle) => handle.page_id(),
            StoredPage::Serialized(page) => page.page_id,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, StoredPage::Live(_))
    }

    pub fn as_live(&self) -> Option<&PageHandle> {
        match self {
            StoredPage::Live(handle) => Some(handle),
            StoredPage::Serialized(_) => None,
        }
    }

    pub fn as_serialized(&self) -> Option<&SerializedPage> {
        match self {
            StoredPage::Live(_) => None,
            StoredPage::Serialized(page) => Some(page),
        }
    }
}

impl From<Page> for StoredPage {
    fn from(page: Page) -> Self {
        StoredPage::Live(PageHandle::new(page))
    }
}

impl From<PageHandle> for StoredPage {
    fn from(handle: PageHandle) -> Self {
        StoredPage::Live(handle)
    }
}

impl From<SerializedPage> for StoredPage {
    fn from(page: SerializedPage) -> Self {
        StoredPage::Serialized(page)
    }
}
