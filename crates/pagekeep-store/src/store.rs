// Page store contract
//
// Every layer of the pipeline implements the same contract and usually
// decorates the next one. Reads that find nothing return `Ok(None)`.

use pagekeep_core::PageId;
use pagekeep_error::StoreResult;

use crate::page::{PageContext, StoredPage};

/// A layer of the page store pipeline
pub trait PageStore: Send + Sync {
    /// Whether writes for this context may be deferred to a background writer
    fn can_be_asynchronous(&self, context: &PageContext) -> bool;

    /// Store a page of the session
    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()>;

    /// Latest stored form of a page, `None` if the store does not hold it
    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>>;

    /// Forget one page of the session
    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()>;

    /// Forget every page of the session. Complete when the call returns.
    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()>;

    /// Release resources held by the store
    fn destroy(&self);
}
