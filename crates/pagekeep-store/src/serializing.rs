// Serializing store
//
// Turns live pages into bytes on the way down and decodes them on the way
// back up, re-binding the decoded page to the session it was read for.

use std::sync::Arc;

use tracing::{debug, trace};

use pagekeep_core::PageId;
use pagekeep_error::StoreResult;

use crate::page::{PageContext, PageHandle, SerializedPage, StoredPage};
use crate::serializer::PageSerializer;
use crate::store::PageStore;

pub struct SerializingPageStore {
    delegate: Arc<dyn PageStore>,
    serializer: Arc<dyn PageSerializer>,
}

impl SerializingPageStore {
    pub fn new(delegate: Arc<dyn PageStore>, serializer: Arc<dyn PageSerializer>) -> Self {
        Self { delegate, serializer }
    }

    fn serialize(&self, handle: &PageHandle) -> StoreResult<SerializedPage> {
        let page = handle.lock();
        let data = self.serializer.serialize(&page)?;
        trace!(page_id = page.page_id(), bytes = data.len(), "serialized page");
        Ok(SerializedPage::new(page.page_id(), page.current_version(), page.page_type(), data))
    }
}

impl PageStore for SerializingPageStore {
    fn can_be_asynchronous(&self, context: &PageContext) -> bool {
        self.delegate.can_be_asynchronous(context)
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        let page = match page {
            StoredPage::Live(handle) => StoredPage::Serialized(self.serialize(&handle)?),
            serialized => serialized,
        };
        self.delegate.add_page(context, page)
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        match self.delegate.get_page(context, page_id)? {
            Some(StoredPage::Serialized(serialized)) => {
                let mut page = self.serializer.deserialize(&serialized.data)?;
                page.bind_session(context.session_id());
                debug!(
                    session_id = context.session_id(),
                    page_id,
                    version = page.current_version(),
                    "deserialized page"
                );
                Ok(Some(StoredPage::Live(PageHandle::new(page))))
            }
            other => Ok(other),
        }
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        self.delegate.remove_page(context, page_id)
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        self.delegate.remove_all_pages(context)
    }

    fn destroy(&self) {
        self.delegate.destroy();
    }
}
