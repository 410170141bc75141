// Store pipeline assembly
//
// Builds the chain in-session -> serializing -> (asynchronous) -> durable
// from store settings. The durable store defaults to the file store.

use std::sync::Arc;

use tracing::info;

use pagekeep_core::PageId;
use pagekeep_error::StoreResult;

use crate::asynchronous::AsynchronousPageStore;
use crate::config::StoreSettings;
use crate::file::FilePageStore;
use crate::in_session::InSessionPageStore;
use crate::page::{PageContext, StoredPage};
use crate::serializer::{BincodeSerializer, PageSerializer};
use crate::serializing::SerializingPageStore;
use crate::store::PageStore;

/// Builder for a [`PageStorePipeline`]
pub struct PipelineBuilder {
    settings: StoreSettings,
    serializer: Arc<dyn PageSerializer>,
    durable: Option<Arc<dyn PageStore>>,
}

impl PipelineBuilder {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings, serializer: Arc::new(BincodeSerializer), durable: None }
    }

    /// Use another serializer than bincode
    pub fn with_serializer(mut self, serializer: Arc<dyn PageSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Use `store` as the durable layer instead of the file store
    pub fn with_durable_store(mut self, store: Arc<dyn PageStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn build(self) -> StoreResult<PageStorePipeline> {
        let durable: Arc<dyn PageStore> = match self.durable {
            Some(store) => store,
            None => Arc::new(FilePageStore::new(&self.settings)?),
        };

        let asynchronous = if self.settings.asynchronous {
            Some(Arc::new(AsynchronousPageStore::new(durable.clone(), self.settings.async_queue_capacity)?))
        } else {
            None
        };
        let below_serializer = match &asynchronous {
            Some(store) => store.clone() as Arc<dyn PageStore>,
            None => durable,
        };

        let serializing = Arc::new(SerializingPageStore::new(below_serializer, self.serializer));
        let head = Arc::new(InSessionPageStore::new(serializing, self.settings.in_session_cache_size));
        info!(
            asynchronous = self.settings.asynchronous,
            cache_size = self.settings.in_session_cache_size,
            "page store pipeline ready"
        );
        Ok(PageStorePipeline { head, asynchronous })
    }
}

/// Assembled store chain. Operations enter at the in-session layer.
pub struct PageStorePipeline {
    head: Arc<InSessionPageStore>,
    asynchronous: Option<Arc<AsynchronousPageStore>>,
}

impl PageStorePipeline {
    /// Wait for queued writes to reach the durable store
    pub fn flush(&self) {
        if let Some(store) = &self.asynchronous {
            store.flush();
        }
    }

    /// The in-session layer
    pub fn session_cache(&self) -> &InSessionPageStore {
        &self.head
    }
}

impl PageStore for PageStorePipeline {
    fn can_be_asynchronous(&self, context: &PageContext) -> bool {
        self.head.can_be_asynchronous(context)
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        self.head.add_page(context, page)
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        self.head.get_page(context, page_id)
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        self.head.remove_page(context, page_id)
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        self.head.remove_all_pages(context)
    }

    fn destroy(&self) {
        self.head.destroy();
    }
}
