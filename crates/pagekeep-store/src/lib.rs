// Pagekeep Store Library
//
// The layered page store pipeline. Every layer implements `PageStore` and
// decorates the next one: in-session cache, serialization, write-behind
// queue and a durable store on disk or in memory.

pub mod config;
pub mod page;
pub mod serializer;
pub mod store;

// Layers
pub mod asynchronous;
pub mod file;
pub mod in_session;
pub mod memory;
pub mod serializing;

pub mod pipeline;

pub use asynchronous::AsynchronousPageStore;
pub use config::StoreSettings;
pub use file::FilePageStore;
pub use in_session::InSessionPageStore;
pub use memory::MemoryPageStore;
pub use page::{PageContext, PageHandle, SerializedPage, StoredPage};
pub use pipeline::{PageStorePipeline, PipelineBuilder};
pub use serializer::{BincodeSerializer, PageSerializer};
pub use serializing::SerializingPageStore;
pub use store::PageStore;
