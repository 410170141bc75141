// Page serialization
//
// Converts a live page graph to bytes and back. Decoding never yields a
// partially built page: malformed input is an error.

use std::fmt;

use pagekeep_core::Page;
use pagekeep_error::{SerializationError, SerializationResult};

/// Byte serialization of pages
pub trait PageSerializer: Send + Sync + fmt::Debug {
    fn serialize(&self, page: &Page) -> SerializationResult<Vec<u8>>;

    fn deserialize(&self, data: &[u8]) -> SerializationResult<Page>;
}

/// Default serializer backed by bincode
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl PageSerializer for BincodeSerializer {
    fn serialize(&self, page: &Page) -> SerializationResult<Vec<u8>> {
        bincode::serialize(page).map_err(|e| SerializationError::encode(page.page_id(), e.to_string()))
    }

    fn deserialize(&self, data: &[u8]) -> SerializationResult<Page> {
        bincode::deserialize(data).map_err(|e| SerializationError::decode(data.len(), e.to_string()))
    }
}
