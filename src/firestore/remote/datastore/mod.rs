use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::api::{DocumentSnapshot, QueryDefinition};
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DocumentKey;
use crate::firestore::value::MapValue;

pub mod in_memory;

/// Backend the `FirestoreClient` reads from and writes to.
///
/// Reads must be side-effect free: `get_document` reports a missing document as
/// a snapshot without data rather than an error, and `run_query` returns
/// documents in result order.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Datastore: Send + Sync + 'static {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;
    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;
    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()>;
    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;
}

pub type DatastoreArc = Arc<dyn Datastore>;

pub use in_memory::InMemoryDatastore;
