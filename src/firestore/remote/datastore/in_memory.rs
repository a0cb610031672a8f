use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::firestore::api::{DocumentSnapshot, QueryDefinition};
use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::model::DocumentKey;
use crate::firestore::query_evaluator::apply_query_to_documents;
use crate::firestore::value::MapValue;

use super::Datastore;

/// Process-local datastore keyed by canonical document path.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<BTreeMap<String, MapValue>>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> FirestoreResult<MutexGuard<'_, BTreeMap<String, MapValue>>> {
        self.documents
            .lock()
            .map_err(|_| internal_error("In-memory datastore lock poisoned"))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let data = self.store()?.get(&key.path().canonical_string()).cloned();
        Ok(DocumentSnapshot::new(key.clone(), data))
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let mut candidates = Vec::new();
        for (path, data) in self.store()?.iter() {
            let key = DocumentKey::from_string(path)?;
            if query.matches_collection(&key) {
                candidates.push(DocumentSnapshot::new(key, Some(data.clone())));
            }
        }
        Ok(apply_query_to_documents(candidates, query))
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        self.store()?.insert(key.path().canonical_string(), data);
        Ok(())
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.store()?.remove(&key.path().canonical_string());
        Ok(())
    }
}
