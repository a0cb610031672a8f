use std::collections::BTreeMap;
use std::sync::Arc;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DocumentKey;
use crate::firestore::remote::datastore::{Datastore, InMemoryDatastore};
use crate::firestore::value::{FirestoreValue, MapValue};

use super::query::{ConvertedQuery, Query, QuerySnapshot, TypedQuerySnapshot};
use super::snapshot::{DocumentSnapshot, TypedDocumentSnapshot};
use super::{
    converter::FirestoreDataConverter, database::Firestore, reference::ConvertedDocumentReference,
};

#[derive(Clone)]
pub struct FirestoreClient {
    firestore: Firestore,
    datastore: Arc<dyn Datastore>,
}

impl FirestoreClient {
    /// Creates a client backed by the supplied datastore implementation.
    pub fn new(firestore: Firestore, datastore: Arc<dyn Datastore>) -> Self {
        Self { firestore, datastore }
    }

    /// Returns a client that stores documents in memory only.
    ///
    /// Useful for tests or demos where persistence/network access is not
    /// required.
    pub fn with_in_memory(firestore: Firestore) -> Self {
        Self::new(firestore, Arc::new(InMemoryDatastore::new()))
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// Fetches the document located at `path`.
    ///
    /// Returns a snapshot that may or may not contain data depending on whether
    /// the document exists.
    pub async fn get_doc(&self, path: &str) -> FirestoreResult<DocumentSnapshot> {
        let key = DocumentKey::from_string(path)?;
        self.datastore.get_document(&key).await
    }

    /// Executes `query` and returns the matching documents in result order.
    pub async fn get_docs(&self, query: &Query) -> FirestoreResult<QuerySnapshot> {
        let documents = self.datastore.run_query(query.definition()).await?;
        Ok(QuerySnapshot::new(query.clone(), documents))
    }

    /// Replaces the document at `path` with the provided fields.
    pub async fn set_doc(
        &self,
        path: &str,
        data: BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        self.datastore.set_document(&key, MapValue::new(data)).await
    }

    /// Deletes the document at `path`. Succeeds even if it does not exist.
    pub async fn delete_doc(&self, path: &str) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        self.datastore.delete_document(&key).await
    }

    /// Reads a document using the converter attached to a typed reference.
    pub async fn get_doc_with_converter<C>(
        &self,
        reference: &ConvertedDocumentReference<C>,
    ) -> FirestoreResult<TypedDocumentSnapshot<C>>
    where
        C: FirestoreDataConverter,
    {
        let path = reference.path().canonical_string();
        let snapshot = self.get_doc(path.as_str()).await?;
        Ok(snapshot.into_typed(reference.converter()))
    }

    /// Executes a converted query, decoding results with its converter.
    pub async fn get_docs_with_converter<C>(
        &self,
        query: &ConvertedQuery<C>,
    ) -> FirestoreResult<TypedQuerySnapshot<C>>
    where
        C: FirestoreDataConverter,
    {
        let snapshot = self.get_docs(query.raw()).await?;
        Ok(TypedQuerySnapshot::new(snapshot, query.converter()))
    }

    /// Writes a typed model through the reference's converter.
    pub async fn set_doc_with_converter<C>(
        &self,
        reference: &ConvertedDocumentReference<C>,
        value: C::Model,
    ) -> FirestoreResult<()>
    where
        C: FirestoreDataConverter,
    {
        let map = reference.converter().to_map(&value)?;
        let path = reference.path().canonical_string();
        self.set_doc(path.as_str(), map).await
    }
}
