use std::sync::Arc;

use crate::firestore::api::{
    ConvertedDocumentReference, ConvertedQuery, DocumentData, DocumentReference, FirestoreClient,
    FirestoreDataConverter, Query,
};

use super::observable::{Loader, Observable};

/// Options accepted by the `use_firestore_*` bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct BindingOptions<T> {
    /// Value reported before the first live read. Suppresses the loading state.
    pub initial_data: Option<T>,
}

impl<T> Default for BindingOptions<T> {
    fn default() -> Self {
        Self { initial_data: None }
    }
}

impl<T> BindingOptions<T> {
    pub fn with_initial_data(initial_data: T) -> Self {
        Self {
            initial_data: Some(initial_data),
        }
    }
}

/// Binds to the fields of a single document.
///
/// The live value is `None` while the document does not exist.
pub fn use_firestore_doc_data(
    client: &FirestoreClient,
    reference: &DocumentReference,
    options: BindingOptions<Option<DocumentData>>,
) -> Observable<Option<DocumentData>> {
    let client = client.clone();
    let path = reference.path().canonical_string();
    let loader: Loader<Option<DocumentData>> = Arc::new(move || {
        let client = client.clone();
        let path = path.clone();
        Box::pin(async move {
            let snapshot = client.get_doc(&path).await?;
            Ok(snapshot.data().cloned())
        })
    });
    Observable::new(loader, options.initial_data)
}

/// Binds to the documents matched by a query, in result order.
pub fn use_firestore_collection_data(
    client: &FirestoreClient,
    query: &Query,
    options: BindingOptions<Vec<DocumentData>>,
) -> Observable<Vec<DocumentData>> {
    let client = client.clone();
    let query = query.clone();
    let loader: Loader<Vec<DocumentData>> = Arc::new(move || {
        let client = client.clone();
        let query = query.clone();
        Box::pin(async move {
            let snapshot = client.get_docs(&query).await?;
            Ok(snapshot
                .into_documents()
                .into_iter()
                .filter_map(|document| document.into_map_value())
                .map(|map| map.into_fields())
                .collect())
        })
    });
    Observable::new(loader, options.initial_data)
}

/// Typed variant of [`use_firestore_doc_data`]; live values go through the converter.
pub fn use_firestore_doc_data_with_converter<C>(
    client: &FirestoreClient,
    reference: &ConvertedDocumentReference<C>,
    options: BindingOptions<Option<C::Model>>,
) -> Observable<Option<C::Model>>
where
    C: FirestoreDataConverter,
    C::Model: Send + Sync + 'static,
{
    let client = client.clone();
    let reference = reference.clone();
    let loader: Loader<Option<C::Model>> = Arc::new(move || {
        let client = client.clone();
        let reference = reference.clone();
        Box::pin(async move { client.get_doc_with_converter(&reference).await?.data() })
    });
    Observable::new(loader, options.initial_data)
}

/// Typed variant of [`use_firestore_collection_data`].
pub fn use_firestore_collection_data_with_converter<C>(
    client: &FirestoreClient,
    query: &ConvertedQuery<C>,
    options: BindingOptions<Vec<C::Model>>,
) -> Observable<Vec<C::Model>>
where
    C: FirestoreDataConverter,
    C::Model: Send + Sync + 'static,
{
    let client = client.clone();
    let query = query.clone();
    let loader: Loader<Vec<C::Model>> = Arc::new(move || {
        let client = client.clone();
        let query = query.clone();
        Box::pin(async move { client.get_docs_with_converter(&query).await?.data() })
    });
    Observable::new(loader, options.initial_data)
}
