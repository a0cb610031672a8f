//! Live bindings seeded from a [`HydrationContext`].
//!
//! When the context holds an entry for the requested identifier the binding
//! starts in the success state with that data and never reports loading. In
//! every other case (no context, no entry, an entry of the other kind, or an
//! entry that no longer decodes) the accessor returns an ordinary unseeded
//! binding.

use crate::binding::{
    use_firestore_collection_data, use_firestore_collection_data_with_converter,
    use_firestore_doc_data, use_firestore_doc_data_with_converter, BindingOptions, Observable,
};
use crate::firestore::api::{
    ConvertedDocumentReference, ConvertedQuery, DocumentData, DocumentReference, FirestoreClient,
    FirestoreDataConverter, Query,
};
use crate::firestore::value::MapValue;

use super::hydrate::HydrationContext;

fn document_seed(context: &HydrationContext, id: &str) -> Option<Option<DocumentData>> {
    let value = context.lookup(id)?;
    match value.decode_document() {
        Some(Ok(data)) => Some(data),
        Some(Err(err)) => {
            log::warn!("ignoring hydrated entry '{id}': {err}");
            None
        }
        None => {
            log::warn!("hydrated entry '{id}' holds a collection, not a document");
            None
        }
    }
}

fn collection_seed(context: &HydrationContext, id: &str) -> Option<Vec<DocumentData>> {
    let value = context.lookup(id)?;
    match value.decode_collection() {
        Some(Ok(documents)) => Some(documents),
        Some(Err(err)) => {
            log::warn!("ignoring hydrated entry '{id}': {err}");
            None
        }
        None => {
            log::warn!("hydrated entry '{id}' holds a document, not a collection");
            None
        }
    }
}

fn convert<C: FirestoreDataConverter>(
    converter: &C,
    id: &str,
    fields: DocumentData,
) -> Option<C::Model> {
    converter
        .from_map(&MapValue::new(fields))
        .inspect_err(|err| log::warn!("converter rejected hydrated entry '{id}': {err}"))
        .ok()
}

fn options<T>(seed: Option<T>) -> BindingOptions<T> {
    BindingOptions { initial_data: seed }
}

pub fn use_hydrated_firestore_doc_data(
    context: &HydrationContext,
    client: &FirestoreClient,
    reference: &DocumentReference,
    id: &str,
) -> Observable<Option<DocumentData>> {
    use_firestore_doc_data(client, reference, options(document_seed(context, id)))
}

pub fn use_hydrated_firestore_collection_data(
    context: &HydrationContext,
    client: &FirestoreClient,
    query: &Query,
    id: &str,
) -> Observable<Vec<DocumentData>> {
    use_firestore_collection_data(client, query, options(collection_seed(context, id)))
}

pub fn use_hydrated_firestore_doc_data_with_converter<C>(
    context: &HydrationContext,
    client: &FirestoreClient,
    reference: &ConvertedDocumentReference<C>,
    id: &str,
) -> Observable<Option<C::Model>>
where
    C: FirestoreDataConverter,
    C::Model: Send + Sync + 'static,
{
    let converter = reference.converter();
    let seed = document_seed(context, id).and_then(|data| match data {
        Some(fields) => convert(converter.as_ref(), id, fields).map(Some),
        None => Some(None),
    });
    use_firestore_doc_data_with_converter(client, reference, options(seed))
}

pub fn use_hydrated_firestore_collection_data_with_converter<C>(
    context: &HydrationContext,
    client: &FirestoreClient,
    query: &ConvertedQuery<C>,
    id: &str,
) -> Observable<Vec<C::Model>>
where
    C: FirestoreDataConverter,
    C::Model: Send + Sync + 'static,
{
    let converter = query.converter();
    let seed = collection_seed(context, id).and_then(|documents| {
        documents
            .into_iter()
            .map(|fields| convert(converter.as_ref(), id, fields))
            .collect::<Option<Vec<_>>>()
    });
    use_firestore_collection_data_with_converter(client, query, options(seed))
}
