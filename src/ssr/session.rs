use crate::binding::Observable;
use crate::firestore::api::{
    ConvertedDocumentReference, ConvertedQuery, DocumentData, DocumentReference, FirestoreClient,
    FirestoreDataConverter, Query,
};

use super::accessors;
use super::addressing::{PathAddressing, QueryAddressing, RegistryAddressing};
use super::codec::JsonObject;
use super::dehydrate::DehydrateRequest;
use super::error::SsrResult;
use super::hydrate::{hydrate, HydrationContext};
use super::registry::{validate_key_set, QueryKey};
use super::state::{Dehydrated, DehydratedState, DEHYDRATED_STATE_PROP};

/// Dehydration, hydration and accessors bound to one addressing scheme.
///
/// Obtain one with [`initialize_ssr`] or [`initialize_path_ssr`] and use it on
/// both the server and the client so identifiers line up.
#[derive(Clone, Debug, Default)]
pub struct SsrSession<A> {
    addressing: A,
}

/// Creates a session keyed by the closed set `K`.
///
/// Fails when two keys of `K` share an identifier.
pub fn initialize_ssr<K: QueryKey>() -> SsrResult<SsrSession<RegistryAddressing<K>>> {
    validate_key_set::<K>()?;
    Ok(SsrSession::new(RegistryAddressing::new()))
}

/// Creates a session that identifies documents and queries by their paths.
pub fn initialize_path_ssr() -> SsrSession<PathAddressing> {
    SsrSession::new(PathAddressing)
}

impl<A: QueryAddressing> SsrSession<A> {
    pub fn new(addressing: A) -> Self {
        Self { addressing }
    }

    pub fn addressing(&self) -> &A {
        &self.addressing
    }

    /// Starts an empty request; use it for converted targets.
    pub fn request(&self) -> DehydrateRequest<A> {
        DehydrateRequest::new(self.addressing.clone())
    }

    /// Prefetches the given documents and queries in parallel.
    pub async fn dehydrate(
        &self,
        client: &FirestoreClient,
        documents: impl IntoIterator<Item = (A::Key, DocumentReference)>,
        collections: impl IntoIterator<Item = (A::Key, Query)>,
    ) -> SsrResult<Dehydrated> {
        let request = documents
            .into_iter()
            .fold(self.request(), |request, (key, reference)| {
                request.document(key, &reference)
            });
        collections
            .into_iter()
            .fold(request, |request, (key, query)| request.collection(key, query))
            .execute(client)
            .await
    }

    /// Provides `state` to `children` after checking it against this session's keys.
    pub fn hydrate<R>(
        &self,
        state: Option<DehydratedState>,
        children: impl FnOnce(&HydrationContext) -> R,
    ) -> SsrResult<R> {
        if let Some(state) = &state {
            self.addressing.validate_state(state)?;
        }
        Ok(hydrate(state, children))
    }

    /// Like [`SsrSession::hydrate`], reading the payload out of page props.
    ///
    /// Props whose `dehydratedState` entry is missing or `null` hydrate nothing.
    pub fn hydrate_props<R>(
        &self,
        props: &JsonObject,
        children: impl FnOnce(&HydrationContext) -> R,
    ) -> SsrResult<R> {
        let state = props
            .get(DEHYDRATED_STATE_PROP)
            .filter(|value| !value.is_null())
            .cloned()
            .map(DehydratedState::from_json_value)
            .transpose()?;
        self.hydrate(state, children)
    }

    pub fn use_hydrated_firestore_doc_data(
        &self,
        context: &HydrationContext,
        client: &FirestoreClient,
        reference: &DocumentReference,
        key: A::Key,
    ) -> Observable<Option<DocumentData>> {
        let id = self.addressing.document_id(reference, &key);
        accessors::use_hydrated_firestore_doc_data(context, client, reference, &id)
    }

    pub fn use_hydrated_firestore_collection_data(
        &self,
        context: &HydrationContext,
        client: &FirestoreClient,
        query: &Query,
        key: A::Key,
    ) -> Observable<Vec<DocumentData>> {
        let id = self.addressing.query_id(query, &key);
        accessors::use_hydrated_firestore_collection_data(context, client, query, &id)
    }

    pub fn use_hydrated_firestore_doc_data_with_converter<C>(
        &self,
        context: &HydrationContext,
        client: &FirestoreClient,
        reference: &ConvertedDocumentReference<C>,
        key: A::Key,
    ) -> Observable<Option<C::Model>>
    where
        C: FirestoreDataConverter,
        C::Model: Send + Sync + 'static,
    {
        let id = self.addressing.document_id(reference.raw(), &key);
        accessors::use_hydrated_firestore_doc_data_with_converter(context, client, reference, &id)
    }

    pub fn use_hydrated_firestore_collection_data_with_converter<C>(
        &self,
        context: &HydrationContext,
        client: &FirestoreClient,
        query: &ConvertedQuery<C>,
        key: A::Key,
    ) -> Observable<Vec<C::Model>>
    where
        C: FirestoreDataConverter,
        C::Model: Send + Sync + 'static,
    {
        let id = self.addressing.query_id(query.raw(), &key);
        accessors::use_hydrated_firestore_collection_data_with_converter(
            context, client, query, &id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::Firestore;
    use crate::firestore::model::DatabaseId;
    use crate::firestore::value::FirestoreValue;
    use serde_json::json;
    use std::collections::BTreeMap;

    crate::query_keys! {
        enum PageQuery {
            Burrito => "burritoDocument",
            Menu => "menuCollection",
        }
    }

    fn client() -> FirestoreClient {
        FirestoreClient::with_in_memory(Firestore::from_database_id(DatabaseId::default(
            "reactfire-nextjs",
        )))
    }

    #[tokio::test]
    async fn registry_session_round_trips_through_props() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                BTreeMap::from([("yummy".to_string(), FirestoreValue::from_bool(true))]),
            )
            .await
            .unwrap();
        let firestore = client.firestore().clone();
        let burrito = firestore.doc("tryreactfire/burrito").unwrap();
        let menu = firestore.collection("menu").unwrap().query();

        let session = initialize_ssr::<PageQuery>().unwrap();
        let props = session
            .dehydrate(
                &client,
                [(PageQuery::Burrito, burrito.clone())],
                [(PageQuery::Menu, menu.clone())],
            )
            .await
            .unwrap()
            .into_props(JsonObject::new())
            .unwrap();
        assert_eq!(
            serde_json::Value::Object(props.clone()),
            json!({"dehydratedState": {
                "burritoDocument": {"yummy": true},
                "menuCollection": []
            }})
        );

        let (doc, collection) = session
            .hydrate_props(&props, |context| {
                (
                    session.use_hydrated_firestore_doc_data(
                        context,
                        &client,
                        &burrito,
                        PageQuery::Burrito,
                    ),
                    session.use_hydrated_firestore_collection_data(
                        context,
                        &client,
                        &menu,
                        PageQuery::Menu,
                    ),
                )
            })
            .unwrap();
        assert!(!doc.is_loading());
        assert!(!collection.is_loading());
        assert_eq!(collection.data(), Some(Vec::new()));
    }

    #[test]
    fn registry_session_rejects_foreign_payloads() {
        let session = initialize_ssr::<PageQuery>().unwrap();
        let state = DehydratedState::from_json_value(json!({"tacoDocument": null})).unwrap();
        let err = session.hydrate(Some(state), |_| ()).unwrap_err();
        assert_eq!(err.code_str(), "ssr/unknown-query-key");
    }

    #[test]
    fn props_without_payload_hydrate_nothing() {
        let session = initialize_path_ssr();
        let available = session
            .hydrate_props(&JsonObject::new(), |context| context.is_available())
            .unwrap();
        assert!(!available);
    }

    #[test]
    fn null_payload_prop_hydrates_nothing() {
        let session = initialize_ssr::<PageQuery>().unwrap();
        let mut props = JsonObject::new();
        props.insert(DEHYDRATED_STATE_PROP.into(), serde_json::Value::Null);
        let available = session
            .hydrate_props(&props, |context| context.is_available())
            .unwrap();
        assert!(!available);
    }
}
