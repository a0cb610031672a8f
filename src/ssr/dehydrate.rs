use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::{try_join, try_join_all};

use crate::firestore::api::{
    ConvertedDocumentReference, ConvertedQuery, DocumentData, DocumentReference, Firestore,
    FirestoreClient, FirestoreDataConverter, Query,
};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::MapValue;

use super::addressing::{PathAddressing, QueryAddressing};
use super::codec::{encode_fields, JsonObject};
use super::error::{SsrError, SsrResult};
use super::state::{Dehydrated, DehydratedState, DehydratedValue};

const DEHYDRATE_DOCUMENT: &str = "dehydrate_document";
const DEHYDRATE_COLLECTION: &str = "dehydrate_collection";

/// Re-shapes stored fields through a converter before they are encoded.
type Normalizer = Arc<dyn Fn(&MapValue) -> FirestoreResult<DocumentData> + Send + Sync>;

fn converter_normalizer<C>(converter: Arc<C>) -> Normalizer
where
    C: FirestoreDataConverter,
{
    Arc::new(move |map: &MapValue| {
        let model = converter.from_map(map)?;
        converter.to_map(&model)
    })
}

fn encode_entry(
    operation: &'static str,
    id: &str,
    map: &MapValue,
    normalize: Option<&Normalizer>,
) -> SsrResult<JsonObject> {
    let normalized;
    let fields = match normalize {
        Some(normalize) => {
            normalized = normalize(map)
                .map_err(|err| SsrError::serialization(operation, id, err.message()))?;
            &normalized
        }
        None => map.fields(),
    };
    encode_fields(fields).map_err(|err| SsrError::serialization(operation, id, err.to_string()))
}

fn ensure_same_database(client: &FirestoreClient, target: &Firestore, path: &str) -> SsrResult<()> {
    let expected = client.firestore().database_id();
    let actual = target.database_id();
    if expected != actual {
        return Err(invalid_argument(format!(
            "{path} belongs to projects/{}/databases/{} but the client reads projects/{}/databases/{}",
            actual.project_id(),
            actual.database(),
            expected.project_id(),
            expected.database()
        ))
        .into());
    }
    Ok(())
}

async fn fetch_document(
    client: &FirestoreClient,
    id: &str,
    reference: &DocumentReference,
    normalize: Option<&Normalizer>,
) -> SsrResult<DehydratedValue> {
    let path = reference.path().canonical_string();
    ensure_same_database(client, reference.firestore(), &path)?;
    let snapshot = client.get_doc(&path).await?;
    match snapshot.map_value() {
        Some(map) => Ok(DehydratedValue::Document(Some(encode_entry(
            DEHYDRATE_DOCUMENT,
            id,
            map,
            normalize,
        )?))),
        None => {
            log::debug!("document {path} does not exist; dehydrating '{id}' as null");
            Ok(DehydratedValue::Document(None))
        }
    }
}

async fn fetch_collection(
    client: &FirestoreClient,
    id: &str,
    query: &Query,
    normalize: Option<&Normalizer>,
) -> SsrResult<DehydratedValue> {
    ensure_same_database(
        client,
        query.firestore(),
        &query.collection_path().canonical_string(),
    )?;
    let snapshot = client.get_docs(query).await?;
    let objects = snapshot
        .documents()
        .iter()
        .filter_map(|document| document.map_value())
        .map(|map| encode_entry(DEHYDRATE_COLLECTION, id, map, normalize))
        .collect::<SsrResult<Vec<_>>>()?;
    Ok(DehydratedValue::Collection(objects))
}

/// Fetches one document and encodes it for transfer.
///
/// A missing document yields `DehydratedValue::Document(None)`, which is
/// distinct from an existing document with no fields.
pub async fn dehydrate_document(
    client: &FirestoreClient,
    id: &str,
    reference: &DocumentReference,
) -> SsrResult<DehydratedValue> {
    fetch_document(client, id, reference, None).await
}

/// Runs one query and encodes its documents in result order.
pub async fn dehydrate_collection(
    client: &FirestoreClient,
    id: &str,
    query: &Query,
) -> SsrResult<DehydratedValue> {
    fetch_collection(client, id, query, None).await
}

struct DocumentTarget {
    id: String,
    reference: DocumentReference,
    normalize: Option<Normalizer>,
}

struct CollectionTarget {
    id: String,
    query: Query,
    normalize: Option<Normalizer>,
}

/// The documents and queries to prefetch for one page render.
///
/// Targets are fetched concurrently by [`DehydrateRequest::execute`]. The
/// request either yields a payload with one entry per target or fails as a
/// whole.
pub struct DehydrateRequest<A: QueryAddressing> {
    addressing: A,
    documents: Vec<DocumentTarget>,
    collections: Vec<CollectionTarget>,
}

impl<A: QueryAddressing> DehydrateRequest<A> {
    pub fn new(addressing: A) -> Self {
        Self {
            addressing,
            documents: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn addressing(&self) -> &A {
        &self.addressing
    }

    pub fn document(mut self, key: A::Key, reference: &DocumentReference) -> Self {
        let id = self.addressing.document_id(reference, &key);
        self.documents.push(DocumentTarget {
            id,
            reference: reference.clone(),
            normalize: None,
        });
        self
    }

    pub fn collection(mut self, key: A::Key, query: impl Into<Query>) -> Self {
        let query = query.into();
        let id = self.addressing.query_id(&query, &key);
        self.collections.push(CollectionTarget {
            id,
            query,
            normalize: None,
        });
        self
    }

    /// Prefetches a document as its converter would store it.
    ///
    /// Stored fields are decoded into the model and encoded back, so the
    /// payload holds exactly what the typed accessor expects.
    pub fn converted_document<C>(
        mut self,
        key: A::Key,
        reference: &ConvertedDocumentReference<C>,
    ) -> Self
    where
        C: FirestoreDataConverter,
    {
        let id = self.addressing.document_id(reference.raw(), &key);
        self.documents.push(DocumentTarget {
            id,
            reference: reference.raw().clone(),
            normalize: Some(converter_normalizer(reference.converter())),
        });
        self
    }

    pub fn converted_collection<C>(mut self, key: A::Key, query: &ConvertedQuery<C>) -> Self
    where
        C: FirestoreDataConverter,
    {
        let id = self.addressing.query_id(query.raw(), &key);
        self.collections.push(CollectionTarget {
            id,
            query: query.raw().clone(),
            normalize: Some(converter_normalizer(query.converter())),
        });
        self
    }

    /// Identifiers the payload will contain, documents first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .map(|target| target.id.as_str())
            .chain(self.collections.iter().map(|target| target.id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.documents.len() + self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_unique_ids(&self) -> SsrResult<()> {
        let mut seen = BTreeSet::new();
        for id in self.ids() {
            if !seen.insert(id) {
                return Err(SsrError::DuplicateQueryKey { key: id.to_string() });
            }
        }
        Ok(())
    }

    /// Fetches every target concurrently and assembles the payload.
    ///
    /// Duplicate identifiers are rejected before anything is fetched. The
    /// first failing fetch or encoding aborts the whole request.
    pub async fn execute(self, client: &FirestoreClient) -> SsrResult<Dehydrated> {
        self.ensure_unique_ids()?;
        log::debug!(
            "dehydrating {} documents and {} collections",
            self.documents.len(),
            self.collections.len()
        );

        let document_fetches = self.documents.iter().map(|target| {
            fetch_document(client, &target.id, &target.reference, target.normalize.as_ref())
        });
        let collection_fetches = self.collections.iter().map(|target| {
            fetch_collection(client, &target.id, &target.query, target.normalize.as_ref())
        });
        let (documents, collections) =
            try_join(try_join_all(document_fetches), try_join_all(collection_fetches))
                .await
                .inspect_err(|err| log::warn!("dehydration aborted: {err}"))?;

        let mut state = DehydratedState::new();
        for (target, value) in self.documents.iter().zip(documents) {
            state.insert(target.id.clone(), value);
        }
        for (target, value) in self.collections.iter().zip(collections) {
            state.insert(target.id.clone(), value);
        }
        Ok(Dehydrated {
            dehydrated_state: state,
        })
    }
}

impl DehydrateRequest<PathAddressing> {
    /// Builds a path-keyed request from plain lists of targets.
    pub fn from_targets<'a>(
        documents: impl IntoIterator<Item = &'a DocumentReference>,
        collections: impl IntoIterator<Item = &'a Query>,
    ) -> Self {
        let request = documents
            .into_iter()
            .fold(Self::new(PathAddressing), |request, reference| {
                request.document((), reference)
            });
        collections
            .into_iter()
            .fold(request, |request, query| request.collection((), query.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::OrderDirection;
    use crate::firestore::model::{DatabaseId, Timestamp};
    use crate::firestore::value::FirestoreValue;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn client() -> FirestoreClient {
        FirestoreClient::with_in_memory(Firestore::from_database_id(DatabaseId::default(
            "reactfire-nextjs",
        )))
    }

    fn fields(entries: &[(&str, FirestoreValue)]) -> DocumentData {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Burrito {
        yummy: bool,
    }

    #[derive(Clone)]
    struct BurritoConverter;

    impl FirestoreDataConverter for BurritoConverter {
        type Model = Burrito;

        fn to_map(&self, value: &Burrito) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
            Ok(fields(&[("yummy", FirestoreValue::from_bool(value.yummy))]))
        }

        fn from_map(&self, value: &MapValue) -> FirestoreResult<Burrito> {
            value
                .get("yummy")
                .and_then(FirestoreValue::as_bool)
                .map(|yummy| Burrito { yummy })
                .ok_or_else(|| invalid_argument("yummy must be a boolean"))
        }
    }

    #[tokio::test]
    async fn missing_document_is_distinct_from_empty_document() {
        let client = client();
        client.set_doc("tryreactfire/empty", BTreeMap::new()).await.unwrap();
        let firestore = client.firestore().clone();

        let empty = dehydrate_document(&client, "e", &firestore.doc("tryreactfire/empty").unwrap())
            .await
            .unwrap();
        let missing =
            dehydrate_document(&client, "m", &firestore.doc("tryreactfire/missing").unwrap())
                .await
                .unwrap();

        assert_eq!(empty, DehydratedValue::Document(Some(JsonObject::new())));
        assert_eq!(missing, DehydratedValue::Document(None));
    }

    #[tokio::test]
    async fn collections_keep_query_order() {
        let client = client();
        for (id, rank) in [("a", 2), ("b", 3), ("c", 1)] {
            client
                .set_doc(
                    &format!("menu/{id}"),
                    fields(&[("rank", FirestoreValue::from_integer(rank))]),
                )
                .await
                .unwrap();
        }
        let query = client
            .firestore()
            .collection("menu")
            .unwrap()
            .query()
            .order_by("rank", OrderDirection::Descending)
            .unwrap();

        let value = dehydrate_collection(&client, "menu", &query).await.unwrap();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!([{"rank": 3}, {"rank": 2}, {"rank": 1}])
        );
    }

    #[tokio::test]
    async fn unencodable_values_fail_with_operation_and_key() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                fields(&[("spice", FirestoreValue::from_double(f64::INFINITY))]),
            )
            .await
            .unwrap();
        let reference = client.firestore().doc("tryreactfire/burrito").unwrap();

        let err = dehydrate_document(&client, "burritoDocument", &reference)
            .await
            .unwrap_err();
        match err {
            SsrError::Serialization { operation, key, .. } => {
                assert_eq!(operation, "dehydrate_document");
                assert_eq!(key, "burritoDocument");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_timestamps_fail_at_dehydration() {
        let client = client();
        client
            .set_doc(
                "t/a",
                fields(&[(
                    "when",
                    FirestoreValue::from_timestamp(Timestamp::new(300_000_000_000, 0)),
                )]),
            )
            .await
            .unwrap();
        let reference = client.firestore().doc("t/a").unwrap();

        let err = DehydrateRequest::from_targets([&reference], [])
            .execute(&client)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "ssr/serialization-failed");
    }

    #[tokio::test]
    async fn targets_from_another_database_are_rejected() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                fields(&[("yummy", FirestoreValue::from_bool(true))]),
            )
            .await
            .unwrap();
        let other = Firestore::from_database_id(DatabaseId::new("reactfire-nextjs", "staging"));
        let burrito = other.doc("tryreactfire/burrito").unwrap();
        let menu = other.collection("menu").unwrap().query();

        let err = dehydrate_document(&client, "burritoDocument", &burrito)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        let err = dehydrate_collection(&client, "menuCollection", &menu)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[tokio::test]
    async fn path_request_keys_entries_by_path() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                fields(&[("yummy", FirestoreValue::from_bool(true))]),
            )
            .await
            .unwrap();
        let firestore = client.firestore().clone();
        let burrito = firestore.doc("tryreactfire/burrito").unwrap();
        let menu = firestore.collection("menu").unwrap().query();

        let dehydrated = DehydrateRequest::from_targets([&burrito], [&menu])
            .execute(&client)
            .await
            .unwrap();
        let state = dehydrated.into_state();
        let keys: Vec<_> = state.keys().collect();
        assert_eq!(keys, vec!["menu", "tryreactfire/burrito"]);
        assert_eq!(state.get("menu"), Some(&DehydratedValue::Collection(Vec::new())));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_before_fetching() {
        let client = client();
        let firestore = client.firestore().clone();
        let burrito = firestore.doc("tryreactfire/burrito").unwrap();

        let err = DehydrateRequest::from_targets([&burrito, &burrito], [])
            .execute(&client)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SsrError::DuplicateQueryKey {
                key: "tryreactfire/burrito".into()
            }
        );
    }

    #[tokio::test]
    async fn converted_targets_are_normalized_by_the_converter() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                fields(&[
                    ("yummy", FirestoreValue::from_bool(true)),
                    ("internalNote", FirestoreValue::from_string("extra salsa")),
                ]),
            )
            .await
            .unwrap();
        let reference = client
            .firestore()
            .doc("tryreactfire/burrito")
            .unwrap()
            .with_converter(BurritoConverter);

        let state = DehydrateRequest::new(PathAddressing)
            .converted_document((), &reference)
            .execute(&client)
            .await
            .unwrap()
            .into_state();
        assert_eq!(
            state.to_json_value().unwrap(),
            json!({"tryreactfire/burrito": {"yummy": true}})
        );
    }

    #[tokio::test]
    async fn converter_rejections_abort_the_request() {
        let client = client();
        client
            .set_doc(
                "tryreactfire/burrito",
                fields(&[("yummy", FirestoreValue::from_string("very"))]),
            )
            .await
            .unwrap();
        let query = client
            .firestore()
            .collection("tryreactfire")
            .unwrap()
            .with_converter(BurritoConverter)
            .query();

        let err = DehydrateRequest::new(PathAddressing)
            .converted_collection((), &query)
            .execute(&client)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "ssr/serialization-failed");
    }
}
