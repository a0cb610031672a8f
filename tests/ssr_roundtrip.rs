#![cfg(not(target_arch = "wasm32"))]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firebase_ssr::binding::ObservableStatus;
use firebase_ssr::firestore::error::permission_denied;
use firebase_ssr::firestore::{
    DatabaseId, Datastore, DocumentKey, DocumentSnapshot, Firestore, FirestoreClient,
    FirestoreResult, FirestoreValue, InMemoryDatastore, MapValue, OrderDirection, QueryDefinition,
};
use firebase_ssr::ssr::{
    hydrate, initialize_path_ssr, initialize_ssr, DehydratedState, DehydratedValue,
    HydrationContext, JsonObject, SsrError,
};
use firebase_ssr::util::PartialObserver;
use serde_json::{json, Value};

firebase_ssr::query_keys! {
    enum PageQuery {
        Burrito => "burritoDocument",
        Taco => "tacoDocument",
        Menu => "menuCollection",
        Specials => "specialsCollection",
    }
}

type DocStatus = ObservableStatus<Option<BTreeMap<String, FirestoreValue>>>;

fn database_id() -> DatabaseId {
    DatabaseId::default("reactfire-nextjs")
}

fn yummy(value: bool) -> BTreeMap<String, FirestoreValue> {
    BTreeMap::from([("yummy".to_string(), FirestoreValue::from_bool(value))])
}

async fn seeded_client() -> FirestoreClient {
    let client = FirestoreClient::with_in_memory(Firestore::from_database_id(database_id()));
    client.set_doc("tryreactfire/burrito", yummy(true)).await.unwrap();
    client.set_doc("tryreactfire/empty", BTreeMap::new()).await.unwrap();
    for (id, rank) in [("a", 2), ("b", 3), ("c", 1)] {
        client
            .set_doc(
                &format!("menu/{id}"),
                BTreeMap::from([("rank".to_string(), FirestoreValue::from_integer(rank))]),
            )
            .await
            .unwrap();
    }
    client
}

/// Delegates to an in-memory store, denying reads of one path and recording
/// how many reads were in flight at once.
struct GuardedDatastore {
    inner: InMemoryDatastore,
    denied_path: String,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GuardedDatastore {
    fn new(inner: InMemoryDatastore, denied_path: &str) -> Self {
        Self {
            inner,
            denied_path: denied_path.to_string(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    async fn track<T>(&self, read: impl std::future::Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let result = read.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Datastore for GuardedDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        self.track(async {
            if key.path().canonical_string() == self.denied_path {
                return Err(permission_denied("Missing or insufficient permissions"));
            }
            self.inner.get_document(key).await
        })
        .await
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        self.track(self.inner.run_query(query)).await
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        self.inner.set_document(key, data).await
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.inner.delete_document(key).await
    }
}

#[tokio::test]
async fn payload_keys_match_the_requested_targets() {
    let client = seeded_client().await;
    let firestore = client.firestore().clone();
    let ssr = initialize_ssr::<PageQuery>().unwrap();

    let dehydrated = ssr
        .dehydrate(
            &client,
            [
                (PageQuery::Burrito, firestore.doc("tryreactfire/burrito").unwrap()),
                (PageQuery::Taco, firestore.doc("tryreactfire/taco").unwrap()),
            ],
            [
                (PageQuery::Menu, firestore.collection("menu").unwrap().query()),
                (PageQuery::Specials, firestore.collection("specials").unwrap().query()),
            ],
        )
        .await
        .unwrap();

    let state = dehydrated.into_state();
    let keys: Vec<_> = state.keys().collect();
    assert_eq!(
        keys,
        vec!["burritoDocument", "menuCollection", "specialsCollection", "tacoDocument"]
    );
    assert_eq!(state.get("tacoDocument"), Some(&DehydratedValue::Document(None)));
    assert_eq!(
        state.get("specialsCollection"),
        Some(&DehydratedValue::Collection(Vec::new()))
    );
}

#[tokio::test]
async fn empty_request_produces_empty_payload() {
    let client = seeded_client().await;
    let ssr = initialize_ssr::<PageQuery>().unwrap();
    let dehydrated = ssr.dehydrate(&client, [], []).await.unwrap();
    assert!(dehydrated.dehydrated_state.is_empty());
    assert_eq!(
        Value::Object(dehydrated.into_props(JsonObject::new()).unwrap()),
        json!({"dehydratedState": {}})
    );
}

#[tokio::test]
async fn hydrated_accessors_never_report_loading() {
    let client = seeded_client().await;
    let firestore = client.firestore().clone();
    let burrito = firestore.doc("tryreactfire/burrito").unwrap();
    let menu = firestore
        .collection("menu")
        .unwrap()
        .query()
        .order_by("rank", OrderDirection::Descending)
        .unwrap();
    let ssr = initialize_ssr::<PageQuery>().unwrap();

    let props = ssr
        .dehydrate(
            &client,
            [(PageQuery::Burrito, burrito.clone())],
            [(PageQuery::Menu, menu.clone())],
        )
        .await
        .unwrap()
        .into_props(JsonObject::new())
        .unwrap();
    let page = serde_json::to_string(&props).unwrap();
    let props: JsonObject = serde_json::from_str(&page).unwrap();

    let (doc, collection) = ssr
        .hydrate_props(&props, |context| {
            (
                ssr.use_hydrated_firestore_doc_data(context, &client, &burrito, PageQuery::Burrito),
                ssr.use_hydrated_firestore_collection_data(context, &client, &menu, PageQuery::Menu),
            )
        })
        .unwrap();

    let loading_seen = Arc::new(AtomicUsize::new(0));
    let counter = loading_seen.clone();
    let _unsubscribe = doc.subscribe(PartialObserver::new().with_next(move |status: &DocStatus| {
        if matches!(status, ObservableStatus::Loading) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    assert!(doc.is_seeded());
    assert_eq!(doc.status(), ObservableStatus::Success(Some(yummy(true))));
    let ranks: Vec<_> = collection
        .data()
        .unwrap()
        .iter()
        .map(|fields| fields.get("rank").and_then(FirestoreValue::as_integer).unwrap())
        .collect();
    assert_eq!(ranks, vec![3, 2, 1]);

    client.set_doc("tryreactfire/burrito", yummy(false)).await.unwrap();
    assert_eq!(doc.refresh().await, ObservableStatus::Success(Some(yummy(false))));
    assert_eq!(loading_seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn absent_and_empty_documents_stay_distinct() {
    let client = seeded_client().await;
    let firestore = client.firestore().clone();
    let empty = firestore.doc("tryreactfire/empty").unwrap();
    let missing = firestore.doc("tryreactfire/missing").unwrap();
    let ssr = initialize_path_ssr();

    let page = ssr
        .dehydrate(&client, [((), empty.clone()), ((), missing.clone())], [])
        .await
        .unwrap()
        .dehydrated_state
        .to_json_string()
        .unwrap();
    let state = DehydratedState::from_json_str(&page).unwrap();
    assert_eq!(
        state.to_json_value().unwrap(),
        json!({"tryreactfire/empty": {}, "tryreactfire/missing": null})
    );

    let (empty_binding, missing_binding) = ssr
        .hydrate(Some(state), |context| {
            (
                ssr.use_hydrated_firestore_doc_data(context, &client, &empty, ()),
                ssr.use_hydrated_firestore_doc_data(context, &client, &missing, ()),
            )
        })
        .unwrap();
    assert_eq!(empty_binding.data(), Some(Some(BTreeMap::new())));
    assert_eq!(missing_binding.data(), Some(None));
}

#[tokio::test]
async fn accessors_without_a_provider_behave_like_live_bindings() {
    let client = seeded_client().await;
    let burrito = client.firestore().doc("tryreactfire/burrito").unwrap();
    let ssr = initialize_path_ssr();

    let binding = ssr.use_hydrated_firestore_doc_data(&HydrationContext::none(), &client, &burrito, ());
    assert!(binding.is_loading());
    assert!(!binding.has_emitted());
    assert_eq!(binding.refresh().await, ObservableStatus::Success(Some(yummy(true))));

    let unprovided = hydrate(None, |context| {
        ssr.use_hydrated_firestore_doc_data(context, &client, &burrito, ())
    });
    assert!(unprovided.is_loading());
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_fetch_fails_the_whole_request() {
    let firestore = Firestore::from_database_id(database_id());
    let inner = InMemoryDatastore::new();
    inner
        .set_document(
            &DocumentKey::from_string("tryreactfire/burrito").unwrap(),
            MapValue::new(yummy(true)),
        )
        .await
        .unwrap();
    let datastore = Arc::new(GuardedDatastore::new(inner, "secret/recipe"));
    let client = FirestoreClient::new(firestore.clone(), datastore.clone());
    let ssr = initialize_ssr::<PageQuery>().unwrap();

    let result = ssr
        .dehydrate(
            &client,
            [
                (PageQuery::Burrito, firestore.doc("tryreactfire/burrito").unwrap()),
                (PageQuery::Taco, firestore.doc("secret/recipe").unwrap()),
            ],
            [(PageQuery::Menu, firestore.collection("menu").unwrap().query())],
        )
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.code_str(), "firestore/permission-denied");
    assert!(matches!(err, SsrError::Firestore(_)));
    assert_eq!(datastore.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn same_collection_queries_collide_under_path_addressing() {
    let client = seeded_client().await;
    let menu = client.firestore().collection("menu").unwrap();
    let ssr = initialize_path_ssr();

    let err = ssr
        .dehydrate(
            &client,
            [],
            [((), menu.query()), ((), menu.query().limit(1).unwrap())],
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SsrError::DuplicateQueryKey {
            key: "menu".to_string()
        }
    );
}

#[tokio::test]
async fn burrito_page_round_trip() {
    let client = seeded_client().await;
    let burrito = client.firestore().doc("tryreactfire/burrito").unwrap();
    let ssr = initialize_path_ssr();

    let props = ssr
        .dehydrate(&client, [((), burrito.clone())], [])
        .await
        .unwrap()
        .into_props(JsonObject::new())
        .unwrap();
    assert_eq!(
        Value::Object(props.clone()),
        json!({"dehydratedState": {"tryreactfire/burrito": {"yummy": true}}})
    );

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let captured = statuses.clone();
    let binding = ssr
        .hydrate_props(&props, |context| {
            ssr.use_hydrated_firestore_doc_data(context, &client, &burrito, ())
        })
        .unwrap();
    let _unsubscribe = binding.subscribe(PartialObserver::new().with_next(move |status: &DocStatus| {
        captured.lock().unwrap().push(status.clone());
    }));
    assert_eq!(binding.data(), Some(Some(yummy(true))));

    binding.refresh().await;
    assert_eq!(
        statuses.lock().unwrap().as_slice(),
        &[ObservableStatus::Success(Some(yummy(true)))]
    );
}

#[test]
fn registry_sessions_reject_unknown_payload_keys() {
    let ssr = initialize_ssr::<PageQuery>().unwrap();
    let props = json!({"dehydratedState": {"quesadillaDocument": {"cheesy": true}}});
    let props = match props {
        Value::Object(props) => props,
        _ => unreachable!(),
    };

    let err = ssr.hydrate_props(&props, |_| ()).unwrap_err();
    assert_eq!(
        err,
        SsrError::UnknownQueryKey {
            key: "quesadillaDocument".to_string()
        }
    );
}
