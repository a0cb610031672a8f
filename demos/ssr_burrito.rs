//! Server render and client hydration of a single burrito document.
//!
//! Reads `FIREBASE_PROJECT_ID` (and optionally `FIRESTORE_DATABASE_ID`) from the
//! environment, falling back to a demo project. Data lives in memory.

use std::collections::BTreeMap;

use firebase_ssr::app::FirebaseOptions;
use firebase_ssr::firestore::*;
use firebase_ssr::ssr::{initialize_ssr, JsonObject, SsrError, SsrResult};

firebase_ssr::query_keys! {
    enum PageQuery {
        Burrito => "burritoDocument",
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Order {
    yummy: bool,
}

#[derive(Clone)]
struct BurritoConverter;

impl FirestoreDataConverter for BurritoConverter {
    type Model = Order;

    fn to_map(&self, value: &Order) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
        Ok(BTreeMap::from([(
            "yummy".to_string(),
            FirestoreValue::from_bool(value.yummy),
        )]))
    }

    fn from_map(&self, value: &MapValue) -> FirestoreResult<Order> {
        let yummy = value
            .get("yummy")
            .and_then(FirestoreValue::as_bool)
            .ok_or_else(|| error::invalid_argument("yummy must be a boolean"))?;
        Ok(Order { yummy })
    }
}

fn firestore() -> SsrResult<Firestore> {
    match FirebaseOptions::from_env() {
        Ok(options) => Ok(Firestore::new(&options)?),
        Err(err) => {
            println!("{err}; using the demo project");
            Ok(Firestore::from_database_id(DatabaseId::default("reactfire-nextjs")))
        }
    }
}

async fn server_render(client: &FirestoreClient) -> SsrResult<String> {
    let burrito = client
        .firestore()
        .doc("tryreactfire/burrito")?
        .with_converter(BurritoConverter);

    let ssr = initialize_ssr::<PageQuery>()?;
    let mut props = JsonObject::new();
    props.insert("title".to_string(), "Try Reactfire".into());
    let props = ssr
        .request()
        .converted_document(PageQuery::Burrito, &burrito)
        .execute(client)
        .await?
        .into_props(props)?;

    serde_json::to_string(&props).map_err(|err| SsrError::InvalidPayload {
        message: err.to_string(),
    })
}

async fn client_render(client: &FirestoreClient, page: &str) -> SsrResult<()> {
    let props: JsonObject =
        serde_json::from_str(page).map_err(|err| SsrError::InvalidPayload {
            message: err.to_string(),
        })?;
    let burrito = client
        .firestore()
        .doc("tryreactfire/burrito")?
        .with_converter(BurritoConverter);

    let ssr = initialize_ssr::<PageQuery>()?;
    let binding = ssr.hydrate_props(&props, |context| {
        ssr.use_hydrated_firestore_doc_data_with_converter(
            context,
            client,
            &burrito,
            PageQuery::Burrito,
        )
    })?;

    let describe = |order: Option<Order>| match order {
        Some(order) if order.yummy => "The burrito is good!",
        Some(_) => "The burrito is bad!",
        None => "There is no burrito.",
    };
    println!("first render (loading: {}): {}", binding.is_loading(), describe(binding.data().flatten()));

    client
        .set_doc_with_converter(&burrito, Order { yummy: false })
        .await?;
    binding.refresh().await;
    println!("after live update: {}", describe(binding.data().flatten()));
    Ok(())
}

#[tokio::main]
async fn main() -> SsrResult<()> {
    let client = FirestoreClient::with_in_memory(firestore()?);
    client
        .set_doc_with_converter(
            &client
                .firestore()
                .doc("tryreactfire/burrito")?
                .with_converter(BurritoConverter),
            Order { yummy: true },
        )
        .await?;

    let page = server_render(&client).await?;
    println!("server props: {page}");
    client_render(&client, &page).await
}
