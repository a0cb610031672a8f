pub mod api;
mod constants;
pub mod error;
pub mod model;
mod query_evaluator;
pub mod remote;
pub mod value;

pub use api::{
    CollectionReference, ConvertedCollectionReference, ConvertedDocumentReference, ConvertedQuery,
    DocumentData, DocumentReference, DocumentSnapshot, FieldFilter, FilterOperator, Firestore,
    FirestoreClient, FirestoreDataConverter, OrderDirection, PassthroughConverter, Query,
    QueryDefinition, QuerySnapshot, TypedDocumentSnapshot, TypedQuerySnapshot,
};
pub use constants::DEFAULT_DATABASE_ID;
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, DocumentKey, FieldPath, GeoPoint, ResourcePath, Timestamp};
pub use remote::datastore::{Datastore, DatastoreArc, InMemoryDatastore};
pub use value::{ArrayValue, BytesValue, FirestoreValue, MapValue, ValueKind};
