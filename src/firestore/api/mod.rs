mod converter;
mod database;
pub mod document;
pub(crate) mod query;
mod reference;
mod snapshot;

pub use converter::{FirestoreDataConverter, PassthroughConverter};
pub use database::Firestore;
pub use document::FirestoreClient;
pub use query::{
    ConvertedQuery, FieldFilter, FilterOperator, OrderBy, OrderDirection, Query, QueryDefinition,
    QuerySnapshot, TypedQuerySnapshot,
};
pub use reference::{
    CollectionReference, ConvertedCollectionReference, ConvertedDocumentReference,
    DocumentReference,
};
pub use snapshot::{DocumentData, DocumentSnapshot, TypedDocumentSnapshot};
