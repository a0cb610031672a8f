use std::collections::BTreeMap;

use crate::firestore::error::FirestoreResult;
use crate::firestore::value::{FirestoreValue, MapValue};

/// Describes how to convert between user models and Firestore maps.
///
/// Writes use `to_map`, reads use `from_map`. A converter that rejects data in
/// `from_map` doubles as a schema check for everything read through it.
pub trait FirestoreDataConverter: Send + Sync + Clone + 'static {
    /// The strongly typed model associated with this converter.
    type Model: Clone;

    /// Encodes the user model into a Firestore map for writes.
    fn to_map(&self, value: &Self::Model) -> FirestoreResult<BTreeMap<String, FirestoreValue>>;

    /// Decodes a Firestore map into the user model for reads.
    fn from_map(&self, value: &MapValue) -> FirestoreResult<Self::Model>;
}

/// Converter that leaves Firestore maps unchanged.
#[derive(Clone, Default)]
pub struct PassthroughConverter;

impl FirestoreDataConverter for PassthroughConverter {
    type Model = BTreeMap<String, FirestoreValue>;

    fn to_map(&self, value: &Self::Model) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
        Ok(value.clone())
    }

    fn from_map(&self, value: &MapValue) -> FirestoreResult<Self::Model> {
        Ok(value.fields().clone())
    }
}
