use std::collections::BTreeMap;
use std::sync::Arc;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DocumentKey;
use crate::firestore::value::{FirestoreValue, MapValue};

use super::converter::FirestoreDataConverter;

/// Field data of a single document.
pub type DocumentData = BTreeMap<String, FirestoreValue>;

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>) -> Self {
        Self { key, data }
    }

    /// Returns whether the document exists on the backend.
    ///
    /// A document that exists with no fields still reports `true`.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the decoded document fields if the snapshot contains data.
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref().map(|map| map.fields())
    }

    pub fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    pub fn into_map_value(self) -> Option<MapValue> {
        self.data
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }

    pub(crate) fn into_typed<C>(self, converter: Arc<C>) -> TypedDocumentSnapshot<C>
    where
        C: FirestoreDataConverter,
    {
        TypedDocumentSnapshot {
            base: self,
            converter,
        }
    }
}

/// Document snapshot that decodes its data through a converter.
#[derive(Clone)]
pub struct TypedDocumentSnapshot<C>
where
    C: FirestoreDataConverter,
{
    base: DocumentSnapshot,
    converter: Arc<C>,
}

impl<C> TypedDocumentSnapshot<C>
where
    C: FirestoreDataConverter,
{
    pub fn exists(&self) -> bool {
        self.base.exists()
    }

    /// Converts the document fields into the converter's model.
    ///
    /// Returns `Ok(None)` when the document does not exist.
    pub fn data(&self) -> FirestoreResult<Option<C::Model>> {
        self.base
            .map_value()
            .map(|map| self.converter.from_map(map))
            .transpose()
    }

    pub fn raw(&self) -> &DocumentSnapshot {
        &self.base
    }
}
