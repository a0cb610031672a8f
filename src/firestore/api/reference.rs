use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

use super::converter::FirestoreDataConverter;
use super::database::Firestore;
use super::query::{ConvertedQuery, Query};

#[derive(Clone, Debug)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(
                "Collection references must point to a collection (odd number of segments)",
            ));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The full resource path of the collection (e.g. `rooms/eros/messages`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, an auto-ID is generated.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = document_id
            .map(|id| id.to_string())
            .unwrap_or_else(generate_auto_id);
        if id.contains('/') {
            return Err(invalid_argument("Document ID cannot contain '/'."));
        }
        DocumentReference::new(self.firestore.clone(), self.path.child([id]))
    }

    pub fn with_converter<C>(&self, converter: C) -> ConvertedCollectionReference<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedCollectionReference {
            inner: self.clone(),
            converter: Arc::new(converter),
        }
    }

    /// Creates an unconstrained query over every document in this collection.
    pub fn query(&self) -> Query {
        Query::for_collection(self.firestore.clone(), self.path.clone())
    }
}

impl From<CollectionReference> for Query {
    fn from(collection: CollectionReference) -> Self {
        collection.query()
    }
}

impl From<&CollectionReference> for Query {
    fn from(collection: &CollectionReference) -> Self {
        collection.query()
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { firestore, key })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    /// The parent collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }

    /// Returns a reference to a subcollection rooted at this document.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let sub_path = ResourcePath::from_string(path)?;
        let full_path = self.key.path().child(sub_path.segments().iter().cloned());
        CollectionReference::new(self.firestore.clone(), full_path)
    }

    pub fn with_converter<C>(&self, converter: C) -> ConvertedDocumentReference<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedDocumentReference::new(self.clone(), Arc::new(converter))
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path())
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}

#[derive(Clone)]
pub struct ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    inner: CollectionReference,
    converter: Arc<C>,
}

impl<C> ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    pub fn path(&self) -> &ResourcePath {
        self.inner.path()
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// Returns a typed document reference within this collection.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<ConvertedDocumentReference<C>> {
        let document = self.inner.doc(document_id)?;
        Ok(ConvertedDocumentReference::new(
            document,
            Arc::clone(&self.converter),
        ))
    }

    pub fn raw(&self) -> &CollectionReference {
        &self.inner
    }

    /// Creates a query for the underlying collection using this converter.
    pub fn query(&self) -> ConvertedQuery<C> {
        ConvertedQuery::new(self.inner.query(), Arc::clone(&self.converter))
    }
}

#[derive(Clone)]
pub struct ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    reference: DocumentReference,
    converter: Arc<C>,
}

impl<C> ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    fn new(reference: DocumentReference, converter: Arc<C>) -> Self {
        Self {
            reference,
            converter,
        }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.reference.path()
    }

    pub fn raw(&self) -> &DocumentReference {
        &self.reference
    }

    pub fn converter(&self) -> Arc<C> {
        Arc::clone(&self.converter)
    }
}
