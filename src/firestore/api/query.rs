use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::firestore::value::FirestoreValue;

use super::snapshot::DocumentSnapshot;
use super::{Firestore, FirestoreDataConverter, TypedDocumentSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    In,
}

impl FilterOperator {
    fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "==",
            FilterOperator::NotEqual => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::ArrayContains => "array-contains",
            FilterOperator::In => "in",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// A Firestore query over a single collection.
///
/// Supports field filters, ordering and a result limit. Results come back in
/// order-by order, ties broken by document path.
#[derive(Clone, Debug)]
pub struct Query {
    firestore: Firestore,
    definition: QueryDefinition,
}

impl Query {
    pub(crate) fn for_collection(firestore: Firestore, collection_path: ResourcePath) -> Self {
        Self {
            firestore,
            definition: QueryDefinition {
                collection_path,
                filters: Vec::new(),
                order_by: Vec::new(),
                limit: None,
            },
        }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// Returns the full resource path to the targeted collection.
    pub fn collection_path(&self) -> &ResourcePath {
        &self.definition.collection_path
    }

    pub fn collection_id(&self) -> &str {
        self.definition
            .collection_path
            .last_segment()
            .unwrap_or_default()
    }

    /// Returns a new query that only matches documents whose `field` satisfies `operator`.
    ///
    /// `In` requires an array operand.
    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: FirestoreValue,
    ) -> FirestoreResult<Self> {
        let field = field.into_field_path()?;
        if operator == FilterOperator::In
            && !matches!(value.kind(), crate::firestore::value::ValueKind::Array(_))
        {
            return Err(invalid_argument("'in' filters require an array value"));
        }
        let mut next = self.clone();
        next.definition.filters.push(FieldFilter {
            field,
            operator,
            value,
        });
        Ok(next)
    }

    pub fn order_by(&self, field: impl IntoFieldPath, direction: OrderDirection) -> FirestoreResult<Self> {
        let field = field.into_field_path()?;
        let mut next = self.clone();
        next.definition.order_by.push(OrderBy { field, direction });
        Ok(next)
    }

    pub fn limit(&self, limit: u32) -> FirestoreResult<Self> {
        if limit == 0 {
            return Err(invalid_argument("Query limit must be greater than zero"));
        }
        let mut next = self.clone();
        next.definition.limit = Some(limit);
        Ok(next)
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Attaches a converter to this query.
    pub fn with_converter<C>(&self, converter: C) -> ConvertedQuery<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedQuery::new(self.clone(), Arc::new(converter))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Query({})", self.definition.canonical_id())
    }
}

/// Backend-facing description of a query, consumed by datastores.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    pub(crate) collection_path: ResourcePath,
    pub(crate) filters: Vec<FieldFilter>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u32>,
}

impl QueryDefinition {
    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Whether `key` lives directly inside the queried collection.
    pub fn matches_collection(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }

    /// Stable textual form of the query, e.g. `tryreactfire|f:yummy==true|o:name asc|l:2`.
    pub fn canonical_id(&self) -> String {
        let mut id = self.collection_path.canonical_string();
        for filter in &self.filters {
            id.push_str(&format!(
                "|f:{}{}{:?}",
                filter.field.canonical_string(),
                filter.operator.as_str(),
                filter.value.kind()
            ));
        }
        for order in &self.order_by {
            let direction = match order.direction {
                OrderDirection::Ascending => "asc",
                OrderDirection::Descending => "desc",
            };
            id.push_str(&format!("|o:{} {direction}", order.field.canonical_string()));
        }
        if let Some(limit) = self.limit {
            id.push_str(&format!("|l:{limit}"));
        }
        id
    }
}

/// A query with an attached data converter for typed access.
#[derive(Clone)]
pub struct ConvertedQuery<C>
where
    C: FirestoreDataConverter,
{
    inner: Query,
    converter: Arc<C>,
}

impl<C> ConvertedQuery<C>
where
    C: FirestoreDataConverter,
{
    pub(crate) fn new(inner: Query, converter: Arc<C>) -> Self {
        Self { inner, converter }
    }

    /// Returns the untyped query backing this converted query.
    pub fn raw(&self) -> &Query {
        &self.inner
    }

    pub fn converter(&self) -> Arc<C> {
        Arc::clone(&self.converter)
    }
}

/// The results of executing a query, in result order.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    query: Query,
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(query: Query, documents: Vec<DocumentSnapshot>) -> Self {
        Self { query, documents }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// Typed wrapper around a `QuerySnapshot` using a data converter.
#[derive(Clone)]
pub struct TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    base: QuerySnapshot,
    converter: Arc<C>,
}

impl<C> TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    pub(crate) fn new(base: QuerySnapshot, converter: Arc<C>) -> Self {
        Self { base, converter }
    }

    pub fn raw(&self) -> &QuerySnapshot {
        &self.base
    }

    pub fn documents(&self) -> Vec<TypedDocumentSnapshot<C>> {
        self.base
            .documents
            .iter()
            .cloned()
            .map(|snapshot| snapshot.into_typed(Arc::clone(&self.converter)))
            .collect()
    }

    /// Converts every document in result order, failing on the first rejection.
    pub fn data(&self) -> FirestoreResult<Vec<C::Model>> {
        self.base
            .documents
            .iter()
            .filter_map(DocumentSnapshot::map_value)
            .map(|map| self.converter.from_map(map))
            .collect()
    }
}
