use std::cmp::Ordering;

use crate::firestore::api::{
    DocumentSnapshot, FieldFilter, FilterOperator, OrderBy, OrderDirection, QueryDefinition,
};
use crate::firestore::model::{FieldPath, ResourcePath};
use crate::firestore::value::{FirestoreValue, MapValue, ValueKind};

/// Applies `definition` to a set of candidate documents and returns the
/// filtered, ordered, and limited result set.
///
/// Documents are ordered by the order-by clauses and then by path, so two runs
/// over the same data always agree on the result order.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> Vec<DocumentSnapshot> {
    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(DocumentSnapshot::exists)
        .filter(|snapshot| document_satisfies_filters(snapshot, definition.filters()))
        .collect();

    filtered.sort_by(|left, right| compare_snapshots(left, right, definition.order_by()));

    if let Some(limit) = definition.limit() {
        filtered.truncate(limit as usize);
    }

    filtered
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters
        .iter()
        .all(|filter| match field_value(snapshot, filter.field()) {
            Some(value) => evaluate_filter(filter, value),
            None => false,
        })
}

fn evaluate_filter(filter: &FieldFilter, value: &FirestoreValue) -> bool {
    let operand = filter.value();
    match filter.operator() {
        FilterOperator::Equal => value == operand,
        FilterOperator::NotEqual => value != operand,
        FilterOperator::LessThan => range_matches(value, operand, |ordering| ordering.is_lt()),
        FilterOperator::LessThanOrEqual => {
            range_matches(value, operand, |ordering| ordering.is_le())
        }
        FilterOperator::GreaterThan => range_matches(value, operand, |ordering| ordering.is_gt()),
        FilterOperator::GreaterThanOrEqual => {
            range_matches(value, operand, |ordering| ordering.is_ge())
        }
        FilterOperator::ArrayContains => match value.kind() {
            ValueKind::Array(array) => array.contains(operand),
            _ => false,
        },
        FilterOperator::In => match operand.kind() {
            ValueKind::Array(candidates) => candidates.contains(value),
            _ => false,
        },
    }
}

/// Range filters only match values of the operand's type; NaN matches none.
fn range_matches(
    value: &FirestoreValue,
    operand: &FirestoreValue,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    type_order(value) == type_order(operand)
        && !is_nan(value)
        && !is_nan(operand)
        && accept(compare_values(value, operand))
}

fn is_nan(value: &FirestoreValue) -> bool {
    matches!(value.kind(), ValueKind::Double(double) if double.is_nan())
}

fn field_value<'a>(snapshot: &'a DocumentSnapshot, field: &FieldPath) -> Option<&'a FirestoreValue> {
    find_in_map(snapshot.map_value()?, field.segments())
}

fn find_in_map<'a>(map: &'a MapValue, segments: &[String]) -> Option<&'a FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = map.get(first)?;
    if rest.is_empty() {
        Some(value)
    } else if let ValueKind::Map(child) = value.kind() {
        find_in_map(child, rest)
    } else {
        None
    }
}

fn compare_snapshots(left: &DocumentSnapshot, right: &DocumentSnapshot, order_by: &[OrderBy]) -> Ordering {
    let null = FirestoreValue::null();
    for order in order_by {
        let left_value = field_value(left, order.field()).unwrap_or(&null);
        let right_value = field_value(right, order.field()).unwrap_or(&null);

        let mut ordering = compare_values(left_value, right_value);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    ResourcePath::comparator(left.document_key().path(), right.document_key().path())
}

/// Rank of a value's type in the cross-type ordering. Integers and doubles
/// share a rank and compare numerically.
fn type_order(value: &FirestoreValue) -> u8 {
    match value.kind() {
        ValueKind::Null => 0,
        ValueKind::Boolean(_) => 1,
        ValueKind::Integer(_) | ValueKind::Double(_) => 2,
        ValueKind::Timestamp(_) => 3,
        ValueKind::String(_) => 4,
        ValueKind::Bytes(_) => 5,
        ValueKind::Reference(_) => 6,
        ValueKind::GeoPoint(_) => 7,
        ValueKind::Array(_) => 8,
        ValueKind::Map(_) => 9,
    }
}

/// Total order over values: null, booleans, numbers (NaN first), timestamps,
/// strings, bytes, references, geo points, arrays, maps.
fn compare_values(left: &FirestoreValue, right: &FirestoreValue) -> Ordering {
    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Ordering::Equal,
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a.cmp(b),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => a.cmp(b),
        (ValueKind::Double(a), ValueKind::Double(b)) => compare_doubles(*a, *b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => compare_doubles(*a as f64, *b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => compare_doubles(*a, *b as f64),
        (ValueKind::Timestamp(a), ValueKind::Timestamp(b)) => a.cmp(b),
        (ValueKind::String(a), ValueKind::String(b)) => a.cmp(b),
        (ValueKind::Bytes(a), ValueKind::Bytes(b)) => a.as_slice().cmp(b.as_slice()),
        (ValueKind::Reference(a), ValueKind::Reference(b)) => a.split('/').cmp(b.split('/')),
        (ValueKind::GeoPoint(a), ValueKind::GeoPoint(b)) => {
            compare_doubles(a.latitude(), b.latitude())
                .then_with(|| compare_doubles(a.longitude(), b.longitude()))
        }
        (ValueKind::Array(a), ValueKind::Array(b)) => compare_sequences(a.values(), b.values()),
        (ValueKind::Map(a), ValueKind::Map(b)) => {
            let mut left_entries = a.fields().iter();
            let mut right_entries = b.fields().iter();
            loop {
                match (left_entries.next(), right_entries.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some((left_key, left_value)), Some((right_key, right_value))) => {
                        let ordering = left_key
                            .cmp(right_key)
                            .then_with(|| compare_values(left_value, right_value));
                        if ordering != Ordering::Equal {
                            return ordering;
                        }
                    }
                }
            }
        }
        _ => type_order(left).cmp(&type_order(right)),
    }
}

fn compare_doubles(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

fn compare_sequences(left: &[FirestoreValue], right: &[FirestoreValue]) -> Ordering {
    left.iter()
        .zip(right)
        .map(|(a, b)| compare_values(a, b))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or_else(|| left.len().cmp(&right.len()))
}
