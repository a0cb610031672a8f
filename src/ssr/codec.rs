//! Transfer encoding for document data.
//!
//! Plain JSON types map directly (`null`, bools, integers, finite doubles,
//! strings, arrays, objects). Types JSON cannot express are written as tagged
//! objects carrying [`TYPE_TAG`]:
//!
//! | type | form |
//! |---|---|
//! | timestamp | `{"__type__": "timestamp", "value": "<RFC 3339, nanos>"}` |
//! | bytes | `{"__type__": "bytes", "value": "<base64>"}` |
//! | reference | `{"__type__": "reference", "value": "<document path>"}` |
//! | geo point | `{"__type__": "geopoint", "latitude": f64, "longitude": f64}` |
//!
//! Every value accepted by [`encode_fields`] decodes back to an equal value.
//! Non-finite doubles and maps that use the reserved tag key are rejected.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde_json::{Map, Number, Value as JsonValue};

use crate::firestore::api::DocumentData;
use crate::firestore::model::{GeoPoint, Timestamp};
use crate::firestore::value::{BytesValue, FirestoreValue, ValueKind};

pub type JsonObject = Map<String, JsonValue>;

/// Key marking an object as an encoded non-JSON type.
pub const TYPE_TAG: &str = "__type__";

const TIMESTAMP_TAG: &str = "timestamp";
const BYTES_TAG: &str = "bytes";
const REFERENCE_TAG: &str = "reference";
const GEO_POINT_TAG: &str = "geopoint";

/// A value that could not be encoded or decoded, with the field path where it sits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecError {
    field: String,
    message: String,
}

impl CodecError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "field '{}': {}", self.field, self.message)
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = Result<T, CodecError>;

pub fn encode_fields(fields: &DocumentData) -> CodecResult<JsonObject> {
    encode_map(fields, "")
}

pub fn decode_fields(object: &JsonObject) -> CodecResult<DocumentData> {
    if object.contains_key(TYPE_TAG) {
        return Err(CodecError::new("", "document data cannot be a tagged value"));
    }
    decode_map(object, "")
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn encode_map(fields: &BTreeMap<String, FirestoreValue>, path: &str) -> CodecResult<JsonObject> {
    let mut object = JsonObject::new();
    for (key, value) in fields {
        let field = child_path(path, key);
        if key == TYPE_TAG {
            return Err(CodecError::new(&field, "key is reserved by the transfer format"));
        }
        object.insert(key.clone(), encode_value(value, &field)?);
    }
    Ok(object)
}

fn tagged(tag: &str, entries: impl IntoIterator<Item = (&'static str, JsonValue)>) -> JsonValue {
    let mut object = JsonObject::new();
    object.insert(TYPE_TAG.to_string(), JsonValue::String(tag.to_string()));
    for (key, value) in entries {
        object.insert(key.to_string(), value);
    }
    JsonValue::Object(object)
}

fn encode_double(value: f64, path: &str) -> CodecResult<JsonValue> {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| CodecError::new(path, format!("{value} has no JSON representation")))
}

fn encode_value(value: &FirestoreValue, path: &str) -> CodecResult<JsonValue> {
    Ok(match value.kind() {
        ValueKind::Null => JsonValue::Null,
        ValueKind::Boolean(boolean) => JsonValue::Bool(*boolean),
        ValueKind::Integer(integer) => JsonValue::Number(Number::from(*integer)),
        ValueKind::Double(double) => encode_double(*double, path)?,
        ValueKind::String(string) => JsonValue::String(string.clone()),
        ValueKind::Timestamp(timestamp) => {
            let rendered = timestamp
                .to_rfc3339()
                .map_err(|err| CodecError::new(path, err.message()))?;
            tagged(TIMESTAMP_TAG, [("value", JsonValue::String(rendered))])
        }
        ValueKind::Bytes(bytes) => tagged(BYTES_TAG, [("value", JsonValue::String(bytes.to_base64()))]),
        ValueKind::Reference(reference) => {
            tagged(REFERENCE_TAG, [("value", JsonValue::String(reference.clone()))])
        }
        ValueKind::GeoPoint(point) => tagged(
            GEO_POINT_TAG,
            [
                ("latitude", encode_double(point.latitude(), path)?),
                ("longitude", encode_double(point.longitude(), path)?),
            ],
        ),
        ValueKind::Array(array) => JsonValue::Array(
            array
                .values()
                .iter()
                .enumerate()
                .map(|(index, element)| encode_value(element, &child_path(path, &index.to_string())))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        ValueKind::Map(map) => JsonValue::Object(encode_map(map.fields(), path)?),
    })
}

fn decode_map(object: &JsonObject, path: &str) -> CodecResult<BTreeMap<String, FirestoreValue>> {
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value, &child_path(path, key))?)))
        .collect()
}

fn decode_value(value: &JsonValue, path: &str) -> CodecResult<FirestoreValue> {
    Ok(match value {
        JsonValue::Null => FirestoreValue::null(),
        JsonValue::Bool(boolean) => FirestoreValue::from_bool(*boolean),
        JsonValue::Number(number) => {
            if let Some(integer) = number.as_i64() {
                FirestoreValue::from_integer(integer)
            } else if number.is_u64() {
                return Err(CodecError::new(path, "integer exceeds the 64-bit signed range"));
            } else {
                let double = number
                    .as_f64()
                    .ok_or_else(|| CodecError::new(path, "unreadable number"))?;
                FirestoreValue::from_double(double)
            }
        }
        JsonValue::String(string) => FirestoreValue::from_string(string.clone()),
        JsonValue::Array(values) => FirestoreValue::from_array(
            values
                .iter()
                .enumerate()
                .map(|(index, element)| decode_value(element, &child_path(path, &index.to_string())))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        JsonValue::Object(object) => match object.get(TYPE_TAG) {
            Some(tag) => decode_tagged(tag, object, path)?,
            None => FirestoreValue::from_map(decode_map(object, path)?),
        },
    })
}

fn string_entry<'a>(object: &'a JsonObject, key: &str, path: &str) -> CodecResult<&'a str> {
    object
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| CodecError::new(path, format!("tagged value is missing string '{key}'")))
}

fn number_entry(object: &JsonObject, key: &str, path: &str) -> CodecResult<f64> {
    object
        .get(key)
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| CodecError::new(path, format!("tagged value is missing number '{key}'")))
}

fn decode_tagged(tag: &JsonValue, object: &JsonObject, path: &str) -> CodecResult<FirestoreValue> {
    match tag.as_str() {
        Some(TIMESTAMP_TAG) => {
            let rendered = string_entry(object, "value", path)?;
            Timestamp::parse_rfc3339(rendered)
                .map(FirestoreValue::from_timestamp)
                .map_err(|err| CodecError::new(path, err.message()))
        }
        Some(BYTES_TAG) => BytesValue::from_base64(string_entry(object, "value", path)?)
            .map(FirestoreValue::from_bytes)
            .map_err(|err| CodecError::new(path, format!("invalid base64: {err}"))),
        Some(REFERENCE_TAG) => Ok(FirestoreValue::from_reference(string_entry(
            object, "value", path,
        )?)),
        Some(GEO_POINT_TAG) => GeoPoint::new(
            number_entry(object, "latitude", path)?,
            number_entry(object, "longitude", path)?,
        )
        .map(FirestoreValue::from_geo_point)
        .map_err(|err| CodecError::new(path, err.message())),
        _ => Err(CodecError::new(path, format!("unknown value tag {tag}"))),
    }
}
