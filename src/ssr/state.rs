use std::collections::btree_map::{BTreeMap, Iter};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::firestore::api::DocumentData;

use super::codec::{decode_fields, CodecResult, JsonObject};
use super::error::{SsrError, SsrResult};

/// Key of the payload inside the page props produced by [`Dehydrated::into_props`].
pub const DEHYDRATED_STATE_PROP: &str = "dehydratedState";

/// One prefetched result.
///
/// A document is an object, or `null` when the document does not exist. A
/// collection is an array of objects in query result order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DehydratedValue {
    Collection(Vec<JsonObject>),
    Document(Option<JsonObject>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DehydratedKind {
    Document,
    Collection,
}

impl DehydratedValue {
    pub fn kind(&self) -> DehydratedKind {
        match self {
            DehydratedValue::Document(_) => DehydratedKind::Document,
            DehydratedValue::Collection(_) => DehydratedKind::Collection,
        }
    }

    /// Decodes a document entry. Returns `None` for collection entries.
    pub fn decode_document(&self) -> Option<CodecResult<Option<DocumentData>>> {
        match self {
            DehydratedValue::Document(None) => Some(Ok(None)),
            DehydratedValue::Document(Some(object)) => Some(decode_fields(object).map(Some)),
            DehydratedValue::Collection(_) => None,
        }
    }

    /// Decodes a collection entry. Returns `None` for document entries.
    pub fn decode_collection(&self) -> Option<CodecResult<Vec<DocumentData>>> {
        match self {
            DehydratedValue::Collection(objects) => {
                Some(objects.iter().map(decode_fields).collect())
            }
            DehydratedValue::Document(_) => None,
        }
    }
}

/// Prefetched results keyed by query identifier.
///
/// Only dehydration and deserialization produce entries, so every key names
/// a value that was actually fetched on the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DehydratedState {
    entries: BTreeMap<String, DehydratedValue>,
}

impl DehydratedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: String, value: DehydratedValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&DehydratedValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, DehydratedValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_value(&self) -> SsrResult<JsonValue> {
        serde_json::to_value(self).map_err(|err| SsrError::invalid_payload(err.to_string()))
    }

    pub fn to_json_string(&self) -> SsrResult<String> {
        serde_json::to_string(self).map_err(|err| SsrError::invalid_payload(err.to_string()))
    }

    pub fn from_json_value(value: JsonValue) -> SsrResult<Self> {
        serde_json::from_value(value).map_err(|err| SsrError::invalid_payload(err.to_string()))
    }

    /// Parses a payload previously rendered with [`DehydratedState::to_json_string`].
    pub fn from_json_str(input: &str) -> SsrResult<Self> {
        serde_json::from_str(input).map_err(|err| SsrError::invalid_payload(err.to_string()))
    }
}

impl<'a> IntoIterator for &'a DehydratedState {
    type Item = (&'a String, &'a DehydratedValue);
    type IntoIter = Iter<'a, String, DehydratedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Result of a dehydration, shaped for merging into page props.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dehydrated {
    pub dehydrated_state: DehydratedState,
}

impl Dehydrated {
    pub fn into_state(self) -> DehydratedState {
        self.dehydrated_state
    }

    /// Merges the payload with the page's other props under `dehydratedState`.
    ///
    /// Fails if `extra` already uses that key.
    pub fn into_props(self, extra: JsonObject) -> SsrResult<JsonObject> {
        if extra.contains_key(DEHYDRATED_STATE_PROP) {
            return Err(SsrError::invalid_payload(format!(
                "page props already define '{DEHYDRATED_STATE_PROP}'"
            )));
        }
        let mut props = extra;
        props.insert(
            DEHYDRATED_STATE_PROP.to_string(),
            self.dehydrated_state.to_json_value()?,
        );
        Ok(props)
    }
}
