use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use crate::firestore::api::{DocumentReference, Query};

use super::error::{SsrError, SsrResult};
use super::registry::QueryKey;
use super::state::DehydratedState;

/// Decides the identifier each prefetched result is stored under.
///
/// The server and client sides of a session must use the same addressing so
/// that a hydrated accessor finds the entry its dehydrated counterpart wrote.
pub trait QueryAddressing: Clone + Send + Sync + 'static {
    /// Caller-supplied key; `()` when identifiers derive from the target itself.
    type Key: Clone + Send + Sync + 'static;

    fn document_id(&self, reference: &DocumentReference, key: &Self::Key) -> String;

    fn query_id(&self, query: &Query, key: &Self::Key) -> String;

    /// Rejects payloads this addressing could not have produced.
    fn validate_state(&self, state: &DehydratedState) -> SsrResult<()>;
}

/// Identifies documents by full path and queries by collection path.
///
/// Two queries over the same collection share an identifier, so a single
/// request may prefetch at most one of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathAddressing;

impl QueryAddressing for PathAddressing {
    type Key = ();

    fn document_id(&self, reference: &DocumentReference, _key: &()) -> String {
        reference.path().canonical_string()
    }

    fn query_id(&self, query: &Query, _key: &()) -> String {
        query.collection_path().canonical_string()
    }

    fn validate_state(&self, _state: &DehydratedState) -> SsrResult<()> {
        Ok(())
    }
}

/// Identifies results by keys drawn from the closed set `K`.
pub struct RegistryAddressing<K> {
    _keys: PhantomData<fn() -> K>,
}

impl<K> RegistryAddressing<K> {
    pub fn new() -> Self {
        Self { _keys: PhantomData }
    }
}

impl<K> Default for RegistryAddressing<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for RegistryAddressing<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for RegistryAddressing<K> {}

impl<K> Debug for RegistryAddressing<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegistryAddressing<{}>", std::any::type_name::<K>())
    }
}

impl<K: QueryKey> QueryAddressing for RegistryAddressing<K> {
    type Key = K;

    fn document_id(&self, _reference: &DocumentReference, key: &K) -> String {
        key.as_str().to_string()
    }

    fn query_id(&self, _query: &Query, key: &K) -> String {
        key.as_str().to_string()
    }

    fn validate_state(&self, state: &DehydratedState) -> SsrResult<()> {
        match state.keys().find(|key| K::from_key(key).is_none()) {
            Some(unknown) => Err(SsrError::UnknownQueryKey {
                key: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }
}
