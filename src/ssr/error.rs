use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::firestore::error::FirestoreError;

pub type SsrResult<T> = Result<T, SsrError>;

#[derive(Clone, Debug, PartialEq)]
pub enum SsrError {
    /// A fetch issued during dehydration failed; the database error is kept as-is.
    Firestore(FirestoreError),
    /// Fetched data cannot be represented in the transfer format.
    Serialization {
        operation: &'static str,
        key: String,
        message: String,
    },
    DuplicateQueryKey { key: String },
    UnknownQueryKey { key: String },
    InvalidQueryKey { key: String, message: String },
    InvalidPayload { message: String },
}

impl SsrError {
    /// Error code string. Upstream failures report the database's own code.
    pub fn code_str(&self) -> &'static str {
        match self {
            SsrError::Firestore(err) => err.code_str(),
            SsrError::Serialization { .. } => "ssr/serialization-failed",
            SsrError::DuplicateQueryKey { .. } => "ssr/duplicate-query-key",
            SsrError::UnknownQueryKey { .. } => "ssr/unknown-query-key",
            SsrError::InvalidQueryKey { .. } => "ssr/invalid-query-key",
            SsrError::InvalidPayload { .. } => "ssr/invalid-payload",
        }
    }

    pub(crate) fn serialization(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SsrError::Serialization {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_payload(message: impl Into<String>) -> Self {
        SsrError::InvalidPayload {
            message: message.into(),
        }
    }
}

impl Display for SsrError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SsrError::Firestore(err) => write!(f, "{err}"),
            SsrError::Serialization {
                operation,
                key,
                message,
            } => write!(
                f,
                "{operation} could not serialize '{key}': {message} ({})",
                self.code_str()
            ),
            SsrError::DuplicateQueryKey { key } => {
                write!(f, "Query key '{key}' is used more than once ({})", self.code_str())
            }
            SsrError::UnknownQueryKey { key } => write!(
                f,
                "Query key '{key}' is not part of this session's key set ({})",
                self.code_str()
            ),
            SsrError::InvalidQueryKey { key, message } => {
                write!(f, "Invalid query key '{key}': {message} ({})", self.code_str())
            }
            SsrError::InvalidPayload { message } => {
                write!(f, "Invalid dehydrated payload: {message} ({})", self.code_str())
            }
        }
    }
}

impl Error for SsrError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SsrError::Firestore(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FirestoreError> for SsrError {
    fn from(err: FirestoreError) -> Self {
        SsrError::Firestore(err)
    }
}
