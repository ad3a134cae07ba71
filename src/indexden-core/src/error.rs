use crate::models::{MAX_DOCID_BYTES, MAX_FIELDS_BYTES};

/// Local rule violations, detected before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("index name must not be empty")]
    EmptyIndexName,

    #[error("index name must not contain '/': {0:?}")]
    IndexNameSeparator(String),

    #[error("docid must not be empty")]
    EmptyDocid,

    #[error("docid is {0} bytes long, limit is {max}", max = MAX_DOCID_BYTES)]
    DocidTooLong(usize),

    #[error("fields of document {docid:?} total {size} bytes, limit is {max}", max = MAX_FIELDS_BYTES)]
    FieldsTooLarge { docid: String, size: usize },

    #[error("query must not be empty")]
    MissingQuery,

    #[error("path segment {0:?} is empty or contains '/'")]
    InvalidSegment(String),
}
