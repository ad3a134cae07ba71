use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ValidationError;

/// Maximum length of a docid, in bytes
pub const MAX_DOCID_BYTES: usize = 1024;

/// Maximum combined length of all field values of a document, in bytes
pub const MAX_FIELDS_BYTES: usize = 100 * 1024;

/// Check an index name before it is placed in a request path
pub fn validate_index_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyIndexName);
    }
    if name.contains('/') {
        return Err(ValidationError::IndexNameSeparator(name.to_string()));
    }
    Ok(())
}

fn validate_docid(docid: &str) -> Result<(), ValidationError> {
    if docid.is_empty() {
        return Err(ValidationError::EmptyDocid);
    }
    if docid.len() > MAX_DOCID_BYTES {
        return Err(ValidationError::DocidTooLong(docid.len()));
    }
    Ok(())
}

/// DocumentIdentifier addresses a single indexed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdentifier {
    pub docid: String,
}

impl DocumentIdentifier {
    pub fn new(docid: impl Into<String>) -> Self {
        Self {
            docid: docid.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_docid(&self.docid)
    }
}

/// Document represents a record to be indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub docid: String,
    pub fields: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<u32, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<HashMap<String, String>>,
}

impl Document {
    /// Create a document whose `text` field holds the given content
    pub fn new(docid: impl Into<String>, text: impl Into<String>) -> Self {
        let mut fields = HashMap::new();
        fields.insert("text".to_string(), text.into());
        Self {
            docid: docid.into(),
            fields,
            variables: None,
            categories: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_variable(mut self, index: u32, value: f64) -> Self {
        self.variables
            .get_or_insert_with(BTreeMap::new)
            .insert(index, value);
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.categories
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn identifier(&self) -> DocumentIdentifier {
        DocumentIdentifier::new(self.docid.clone())
    }

    /// Enforce the docid and field size limits the service imposes
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_docid(&self.docid)?;
        let total: usize = self.fields.values().map(String::len).sum();
        if total > MAX_FIELDS_BYTES {
            return Err(ValidationError::FieldsTooLarge {
                docid: self.docid.clone(),
                size: total,
            });
        }
        Ok(())
    }
}

/// Variables update for one already indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    pub docid: String,
    pub variables: BTreeMap<u32, f64>,
}

impl Variables {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_docid(&self.docid)
    }
}

/// Categories update for one already indexed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    pub docid: String,
    pub categories: HashMap<String, String>,
}

impl Categories {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_docid(&self.docid)
    }
}

/// Promotion pins a document to the top of the result page for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub docid: String,
    pub query: String,
}

impl Promotion {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_docid(&self.docid)?;
        if self.query.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        Ok(())
    }
}

/// Outcome of indexing one document, positional within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedResult {
    pub added: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of removing one document, positional within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeindexedResult {
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// IndexMetadata describes one index of the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub started: bool,
    pub code: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub creation_time: NaiveDateTime,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub update_time: NaiveDateTime,
    pub size: u64,
    pub public_search: bool,
}

/// Metadata of every index, keyed by index name
pub type MetadataMap = BTreeMap<String, IndexMetadata>;

/// Metadata response, shaped by whether a single index was asked for
#[derive(Debug, Clone, PartialEq)]
pub enum IndexesMetadata {
    One(IndexMetadata),
    All(MetadataMap),
}

impl IndexesMetadata {
    pub fn into_one(self) -> Option<IndexMetadata> {
        match self {
            IndexesMetadata::One(meta) => Some(meta),
            IndexesMetadata::All(_) => None,
        }
    }

    pub fn into_all(self) -> Option<MetadataMap> {
        match self {
            IndexesMetadata::All(map) => Some(map),
            IndexesMetadata::One(_) => None,
        }
    }
}

/// ScoringFunction holds the formula of a scoring function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringFunction {
    pub definition: String,
}

impl ScoringFunction {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
        }
    }
}

/// Formulas of every scoring function of an index, keyed by function id
pub type FunctionMap = BTreeMap<u32, String>;

/// Request body of index creation
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndexSettings {
    pub public_search: bool,
}

mod timestamp {
    use super::*;

    /// Accepts `2010-01-01T12:00:00` as well as RFC 3339 with an offset (normalized to UTC)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc).naive_utc());
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(serde::de::Error::custom)
    }
}
