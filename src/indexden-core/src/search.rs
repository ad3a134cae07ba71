use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ValidationError;

/// Admitted values per category, for one alternative of a category filter
pub type CategoryFilter = BTreeMap<String, Vec<String>>;

/// SearchOption carries a query and everything that tunes it
///
/// Only `q` is required. Unknown keys are ignored when an option set is
/// deserialized from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOption {
    pub q: String,
    /// First position to return, for paging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    /// How many results to return (service default: 10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
    /// Scoring function used to rank (service default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<u32>,
    /// Comma separated fields to fetch, `*` for all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_variables: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_categories: Option<bool>,
    /// Comma separated fields to snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_any_field: Option<bool>,
    /// Query variables, sent as `var<N>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<BTreeMap<u32, String>>,
    /// Ranges (`BOTTOM:TOP`, `*` for open ends) on function values, sent as `filter_function<N>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_function: Option<BTreeMap<u32, String>>,
    /// Ranges on document variables, sent as `filter_docvar<N>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_docvar: Option<BTreeMap<u32, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filters: Option<Vec<CategoryFilter>>,
}

impl SearchOption {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn start(mut self, start: u32) -> Self {
        self.start = Some(start);
        self
    }

    pub fn len(mut self, len: u32) -> Self {
        self.len = Some(len);
        self
    }

    pub fn function(mut self, function: u32) -> Self {
        self.function = Some(function);
        self
    }

    pub fn fetch(mut self, fields: impl Into<String>) -> Self {
        self.fetch = Some(fields.into());
        self
    }

    pub fn fetch_variables(mut self, enabled: bool) -> Self {
        self.fetch_variables = Some(enabled);
        self
    }

    pub fn fetch_categories(mut self, enabled: bool) -> Self {
        self.fetch_categories = Some(enabled);
        self
    }

    pub fn snippet(mut self, fields: impl Into<String>) -> Self {
        self.snippet = Some(fields.into());
        self
    }

    pub fn match_any_field(mut self, enabled: bool) -> Self {
        self.match_any_field = Some(enabled);
        self
    }

    pub fn var(mut self, index: u32, value: impl Into<String>) -> Self {
        self.var
            .get_or_insert_with(BTreeMap::new)
            .insert(index, value.into());
        self
    }

    pub fn filter_function(mut self, function: u32, ranges: impl Into<String>) -> Self {
        self.filter_function
            .get_or_insert_with(BTreeMap::new)
            .insert(function, ranges.into());
        self
    }

    pub fn filter_docvar(mut self, variable: u32, ranges: impl Into<String>) -> Self {
        self.filter_docvar
            .get_or_insert_with(BTreeMap::new)
            .insert(variable, ranges.into());
        self
    }

    pub fn category_filter(mut self, filter: CategoryFilter) -> Self {
        self.category_filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.q.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        Ok(())
    }
}

/// Total match count; the service reports it either as a number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchCount {
    Count(u64),
    Text(String),
}

impl MatchCount {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MatchCount::Count(n) => Some(*n),
            MatchCount::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// SearchResult is the response of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub matches: MatchCount,
    /// Per category value counts
    #[serde(default)]
    pub facets: HashMap<String, serde_json::Value>,
    /// Seconds spent searching
    #[serde(deserialize_with = "seconds::deserialize")]
    pub search_time: f64,
    pub results: Vec<Match>,
}

/// Match is one hit of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub docid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, serde_json::Value>,
    #[serde(default, alias = "categories", skip_serializing_if = "HashMap::is_empty")]
    pub category: HashMap<String, serde_json::Value>,
    /// Fetched fields, snippets and flat `variable_<N>` / `category_<NAME>` keys
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Match {
    /// Value of document variable `index`, nested or as `variable_<index>`
    pub fn variable(&self, index: u32) -> Option<&serde_json::Value> {
        self.variables
            .get(&index.to_string())
            .or_else(|| self.extra.get(&format!("variable_{}", index)))
    }

    /// Value of category `name`, nested or as `category_<name>`
    pub fn category(&self, name: &str) -> Option<&serde_json::Value> {
        self.category
            .get(name)
            .or_else(|| self.extra.get(&format!("category_{}", name)))
    }

    /// A fetched field or snippet returned alongside the docid
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(|v| v.as_str())
    }
}

/// Autocomplete asks for query suggestions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autocomplete {
    pub query: String,
    /// Field to take suggestions from (service default: `text`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Autocomplete {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            field: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Suggestions is the response of an autocomplete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
    /// Requested query, possibly normalized
    pub query: String,
}

mod seconds {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_map_options() {
        let opts = SearchOption::new("single")
            .filter_docvar(0, "10:20")
            .filter_docvar(3, "*:5")
            .var(1, "2.5");
        let docvar = opts.filter_docvar.as_ref().unwrap();
        assert_eq!(docvar.len(), 2);
        assert_eq!(docvar[&3], "*:5");
        assert_eq!(opts.var.as_ref().unwrap()[&1], "2.5");
        assert!(opts.filter_function.is_none());
    }

    #[test]
    fn test_empty_query_rejected() {
        assert_eq!(
            SearchOption::default().validate(),
            Err(ValidationError::MissingQuery)
        );
        assert!(SearchOption::new("q").validate().is_ok());
    }

    #[test]
    fn test_option_ignores_unknown_keys() {
        let opts: SearchOption =
            serde_json::from_str(r#"{"q": "single", "len": 5, "frobnicate": true}"#).unwrap();
        assert_eq!(opts, SearchOption::new("single").len(5));
    }

    #[test]
    fn test_option_requires_query() {
        assert!(serde_json::from_str::<SearchOption>(r#"{"len": 5}"#).is_err());
    }

    #[test]
    fn test_result_nested_category() {
        let json = r#"{
            "matches": 1,
            "facets": {"type": {"a certain type": 1}},
            "search_time": 0.004,
            "results": [
                {"docid": "mysingledoc", "category": {"type": "a certain type"}}
            ]
        }"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.matches.as_u64(), Some(1));
        assert_eq!(result.results.len(), 1);
        assert_eq!(
            result.results[0].category("type"),
            Some(&serde_json::json!("a certain type"))
        );
    }

    #[test]
    fn test_result_flat_keys_and_string_numbers() {
        let json = r#"{
            "matches": "2",
            "facets": {},
            "search_time": "0.013",
            "results": [
                {
                    "docid": "a",
                    "query_relevance_score": 1.5,
                    "variable_0": "1",
                    "category_type": "t",
                    "text": "a bit of text"
                },
                {"docid": "b", "categories": {"type": "u"}}
            ]
        }"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.matches.as_u64(), Some(2));
        assert!((result.search_time - 0.013).abs() < 1e-9);

        let first = &result.results[0];
        assert_eq!(first.query_relevance_score, Some(1.5));
        assert_eq!(first.variable(0), Some(&serde_json::json!("1")));
        assert_eq!(first.category("type"), Some(&serde_json::json!("t")));
        assert_eq!(first.field("text"), Some("a bit of text"));
        assert_eq!(first.variable(1), None);

        assert_eq!(
            result.results[1].category("type"),
            Some(&serde_json::json!("u"))
        );
    }

    #[test]
    fn test_result_wrong_shape_is_an_error() {
        let json = r#"{"matches": 0, "search_time": 0.1, "results": {"docid": "a"}}"#;
        assert!(serde_json::from_str::<SearchResult>(json).is_err());
    }
}
