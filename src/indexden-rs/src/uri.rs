//! Request URI construction.
//!
//! Every operation URI is derived from one immutable endpoint anchored at the
//! versioned API root. Path segments are escaped one by one, and search
//! options are flattened into query pairs by [`search_query_pairs`].

use std::collections::BTreeMap;
use std::fmt::Display;

use indexden_core::{validate_index_name, Autocomplete, SearchOption, ValidationError};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Url;

use crate::{ClientError, Result};

/// Versioned root every operation path hangs off
pub const API_ROOT: &str = "/v1/indexes";

/// Escaped in query keys and values. `:`, `*` and `,` stay literal since
/// range filters are written with them.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// Builds escaped, canonical URIs below the API endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriBuilder {
    endpoint: Url,
}

impl UriBuilder {
    /// Derive the endpoint from a server base URL
    ///
    /// Any path, query or fragment on `server_url` is replaced by the API root.
    pub fn new(server_url: &str) -> Result<Self> {
        let base = Url::parse(server_url.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", server_url, e)))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{}: unsupported scheme {:?}",
                server_url,
                base.scheme()
            )));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(ClientError::InvalidUrl(format!(
                "{}: missing host",
                server_url
            )));
        }

        let endpoint = base
            .join(API_ROOT)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", server_url, e)))?;

        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Append `segments` to the endpoint, each escaped as a single path segment
    pub fn resolve(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.endpoint.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                if segment.is_empty() || segment.contains('/') {
                    return Err(ValidationError::InvalidSegment(segment.to_string()).into());
                }
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// URI of the index itself, or of the whole collection when `index` is `None`
    pub fn index_uri(&self, index: Option<&str>) -> Result<Url> {
        match index {
            Some(name) => {
                validate_index_name(name)?;
                self.resolve(&[name])
            }
            None => Ok(self.endpoint.clone()),
        }
    }

    /// URI of a path below a named index
    pub fn index_path(&self, index: &str, rest: &[&str]) -> Result<Url> {
        validate_index_name(index)?;
        let mut segments = Vec::with_capacity(rest.len() + 1);
        segments.push(index);
        segments.extend_from_slice(rest);
        self.resolve(&segments)
    }

    /// `/{index}/search?q=...` with every set option
    pub fn search_uri(&self, index: &str, options: &SearchOption) -> Result<Url> {
        options.validate()?;
        let mut url = self.index_path(index, &["search"])?;
        let pairs = search_query_pairs(options)?;
        url.set_query(Some(&encode_query(&pairs)));
        Ok(url)
    }

    /// `/{index}/autocomplete?query=...[&field=...]`
    pub fn autocomplete_uri(&self, index: &str, request: &Autocomplete) -> Result<Url> {
        if request.query.is_empty() {
            return Err(ValidationError::MissingQuery.into());
        }
        let mut url = self.index_path(index, &["autocomplete"])?;
        let mut pairs = vec![("query".to_string(), request.query.clone())];
        if let Some(field) = &request.field {
            pairs.push(("field".to_string(), field.clone()));
        }
        url.set_query(Some(&encode_query(&pairs)));
        Ok(url)
    }
}

/// Flatten search options into ordered query pairs
///
/// `q` always comes first, then scalar options, then one pair per entry of
/// the map options named `<option><key>` in ascending key order, then
/// `category_filters` as JSON. Unset options produce nothing. Values are
/// returned unescaped; see [`encode_query`].
pub fn search_query_pairs(options: &SearchOption) -> Result<Vec<(String, String)>> {
    let mut pairs = vec![("q".to_string(), options.q.clone())];

    scalar(&mut pairs, "start", options.start.as_ref());
    scalar(&mut pairs, "len", options.len.as_ref());
    scalar(&mut pairs, "function", options.function.as_ref());
    scalar(&mut pairs, "fetch", options.fetch.as_ref());
    scalar(&mut pairs, "fetch_variables", options.fetch_variables.as_ref());
    scalar(&mut pairs, "fetch_categories", options.fetch_categories.as_ref());
    scalar(&mut pairs, "snippet", options.snippet.as_ref());
    scalar(&mut pairs, "match_any_field", options.match_any_field.as_ref());

    keyed(&mut pairs, "var", options.var.as_ref());
    keyed(&mut pairs, "filter_docvar", options.filter_docvar.as_ref());
    keyed(&mut pairs, "filter_function", options.filter_function.as_ref());

    if let Some(filters) = &options.category_filters {
        let encoded = serde_json::to_string(filters).map_err(ClientError::Serialization)?;
        pairs.push(("category_filters".to_string(), encoded));
    }

    Ok(pairs)
}

/// Join pairs as `key=value&...`, escaping only what would break the pair structure
pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn scalar<T: Display>(pairs: &mut Vec<(String, String)>, key: &str, value: Option<&T>) {
    if let Some(value) = value {
        pairs.push((key.to_string(), value.to_string()));
    }
}

fn keyed(pairs: &mut Vec<(String, String)>, option: &str, map: Option<&BTreeMap<u32, String>>) {
    for (key, value) in map.into_iter().flatten() {
        pairs.push((format!("{}{}", option, key), value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use indexden_core::CategoryFilter;

    fn builder() -> UriBuilder {
        UriBuilder::new("http://host:9999").unwrap()
    }

    fn decoded(url: &Url) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_endpoint_ignores_trailing_slashes_and_paths() {
        for input in [
            "http://host:9999",
            "http://host:9999/",
            "http://host:9999//",
            "http://host:9999/some/path/",
            "  http://host:9999?x=1#frag ",
        ] {
            let b = UriBuilder::new(input).unwrap();
            assert_eq!(b.endpoint().as_str(), "http://host:9999/v1/indexes", "{}", input);
        }
    }

    #[test]
    fn test_malformed_url_fails_at_construction() {
        for input in ["", "not a url", "host:9999/x", "ftp://host", "mailto:a@b"] {
            let err = UriBuilder::new(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{}", input);
        }
    }

    #[test]
    fn test_resolve_appends_single_slash() {
        let b = builder();
        let url = b.resolve(&["test"]).unwrap();
        assert_eq!(url.path(), "/v1/indexes/test");
        assert_eq!(url.as_str(), "http://host:9999/v1/indexes/test");

        // Pure: repeated calls agree and leave the endpoint alone
        assert_eq!(b.resolve(&["test"]).unwrap(), url);
        assert_eq!(b.endpoint().path(), "/v1/indexes");
    }

    #[test]
    fn test_resolve_nested_paths() {
        let b = builder();
        assert_eq!(b.resolve(&[]).unwrap().path(), "/v1/indexes");
        assert_eq!(
            b.index_path("test", &["functions", "1"]).unwrap().path(),
            "/v1/indexes/test/functions/1"
        );
        assert_eq!(
            b.index_path("test", &["docs", "variables"]).unwrap().path(),
            "/v1/indexes/test/docs/variables"
        );
    }

    #[test]
    fn test_resolve_escapes_reserved_characters() {
        let b = builder();
        assert_eq!(
            b.resolve(&["my index"]).unwrap().path(),
            "/v1/indexes/my%20index"
        );
        let url = b.resolve(&["a?b#c"]).unwrap();
        assert_eq!(url.path(), "/v1/indexes/a%3Fb%23c");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_resolve_rejects_bad_segments() {
        let b = builder();
        for bad in ["", "a/b", "/"] {
            let err = b.resolve(&[bad]).unwrap_err();
            assert!(matches!(
                err,
                ClientError::Validation(ValidationError::InvalidSegment(_))
            ));
        }
    }

    #[test]
    fn test_index_uri_rules() {
        let b = builder();
        assert_eq!(b.index_uri(None).unwrap(), *b.endpoint());
        assert_eq!(b.index_uri(Some("test")).unwrap().path(), "/v1/indexes/test");
        assert!(matches!(
            b.index_uri(Some("")),
            Err(ClientError::Validation(ValidationError::EmptyIndexName))
        ));
        assert!(matches!(
            b.index_uri(Some("a/b")),
            Err(ClientError::Validation(ValidationError::IndexNameSeparator(_)))
        ));
    }

    #[test]
    fn test_search_uri_fetch_categories() {
        let url = builder()
            .search_uri("test", &SearchOption::new("single").fetch_categories(true))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:9999/v1/indexes/test/search?q=single&fetch_categories=true"
        );
    }

    #[test]
    fn test_query_comes_first() {
        let opts = SearchOption::new("first")
            .len(5)
            .start(10)
            .match_any_field(false)
            .filter_docvar(0, "1:2");
        let pairs = search_query_pairs(&opts).unwrap();
        assert_eq!(pairs[0], ("q".to_string(), "first".to_string()));
        assert!(pairs.contains(&("match_any_field".to_string(), "false".to_string())));
        assert!(pairs.contains(&("start".to_string(), "10".to_string())));
        assert!(pairs.contains(&("len".to_string(), "5".to_string())));
    }

    #[test]
    fn test_filter_docvar_one_pair_per_entry() {
        let opts = SearchOption::new("q")
            .filter_docvar(3, "*:5")
            .filter_docvar(0, "10:20");
        let url = builder().search_uri("test", &opts).unwrap();

        let docvars: Vec<(String, String)> = decoded(&url)
            .into_iter()
            .filter(|(k, _)| k.starts_with("filter_docvar"))
            .collect();
        assert_eq!(
            docvars,
            vec![
                ("filter_docvar0".to_string(), "10:20".to_string()),
                ("filter_docvar3".to_string(), "*:5".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_filters_stay_literal() {
        let opts = SearchOption::new("q")
            .filter_docvar(0, "10:20")
            .filter_docvar(3, "*:5")
            .filter_function(1, "0:*,5:10");
        let url = builder().search_uri("test", &opts).unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:9999/v1/indexes/test/search?q=q\
             &filter_docvar0=10:20&filter_docvar3=*:5&filter_function1=0:*,5:10"
        );
    }

    #[test]
    fn test_encode_query_escapes_pair_delimiters() {
        let pairs = vec![
            ("q".to_string(), "a&b=c d+e#f%".to_string()),
            ("fetch".to_string(), "title,text".to_string()),
        ];
        assert_eq!(
            encode_query(&pairs),
            "q=a%26b%3Dc%20d%2Be%23f%25&fetch=title,text"
        );
    }

    #[test]
    fn test_var_and_filter_function_keys() {
        let opts = SearchOption::new("q")
            .var(0, "1.5")
            .filter_function(2, "0:*,5:10");
        let pairs = search_query_pairs(&opts).unwrap();
        assert!(pairs.contains(&("var0".to_string(), "1.5".to_string())));
        assert!(pairs.contains(&("filter_function2".to_string(), "0:*,5:10".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k.starts_with("filter_docvar")));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = SearchOption::new("q")
            .fetch("*")
            .filter_function(1, "a")
            .filter_function(7, "b")
            .len(3)
            .snippet("text");
        let b = SearchOption::new("q")
            .snippet("text")
            .len(3)
            .filter_function(7, "b")
            .filter_function(1, "a")
            .fetch("*");

        let b_uri = builder();
        let ua = b_uri.search_uri("test", &a).unwrap();
        let ub = b_uri.search_uri("test", &b).unwrap();
        assert_eq!(decoded(&ua), decoded(&ub));
        assert_eq!(ua, ub);
    }

    #[test]
    fn test_category_filters_json_encoded() {
        let mut filter = CategoryFilter::new();
        filter.insert("type".to_string(), vec!["a".to_string(), "b".to_string()]);
        let opts = SearchOption::new("q").category_filter(filter);
        let pairs = search_query_pairs(&opts).unwrap();
        let (_, value) = pairs
            .iter()
            .find(|(k, _)| k == "category_filters")
            .unwrap();
        assert_eq!(value, r#"[{"type":["a","b"]}]"#);
    }

    #[test]
    fn test_query_text_survives_encoding() {
        let url = builder()
            .search_uri("test", &SearchOption::new("a&b=c d+e"))
            .unwrap();
        assert_eq!(
            decoded(&url),
            vec![("q".to_string(), "a&b=c d+e".to_string())]
        );
    }

    #[test]
    fn test_search_uri_rejects_locally() {
        let b = builder();
        let err = b.search_uri("test", &SearchOption::default()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingQuery)
        ));
        let err = b.search_uri("a/b", &SearchOption::new("q")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_autocomplete_uri() {
        let b = builder();
        let url = b
            .autocomplete_uri("test", &Autocomplete::new("bi"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:9999/v1/indexes/test/autocomplete?query=bi"
        );
        let url = b
            .autocomplete_uri("test", &Autocomplete::new("bi").field("title"))
            .unwrap();
        assert_eq!(url.query(), Some("query=bi&field=title"));
        assert!(b.autocomplete_uri("test", &Autocomplete::new("")).is_err());
    }
}
