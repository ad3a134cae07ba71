use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::uri::UriBuilder;
use crate::{ClientError, Result};
use indexden_core::{
    Autocomplete, Categories, ClientConfig, Document, DocumentIdentifier, FunctionMap,
    IndexMetadata, IndexSettings, IndexesMetadata, MetadataMap, Promotion, ScoringFunction,
    SearchOption, SearchResult, Submission, Suggestions, Variables,
};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Indexden REST API Client
///
/// Every operation validates its input, issues exactly one request through the
/// transport and decodes the answer. Nothing is cached or retried.
pub struct Client<T: Transport = HttpTransport> {
    uris: UriBuilder,
    transport: T,
}

impl Client<HttpTransport> {
    /// Create a new client for the service at the given base URL
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_transport(server_url, HttpTransport::new())
    }

    /// Create a client with timeout, user agent and TLS settings from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::with_transport(&config.server_url, HttpTransport::from_config(config)?)
    }
}

impl<T: Transport> Client<T> {
    /// Create a client that sends its requests through `transport`
    pub fn with_transport(server_url: &str, transport: T) -> Result<Self> {
        Ok(Self {
            uris: UriBuilder::new(server_url)?,
            transport,
        })
    }

    pub fn uri_builder(&self) -> &UriBuilder {
        &self.uris
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Metadata of one index when `index` is given, of every index otherwise
    pub async fn get_indexes_metadata(&self, index: Option<&str>) -> Result<IndexesMetadata> {
        match index {
            Some(name) => Ok(IndexesMetadata::One(self.get_index_metadata(name).await?)),
            None => Ok(IndexesMetadata::All(self.get_all_indexes_metadata().await?)),
        }
    }

    /// Metadata of a single index
    #[tracing::instrument(skip(self))]
    pub async fn get_index_metadata(&self, index: &str) -> Result<IndexMetadata> {
        let uri = self.uris.index_uri(Some(index))?;
        self.fetch(Method::GET, uri, None).await
    }

    /// Metadata of every index in the account, keyed by index name
    #[tracing::instrument(skip(self))]
    pub async fn get_all_indexes_metadata(&self) -> Result<MetadataMap> {
        let uri = self.uris.index_uri(None)?;
        self.fetch(Method::GET, uri, None).await
    }

    /// Create an index, or update its settings if it exists
    #[tracing::instrument(skip(self))]
    pub async fn create_or_update_index(&self, index: &str, public_search: bool) -> Result<()> {
        let uri = self.uris.index_uri(Some(index))?;
        let body = encode(&IndexSettings { public_search })?;
        self.send(Method::PUT, uri, Some(body)).await
    }

    /// Delete an index and everything in it
    #[tracing::instrument(skip(self))]
    pub async fn delete_index(&self, index: &str) -> Result<()> {
        let uri = self.uris.index_uri(Some(index))?;
        self.send(Method::DELETE, uri, None).await
    }

    /// Add or replace documents
    ///
    /// A single [`Document`] yields a single [`IndexedResult`](indexden_core::IndexedResult);
    /// a slice or `Vec` yields one record per document, in submission order.
    #[tracing::instrument(skip(self, docs))]
    pub async fn index_docs<P>(&self, index: &str, docs: &P) -> Result<P::Output>
    where
        P: Submission<Item = Document> + ?Sized,
    {
        let uri = self.uris.index_path(index, &["docs"])?;
        for doc in docs.items() {
            doc.validate()?;
        }
        self.submit(Method::PUT, uri, docs).await
    }

    /// Remove documents
    ///
    /// Mirrors [`Client::index_docs`]: one identifier in, one
    /// [`DeindexedResult`](indexden_core::DeindexedResult) out.
    #[tracing::instrument(skip(self, ids))]
    pub async fn remove_docs_from_index<P>(&self, index: &str, ids: &P) -> Result<P::Output>
    where
        P: Submission<Item = DocumentIdentifier> + ?Sized,
    {
        let uri = self.uris.index_path(index, &["docs"])?;
        for id in ids.items() {
            id.validate()?;
        }
        self.submit(Method::DELETE, uri, ids).await
    }

    /// Set variables of an indexed document
    #[tracing::instrument(skip(self, variables), fields(docid = %variables.docid))]
    pub async fn create_or_update_variables(
        &self,
        index: &str,
        variables: &Variables,
    ) -> Result<()> {
        let uri = self.uris.index_path(index, &["docs", "variables"])?;
        variables.validate()?;
        self.send(Method::PUT, uri, Some(encode(variables)?)).await
    }

    /// Set categories of an indexed document
    #[tracing::instrument(skip(self, categories), fields(docid = %categories.docid))]
    pub async fn create_or_update_categories(
        &self,
        index: &str,
        categories: &Categories,
    ) -> Result<()> {
        let uri = self.uris.index_path(index, &["docs", "categories"])?;
        categories.validate()?;
        self.send(Method::PUT, uri, Some(encode(categories)?)).await
    }

    /// Formulas of all scoring functions of an index
    #[tracing::instrument(skip(self))]
    pub async fn get_all_scoring_functions(&self, index: &str) -> Result<FunctionMap> {
        let uri = self.uris.index_path(index, &["functions"])?;
        self.fetch(Method::GET, uri, None).await
    }

    /// Define (or redefine) scoring function `function_id`
    #[tracing::instrument(skip(self, function))]
    pub async fn define_scoring_function(
        &self,
        index: &str,
        function_id: u32,
        function: &ScoringFunction,
    ) -> Result<()> {
        let id = function_id.to_string();
        let uri = self.uris.index_path(index, &["functions", &id])?;
        self.send(Method::PUT, uri, Some(encode(function)?)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_scoring_function(&self, index: &str, function_id: u32) -> Result<()> {
        let id = function_id.to_string();
        let uri = self.uris.index_path(index, &["functions", &id])?;
        self.send(Method::DELETE, uri, None).await
    }

    /// Search an index
    #[tracing::instrument(skip(self, options), fields(q = %options.q))]
    pub async fn search(&self, index: &str, options: &SearchOption) -> Result<SearchResult> {
        let uri = self.uris.search_uri(index, options)?;
        self.fetch(Method::GET, uri, None).await
    }

    /// Delete every document matching a search
    #[tracing::instrument(skip(self, options), fields(q = %options.q))]
    pub async fn delete_search(&self, index: &str, options: &SearchOption) -> Result<()> {
        let uri = self.uris.search_uri(index, options)?;
        self.send(Method::DELETE, uri, None).await
    }

    /// Pin a document to the top of the results of a query
    #[tracing::instrument(skip(self, promotion), fields(docid = %promotion.docid))]
    pub async fn promote_result(&self, index: &str, promotion: &Promotion) -> Result<()> {
        let uri = self.uris.index_path(index, &["promote"])?;
        promotion.validate()?;
        self.send(Method::PUT, uri, Some(encode(promotion)?)).await
    }

    /// Query suggestions for a prefix
    #[tracing::instrument(skip(self, request), fields(query = %request.query))]
    pub async fn autocomplete(&self, index: &str, request: &Autocomplete) -> Result<Suggestions> {
        let uri = self.uris.autocomplete_uri(index, request)?;
        self.fetch(Method::GET, uri, None).await
    }

    async fn dispatch(
        &self,
        method: Method,
        uri: Url,
        body: Option<serde_json::Value>,
        expect_json: bool,
    ) -> Result<ApiResponse> {
        tracing::debug!(method = %method, uri = %uri, has_body = body.is_some(), "Sending request");
        self.transport
            .execute(ApiRequest {
                method,
                uri,
                body,
                expect_json,
            })
            .await
    }

    async fn send(&self, method: Method, uri: Url, body: Option<serde_json::Value>) -> Result<()> {
        self.dispatch(method, uri, body, false).await?;
        Ok(())
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        method: Method,
        uri: Url,
        body: Option<serde_json::Value>,
    ) -> Result<R> {
        match self.dispatch(method, uri, body, true).await? {
            ApiResponse::Json(value) => serde_json::from_value(value).map_err(ClientError::Decode),
            ApiResponse::Text(text) if text.trim().is_empty() => Err(
                ClientError::InvalidResponse("expected a JSON body, got none".to_string()),
            ),
            ApiResponse::Text(text) => serde_json::from_str(&text).map_err(ClientError::Decode),
        }
    }

    async fn submit<P: Submission + ?Sized>(
        &self,
        method: Method,
        uri: Url,
        payload: &P,
    ) -> Result<P::Output> {
        let output: P::Output = self.fetch(method, uri, Some(encode(payload)?)).await?;
        match (payload.batch_len(), P::output_len(&output)) {
            (Some(sent), Some(received)) if sent != received => {
                Err(ClientError::InvalidResponse(format!(
                    "submitted {} items, service returned {} results",
                    sent, received
                )))
            }
            _ => Ok(output),
        }
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(ClientError::Serialization)
}
