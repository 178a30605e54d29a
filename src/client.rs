//! HTTP client for the retrieval backend.
//!
//! One [`RetrievalClient`] wraps a single configured `reqwest` client and
//! the backend base URL. Every public method is one remote operation and
//! issues exactly one outbound GET: no retries, no caching, no fan-out.
//! Required identifiers are checked before the request is built, so a
//! malformed call never reaches the network.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::BackendConfig;
use crate::error::{RelayError, Result};
use crate::models::{
    Corpus, Dataset, Document, Page, QrelRecord, Query, RelevantDocument, RelevantQuery,
    SearchHit, SearchOptions,
};
use crate::pagination;
use crate::params::QueryPairs;
use crate::validate::RagBundle;

/// Windowing and filter options shared by the list operations.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Restrict results to items matching this text.
    pub match_text: Option<String>,
    /// Backend-defined sort key; passed through opaquely.
    pub order_by: Option<String>,
    pub descending: bool,
    pub num_results: u64,
    pub offset: u64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            match_text: None,
            order_by: None,
            descending: true,
            num_results: 10,
            offset: 0,
        }
    }
}

impl ListOptions {
    /// Append the always-present window parameters.
    fn push_paging(&self, params: &mut QueryPairs) {
        params.push_num("num_results", self.num_results);
        params.push_num("offset", self.offset);
        params.push_bool("order_by_desc", self.descending);
    }

    /// Append the optional filters. The match key is direction-specific
    /// (`match`, `match_query`, or `match_document`).
    fn push_filters(&self, params: &mut QueryPairs, match_key: &str) {
        params.push_opt(match_key, self.match_text.as_deref());
        params.push_opt("order_by", self.order_by.as_deref());
    }
}

/// Client for the retrieval/RAG backend.
pub struct RetrievalClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RetrievalClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RelayError::InvalidParam {
            name: "backend.base_url",
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: ensure_trailing_slash(base_url),
        })
    }

    // ============ Catalog operations ============

    pub async fn available_languages(&self) -> Result<Vec<String>> {
        self.fetch_json("get_available_languages", &QueryPairs::new())
            .await
    }

    pub async fn search_options(&self) -> Result<SearchOptions> {
        self.fetch_json("get_search_options", &QueryPairs::new())
            .await
    }

    pub async fn corpora(&self) -> Result<Vec<Corpus>> {
        self.fetch_json("get_corpora", &QueryPairs::new()).await
    }

    pub async fn datasets(&self, corpus_name: &str) -> Result<Vec<Dataset>> {
        require("corpus_name", corpus_name)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        self.fetch_json("get_datasets", &params).await
    }

    // ============ Queries and documents ============

    pub async fn query(
        &self,
        corpus_name: &str,
        dataset_name: &str,
        query_id: &str,
    ) -> Result<Query> {
        require("corpus_name", corpus_name)?;
        require("dataset_name", dataset_name)?;
        require("query_id", query_id)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        params.push("dataset_name", dataset_name);
        params.push("query_id", query_id);
        self.fetch_json("get_query", &params).await
    }

    pub async fn queries(
        &self,
        corpus_name: &str,
        dataset_name: Option<&str>,
        options: &ListOptions,
    ) -> Result<Page<Query>> {
        require("corpus_name", corpus_name)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        options.push_paging(&mut params);
        params.push_opt("dataset_name", dataset_name);
        options.push_filters(&mut params, "match");
        self.fetch_json("get_queries", &params).await
    }

    pub async fn document(&self, corpus_name: &str, document_id: &str) -> Result<Document> {
        require("corpus_name", corpus_name)?;
        require("document_id", document_id)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        params.push("document_id", document_id);
        self.fetch_json("get_document", &params).await
    }

    pub async fn documents(
        &self,
        corpus_name: &str,
        options: &ListOptions,
    ) -> Result<Page<Document>> {
        require("corpus_name", corpus_name)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        options.push_paging(&mut params);
        options.push_filters(&mut params, "match");
        self.fetch_json("get_documents", &params).await
    }

    // ============ Search ============

    /// Full-text search over one or more corpora.
    ///
    /// Takes a 1-based page number and derives the item offset itself, so
    /// callers deal in pages while the wire deals in offsets. Hits arrive
    /// score-descending from the backend.
    pub async fn search(
        &self,
        q: &str,
        language: Option<&str>,
        corpus_names: &[String],
        num_results: u64,
        page: u64,
    ) -> Result<Page<SearchHit>> {
        require("q", q)?;
        let offset = pagination::offset_for_page(page, num_results);
        let mut params = QueryPairs::new();
        params.push("q", q);
        params.push_num("num_results", num_results);
        params.push_num("offset", offset);
        params.push_opt("language", language);
        params.push_all("corpus_name", corpus_names);
        self.fetch_json("search_documents", &params).await
    }

    // ============ Relevance judgments ============

    /// Queries judged relevant for a document, flattened from the raw
    /// judgment records. A record without `query_info` fails the call.
    pub async fn relevant_queries(
        &self,
        document_id: &str,
        corpus_name: &str,
        options: &ListOptions,
    ) -> Result<Page<RelevantQuery>> {
        require("document_id", document_id)?;
        require("corpus_name", corpus_name)?;
        let mut params = QueryPairs::new();
        params.push("document_id", document_id);
        params.push("corpus_name", corpus_name);
        options.push_paging(&mut params);
        options.push_filters(&mut params, "match_query");
        let page: Page<QrelRecord> = self.fetch_json("get_qrels", &params).await?;
        page.try_map(QrelRecord::into_relevant_query)
    }

    /// Documents judged relevant for a query. A record without
    /// `document_info` fails the call.
    pub async fn relevant_documents(
        &self,
        query_id: &str,
        dataset_name: &str,
        corpus_name: &str,
        options: &ListOptions,
    ) -> Result<Page<RelevantDocument>> {
        require("query_id", query_id)?;
        require("dataset_name", dataset_name)?;
        require("corpus_name", corpus_name)?;
        let mut params = QueryPairs::new();
        params.push("query_id", query_id);
        params.push("dataset_name", dataset_name);
        params.push("corpus_name", corpus_name);
        options.push_paging(&mut params);
        options.push_filters(&mut params, "match_document");
        let page: Page<QrelRecord> = self.fetch_json("get_qrels", &params).await?;
        page.try_map(QrelRecord::into_relevant_document)
    }

    // ============ Generation ============

    /// Generate a RAG answer over the bundle's documents.
    ///
    /// The corpus and document lists are sent as parallel repeated keys;
    /// the backend pairs them up by position. The answer body is buffered
    /// into a single string.
    pub async fn answer(&self, bundle: &RagBundle) -> Result<String> {
        let mut params = QueryPairs::new();
        params.push("model_name", bundle.model_name());
        params.push("q", bundle.query());
        params.push_all("corpus_name", bundle.corpus_names());
        params.push_all("document_id", bundle.document_ids());
        self.fetch_text("get_answer", &params).await
    }

    /// Generate a model summary of a single document. The backend names
    /// the model parameter `model` here, unlike `get_answer`.
    pub async fn document_summary(
        &self,
        corpus_name: &str,
        document_id: &str,
        model_name: &str,
    ) -> Result<String> {
        require("corpus_name", corpus_name)?;
        require("document_id", document_id)?;
        require("model_name", model_name)?;
        let mut params = QueryPairs::new();
        params.push("corpus_name", corpus_name);
        params.push("document_id", document_id);
        params.push("model", model_name);
        self.fetch_text("get_document_summary", &params).await
    }

    // ============ Transport ============

    async fn fetch_json<T: DeserializeOwned>(&self, op: &str, params: &QueryPairs) -> Result<T> {
        let response = self.send(op, params).await?;
        match response.json::<T>().await {
            Ok(value) => Ok(value),
            Err(e) if e.is_decode() => Err(RelayError::UnexpectedShape(e.to_string())),
            Err(e) => Err(RelayError::Transport(e)),
        }
    }

    async fn fetch_text(&self, op: &str, params: &QueryPairs) -> Result<String> {
        let response = self.send(op, params).await?;
        Ok(response.text().await?)
    }

    /// Issue the single GET for an operation and surface non-success
    /// statuses as [`RelayError::Upstream`] with the body passed through.
    async fn send(&self, op: &str, params: &QueryPairs) -> Result<reqwest::Response> {
        tracing::debug!(op, query = %params.encode(), "backend request");
        let mut request = self.http.get(self.op_url(op));
        if !params.is_empty() {
            request = request.query(params.as_slice());
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RelayError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    fn op_url(&self, op: &str) -> String {
        format!("{}{}", self.base_url, op)
    }
}

/// Pre-network check for required identifiers: absent-or-blank fails.
fn require(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RelayError::MissingParam(name));
    }
    Ok(())
}

/// Normalize the base URL so joining an operation name appends a path
/// segment instead of replacing the last one.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
