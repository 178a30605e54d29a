//! HTTP gateway for corpus browsing and search.
//!
//! Exposes the retrieval backend to browsers and frontends as a JSON API
//! with validated parameters, stable pagination, and navigation links.
//! Every handler performs at most the backend calls its page needs; there
//! is no caching and no retrying here.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (returns version) |
//! | `GET` | `/api/options` | Backend search options plus configured display defaults |
//! | `GET` | `/api/languages` | Supported query languages |
//! | `GET` | `/api/browse` | All corpora |
//! | `GET` | `/api/browse/{corpus}` | Datasets of a corpus, or one document via `?document_id=` |
//! | `GET` | `/api/browse/{corpus}/{dataset}` | Queries of a dataset, `p`-paginated |
//! | `GET` | `/api/search` | Search page with prev/next links |
//! | `GET` | `/api/documents` | Documents of a corpus (windowed) |
//! | `GET` | `/api/queries` | Queries of a corpus (windowed) |
//! | `GET` | `/api/relevant_queries` | Queries relevant to a document |
//! | `GET` | `/api/relevant_documents` | Documents relevant to a query |
//! | `GET` | `/api/rag` | RAG answer over selected documents (plain text) |
//! | `GET` | `/api/document_summary` | Model summary of one document (plain text) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "missing required parameter: corpus_name" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream` (backend status passed
//! through), `timeout` (504), `bad_gateway` (502).
//!
//! # Redirects
//!
//! A page number past the last page of a non-empty result set is answered
//! with `307` to the canonical fallback: the application root for search,
//! the unpaginated dataset root for dataset browsing. An empty result set
//! is a normal 200 page with no navigation links.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends
//! can call the gateway directly.

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::client::{ListOptions, RetrievalClient};
use crate::config::Config;
use crate::error::RelayError;
use crate::models::{
    Corpus, Dataset, Document, Page, Query, RelevantDocument, RelevantQuery, SearchHit,
    SearchOptions,
};
use crate::pagination::{self, PageView};
use crate::params::QueryPairs;
use crate::validate::{self, Bounds};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Application configuration (wrapped in `Arc` for cheap cloning across handlers).
    config: Arc<Config>,
    /// The one backend client; all handlers share its connection pool.
    client: Arc<RetrievalClient>,
    /// Validation table derived from the configuration at startup.
    bounds: Bounds,
}

/// Starts the gateway HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated. This is the entry point of `crelay serve`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let client = RetrievalClient::new(&config.backend)?;
    let bounds = Bounds::new(&config.pagination, &config.rag);
    let state = AppState {
        config: Arc::new(config.clone()),
        client: Arc::new(client),
        bounds,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/options", get(handle_options))
        .route("/api/languages", get(handle_languages))
        .route("/api/browse", get(handle_browse))
        .route("/api/browse/{corpus}", get(handle_browse_corpus))
        .route("/api/browse/{corpus}/{dataset}", get(handle_browse_dataset))
        .route("/api/search", get(handle_search))
        .route("/api/documents", get(handle_documents))
        .route("/api/queries", get(handle_queries))
        .route("/api/relevant_queries", get(handle_relevant_queries))
        .route("/api/relevant_documents", get(handle_relevant_documents))
        .route("/api/rag", get(handle_rag))
        .route("/api/document_summary", get(handle_document_summary))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(
        "gateway listening on http://{} (backend: {})",
        bind_addr,
        config.backend.base_url
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_client_error() => bad_request(e.to_string()),
            RelayError::Upstream { status, message: body } => AppError {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                code: "upstream".to_string(),
                // the backend's words, not ours
                message: body,
            },
            RelayError::Transport(e) if e.is_timeout() => AppError {
                status: StatusCode::GATEWAY_TIMEOUT,
                code: "timeout".to_string(),
                message,
            },
            _ => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "bad_gateway".to_string(),
                message,
            },
        }
    }
}

// ============ Request helpers ============

/// Decode the raw query string into ordered pairs.
fn query_pairs(raw: Option<&str>) -> QueryPairs {
    QueryPairs::from_query(raw.unwrap_or(""))
}

/// Windowing options for the list endpoints, resolved against the bound
/// table. An oversized explicit `num_results` fails here, before any
/// backend call.
fn list_options(bounds: &Bounds, params: &QueryPairs) -> Result<ListOptions, AppError> {
    Ok(ListOptions {
        match_text: params.first("match").map(str::to_string),
        order_by: params.first("order_by").map(str::to_string),
        descending: validate::order_desc(params.first("desc")),
        num_results: bounds.num_results(params.first("num_results"))?,
        offset: bounds.offset(params.first("offset")),
    })
}

/// Reconstruct the absolute request URL for link building.
fn request_url(headers: &HeaderMap, uri: &Uri) -> Result<Url, AppError> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("127.0.0.1");
    Url::parse(&format!("http://{host}{uri}"))
        .map_err(|e| bad_request(format!("cannot reconstruct request URL: {e}")))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/options, /api/languages ============

/// JSON response body for `GET /api/options`.
#[derive(Serialize)]
struct OptionsResponse {
    /// What the backend can search: languages, corpora, models.
    options: SearchOptions,
    /// The gateway's configured display defaults.
    defaults: DisplayDefaults,
}

#[derive(Serialize)]
struct DisplayDefaults {
    language: String,
    snippet_length: usize,
    items_per_page: u64,
    search_results_per_page: u64,
}

/// Handler for `GET /api/options`.
///
/// Combines the backend's advertised search options with the display
/// defaults from configuration, so a frontend needs a single call to
/// populate its controls.
async fn handle_options(State(state): State<AppState>) -> Result<Json<OptionsResponse>, AppError> {
    let options = state.client.search_options().await?;
    Ok(Json(OptionsResponse {
        options,
        defaults: DisplayDefaults {
            language: state.config.display.language.clone(),
            snippet_length: state.config.display.snippet_length,
            items_per_page: state.config.pagination.items_per_page,
            search_results_per_page: state.config.pagination.search_results_per_page,
        },
    }))
}

/// Handler for `GET /api/languages`.
async fn handle_languages(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.client.available_languages().await?))
}

// ============ GET /api/browse ============

/// JSON response body for `GET /api/browse`.
#[derive(Serialize)]
struct CorporaResponse {
    corpora: Vec<Corpus>,
}

/// Handler for `GET /api/browse`: all corpora with their counts.
async fn handle_browse(State(state): State<AppState>) -> Result<Json<CorporaResponse>, AppError> {
    Ok(Json(CorporaResponse {
        corpora: state.client.corpora().await?,
    }))
}

// ============ GET /api/browse/{corpus} ============

#[derive(Serialize)]
struct DatasetsResponse {
    datasets: Vec<Dataset>,
}

#[derive(Serialize)]
struct DocumentResponse {
    document: Document,
}

/// Handler for `GET /api/browse/{corpus}`.
///
/// With a `document_id` parameter this returns exactly that document and
/// nothing else; without one it returns the corpus's datasets. The two
/// modes are mutually exclusive, so only one backend call is made.
async fn handle_browse_corpus(
    State(state): State<AppState>,
    Path(corpus): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response, AppError> {
    let params = query_pairs(raw.as_deref());

    if let Some(document_id) = params.first("document_id") {
        let document = state.client.document(&corpus, document_id).await?;
        return Ok(Json(DocumentResponse { document }).into_response());
    }

    let datasets = state.client.datasets(&corpus).await?;
    Ok(Json(DatasetsResponse { datasets }).into_response())
}

// ============ GET /api/browse/{corpus}/{dataset} ============

/// JSON response body for a paginated query listing.
#[derive(Serialize)]
struct QueryPageResponse {
    queries: Page<Query>,
    page_num: u64,
    total_pages: u64,
    prev_page_link: Option<String>,
    next_page_link: Option<String>,
}

/// Handler for `GET /api/browse/{corpus}/{dataset}`.
///
/// Lists the dataset's queries one page at a time (`p` parameter, page
/// size `pagination.items_per_page`). Past the last page the client is
/// redirected to the dataset root instead of an empty page.
async fn handle_browse_dataset(
    State(state): State<AppState>,
    Path((corpus, dataset)): Path<(String, String)>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(raw): RawQuery,
) -> Result<Response, AppError> {
    let params = query_pairs(raw.as_deref());
    let page_num = state.bounds.page(params.first("p"));
    let page_size = state.config.pagination.items_per_page;

    let options = ListOptions {
        num_results: page_size,
        offset: pagination::offset_for_page(page_num, page_size),
        ..ListOptions::default()
    };
    let queries = state
        .client
        .queries(&corpus, Some(&dataset), &options)
        .await?;

    let current = request_url(&headers, &uri)?;
    match pagination::resolve(page_num, queries.total_items, page_size, &current, "p") {
        PageView::Ready(nav) => Ok(Json(QueryPageResponse {
            queries,
            page_num: nav.page,
            total_pages: nav.total_pages,
            prev_page_link: nav.prev.map(|u| u.to_string()),
            next_page_link: nav.next.map(|u| u.to_string()),
        })
        .into_response()),
        PageView::OutOfRange { .. } => {
            let mut root = current;
            root.set_query(None);
            Ok(Redirect::temporary(root.as_str()).into_response())
        }
    }
}

// ============ GET /api/search ============

/// JSON response body for `GET /api/search`.
#[derive(Serialize)]
struct SearchPageResponse {
    result: Page<SearchHit>,
    page_num: u64,
    total_pages: u64,
    prev_page_link: Option<String>,
    next_page_link: Option<String>,
}

/// Handler for `GET /api/search`.
///
/// Parameters: `q` (required), `p` (page number), `language`, and any
/// number of `corpus` filters. A blank `q` redirects to the application
/// root. An unsupported `language` is silently dropped. The page size is
/// fixed at `pagination.search_results_per_page`; prev/next links rewrite
/// only `p` and keep the rest of the query string intact.
async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(raw): RawQuery,
) -> Result<Response, AppError> {
    let params = query_pairs(raw.as_deref());

    let q = params.first("q").map(str::trim).unwrap_or("");
    if q.is_empty() {
        return Ok(Redirect::temporary("/").into_response());
    }

    let corpus_names: Vec<String> = params
        .all("corpus")
        .iter()
        .map(|s| s.to_string())
        .collect();

    let language = match params.first("language") {
        Some(requested) => {
            let available = state.client.available_languages().await?;
            validate::language(Some(requested), &available).map(str::to_string)
        }
        None => None,
    };

    let page_num = state.bounds.page(params.first("p"));
    let per_page = state.config.pagination.search_results_per_page;
    let result = state
        .client
        .search(q, language.as_deref(), &corpus_names, per_page, page_num)
        .await?;

    let current = request_url(&headers, &uri)?;
    match pagination::resolve(page_num, result.total_items, per_page, &current, "p") {
        PageView::Ready(nav) => Ok(Json(SearchPageResponse {
            result,
            page_num: nav.page,
            total_pages: nav.total_pages,
            prev_page_link: nav.prev.map(|u| u.to_string()),
            next_page_link: nav.next.map(|u| u.to_string()),
        })
        .into_response()),
        PageView::OutOfRange { .. } => Ok(Redirect::temporary("/").into_response()),
    }
}

// ============ GET /api/documents, /api/queries ============

/// Handler for `GET /api/documents`.
///
/// Windowed document listing for a corpus. `corpus_name` is required;
/// `match`, `order_by`, `desc`, `num_results`, and `offset` follow the
/// bound table.
async fn handle_documents(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<Document>>, AppError> {
    let params = query_pairs(raw.as_deref());
    let corpus_name = params.require("corpus_name")?;
    let options = list_options(&state.bounds, &params)?;
    Ok(Json(state.client.documents(corpus_name, &options).await?))
}

/// Handler for `GET /api/queries`.
///
/// Windowed query listing for a corpus, optionally restricted to one
/// dataset. Same parameter conventions as `/api/documents`.
async fn handle_queries(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<Query>>, AppError> {
    let params = query_pairs(raw.as_deref());
    let corpus_name = params.require("corpus_name")?;
    let options = list_options(&state.bounds, &params)?;
    Ok(Json(
        state
            .client
            .queries(corpus_name, params.first("dataset_name"), &options)
            .await?,
    ))
}

// ============ GET /api/relevant_queries, /api/relevant_documents ============

/// Handler for `GET /api/relevant_queries`.
///
/// Queries judged relevant for a document (`document_id` + `corpus_name`
/// required), flattened from the backend's judgment records.
async fn handle_relevant_queries(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<RelevantQuery>>, AppError> {
    let params = query_pairs(raw.as_deref());
    let document_id = params.require("document_id")?;
    let corpus_name = params.require("corpus_name")?;
    let options = list_options(&state.bounds, &params)?;
    Ok(Json(
        state
            .client
            .relevant_queries(document_id, corpus_name, &options)
            .await?,
    ))
}

/// Handler for `GET /api/relevant_documents`.
///
/// Documents judged relevant for a query (`query_id` + `dataset_name` +
/// `corpus_name` required).
async fn handle_relevant_documents(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<RelevantDocument>>, AppError> {
    let params = query_pairs(raw.as_deref());
    let query_id = params.require("query_id")?;
    let dataset_name = params.require("dataset_name")?;
    let corpus_name = params.require("corpus_name")?;
    let options = list_options(&state.bounds, &params)?;
    Ok(Json(
        state
            .client
            .relevant_documents(query_id, dataset_name, corpus_name, &options)
            .await?,
    ))
}

// ============ GET /api/rag, /api/document_summary ============

/// Handler for `GET /api/rag`.
///
/// Generates a RAG answer over explicitly selected documents. The
/// `corpus_name` and `document_id` lists must pair up; the bundle is
/// validated before the backend is contacted. Responds with plain text.
async fn handle_rag(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<String, AppError> {
    let params = query_pairs(raw.as_deref());
    let corpus_names: Vec<String> = params
        .all("corpus_name")
        .iter()
        .map(|s| s.to_string())
        .collect();
    let document_ids: Vec<String> = params
        .all("document_id")
        .iter()
        .map(|s| s.to_string())
        .collect();
    let bundle = state.bounds.rag_bundle(
        params.first("model_name").unwrap_or(""),
        params.first("q").unwrap_or(""),
        corpus_names,
        document_ids,
    )?;
    Ok(state.client.answer(&bundle).await?)
}

/// Handler for `GET /api/document_summary`.
///
/// Plain-text model summary of one document. Required parameters are
/// checked by the client before any network traffic.
async fn handle_document_summary(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<String, AppError> {
    let params = query_pairs(raw.as_deref());
    Ok(state
        .client
        .document_summary(
            params.first("corpus_name").unwrap_or(""),
            params.first("document_id").unwrap_or(""),
            params.first("model_name").unwrap_or(""),
        )
        .await?)
}

// ============ Error mapping tests ============
