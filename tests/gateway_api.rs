//! End-to-end tests for the gateway HTTP server.
//!
//! Each test starts a stub retrieval backend and a real gateway on free
//! ports, then drives the gateway with a plain HTTP client. The stub
//! records every request it receives, so tests can assert both the
//! gateway's responses and the exact query strings sent upstream.

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use corpus_relay::config::Config;
use corpus_relay::server::run_server;

// ─── Stub backend ───────────────────────────────────────────────────

/// In-memory retrieval backend standing in for the real service.
#[derive(Clone, Default)]
struct StubBackend {
    /// Every (operation, raw query string) the gateway sent, oldest first.
    seen: Arc<Mutex<Vec<(String, String)>>>,
    /// Total reported by `search_documents`.
    search_total: Arc<AtomicU64>,
    /// Total reported by `get_queries`.
    queries_total: Arc<AtomicU64>,
    /// When set, every operation answers with this status and body.
    fail: Arc<Mutex<Option<(u16, String)>>>,
}

fn param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Build a paginated body honoring the request's window, like the real
/// backend would.
fn page_body(total: u64, query: &str, make: impl Fn(u64) -> Value) -> Value {
    let offset: u64 = param(query, "offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let num: u64 = param(query, "num_results")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let count = num.min(total.saturating_sub(offset));
    let items: Vec<Value> = (0..count).map(|i| make(offset + i)).collect();
    json!({ "total_num_items": total, "offset": offset, "items": items })
}

async fn stub_handler(State(stub): State<StubBackend>, uri: Uri) -> Response {
    let op = uri.path().trim_start_matches('/').to_string();
    let query = uri.query().unwrap_or("").to_string();
    stub.seen.lock().unwrap().push((op.clone(), query.clone()));

    if let Some((status, body)) = stub.fail.lock().unwrap().clone() {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, body).into_response();
    }

    match op.as_str() {
        "get_available_languages" => Json(json!(["English", "German"])).into_response(),
        "get_search_options" => Json(json!({
            "query_languages": ["English", "German"],
            "corpus_names": ["wiki", "news"],
            "model_names": ["tiny-model"],
        }))
        .into_response(),
        "get_corpora" => Json(json!([
            { "name": "wiki", "language": "English", "num_datasets": 2, "num_documents": 4200 },
            { "name": "news", "language": "German", "num_datasets": 1, "num_documents": 180 },
        ]))
        .into_response(),
        "get_datasets" => Json(json!([
            { "name": "dev", "corpus_name": "wiki", "min_relevance": 1, "num_queries": 12 },
        ]))
        .into_response(),
        "get_document" => Json(json!({
            "id": "D1", "title": "Alpha", "text": "Alpha document text.",
            "corpus_name": "wiki", "num_relevant_queries": 2,
        }))
        .into_response(),
        "get_documents" => {
            let body = page_body(3, &query, |i| {
                json!({
                    "id": format!("D{i}"), "title": null, "text": "document text",
                    "corpus_name": "wiki", "num_relevant_queries": 0,
                })
            });
            Json(body).into_response()
        }
        "get_queries" => {
            let total = stub.queries_total.load(Ordering::SeqCst);
            let body = page_body(total, &query, |i| {
                json!({
                    "id": format!("q{i}"), "text": format!("query {i}"), "description": null,
                    "corpus_name": "wiki", "dataset_name": "dev", "num_relevant_documents": 3,
                })
            });
            Json(body).into_response()
        }
        "search_documents" => {
            let total = stub.search_total.load(Ordering::SeqCst);
            let body = page_body(total, &query, |i| {
                json!({
                    "id": format!("D{i}"), "title": format!("Hit {i}"), "snippet": "a snippet",
                    "score": 10.0 - i as f64, "corpus_name": "wiki",
                })
            });
            Json(body).into_response()
        }
        "get_qrels" => {
            // a document_id marks the "queries for a document" direction
            let item = if param(&query, "document_id").is_some() {
                json!({
                    "query_info": { "id": "q7", "text": "alpha?", "description": null },
                    "relevance": 2, "corpus_name": "wiki", "dataset_name": "dev",
                })
            } else {
                json!({
                    "document_info": { "id": "D9", "title": "Beta", "text": "Beta text." },
                    "relevance": 1, "corpus_name": "wiki", "dataset_name": "dev",
                })
            };
            Json(json!({ "total_num_items": 1, "offset": 0, "items": [item] })).into_response()
        }
        "get_answer" => "grounded answer".into_response(),
        "get_document_summary" => "short summary".into_response(),
        _ => (StatusCode::NOT_FOUND, format!("unknown operation: {op}")).into_response(),
    }
}

// ─── Harness ────────────────────────────────────────────────────────

struct Harness {
    base: String,
    stub: StubBackend,
    gateway: tokio::task::JoinHandle<()>,
    backend: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    fn backend_calls(&self) -> Vec<(String, String)> {
        self.stub.seen.lock().unwrap().clone()
    }

    fn last_backend_call(&self) -> (String, String) {
        self.backend_calls()
            .last()
            .cloned()
            .expect("no backend call recorded")
    }

    fn stop(&self) {
        self.gateway.abort();
        self.backend.abort();
    }
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(backend_port: u16, gateway_port: u16) -> Config {
    let config_content = format!(
        r#"
[backend]
base_url = "http://127.0.0.1:{}"
timeout_secs = 5

[server]
bind = "127.0.0.1:{}"

[pagination]
items_per_page = 5
max_items_per_page = 20
search_results_per_page = 5
max_search_pages = 100

[rag]
max_documents = 2
"#,
        backend_port, gateway_port
    );
    toml::from_str(&config_content).unwrap()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_harness() -> Harness {
    let stub = StubBackend::default();
    stub.search_total.store(12, Ordering::SeqCst);
    stub.queries_total.store(12, Ordering::SeqCst);

    let backend_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_port = backend_listener.local_addr().unwrap().port();
    let app = Router::new()
        .fallback(stub_handler)
        .with_state(stub.clone());
    let backend = tokio::spawn(async move {
        axum::serve(backend_listener, app).await.ok();
    });

    let gateway_port = find_free_port();
    let cfg = test_config(backend_port, gateway_port);
    let gateway = tokio::spawn(async move {
        run_server(&cfg).await.ok();
    });
    wait_for_server(gateway_port).await;

    Harness {
        base: format!("http://127.0.0.1:{}", gateway_port),
        stub,
        gateway,
        backend,
    }
}

/// A client that surfaces redirects instead of following them.
fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

/// Prove that the health endpoint reports the crate version.
#[tokio::test]
async fn test_health_reports_version() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    h.stop();
}

/// Prove that /api/browse forwards the corpora list unchanged and calls
/// the backend exactly once, with no parameters.
#[tokio::test]
async fn test_browse_lists_corpora() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/browse")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["corpora"][0]["name"], "wiki");
    assert_eq!(body["corpora"][1]["num_documents"], 180);

    let calls = h.backend_calls();
    assert_eq!(calls, vec![("get_corpora".to_string(), String::new())]);

    h.stop();
}

/// Prove that /api/options merges backend capabilities with configured
/// display defaults.
#[tokio::test]
async fn test_options_includes_defaults() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/options")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["options"]["query_languages"][0], "English");
    assert_eq!(body["options"]["model_names"][0], "tiny-model");
    assert_eq!(body["defaults"]["items_per_page"], 5);
    assert_eq!(body["defaults"]["search_results_per_page"], 5);
    assert_eq!(body["defaults"]["language"], "English");

    h.stop();
}

/// Prove that /api/browse/{corpus} returns datasets, and flips to
/// single-document mode when document_id is present.
#[tokio::test]
async fn test_browse_corpus_datasets_or_document() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/browse/wiki")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["datasets"][0]["name"], "dev");
    assert_eq!(h.last_backend_call().0, "get_datasets");

    let resp = reqwest::get(h.url("/api/browse/wiki?document_id=D1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["document"]["id"], "D1");
    let (op, query) = h.last_backend_call();
    assert_eq!(op, "get_document");
    assert_eq!(query, "corpus_name=wiki&document_id=D1");

    // one backend call per request, never both
    assert_eq!(h.backend_calls().len(), 2);

    h.stop();
}

/// Prove that dataset browsing paginates: page one of twelve queries at
/// five per page has no prev link and a next link that rewrites only p.
#[tokio::test]
async fn test_dataset_listing_paginates() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/browse/wiki/dev")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["page_num"], 1);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["queries"]["total_num_items"], 12);
    assert_eq!(body["queries"]["items"].as_array().unwrap().len(), 5);
    assert!(body["prev_page_link"].is_null());
    assert!(body["next_page_link"].as_str().unwrap().contains("p=2"));

    let (op, query) = h.last_backend_call();
    assert_eq!(op, "get_queries");
    assert_eq!(
        query,
        "corpus_name=wiki&num_results=5&offset=0&order_by_desc=true&dataset_name=dev"
    );

    h.stop();
}

/// Prove that malformed, undersized, or over-ceiling page numbers fall
/// back to page 1 instead of failing the request.
#[tokio::test]
async fn test_dataset_page_number_fallbacks() {
    let h = start_harness().await;

    for p in ["banana", "0", "-3", "1000"] {
        let resp = reqwest::get(h.url(&format!("/api/browse/wiki/dev?p={}", p)))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "p={}", p);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["page_num"], 1, "p={}", p);
    }

    h.stop();
}

/// Prove that a page past the end of a dataset redirects (307) to the
/// dataset root with the query string stripped.
#[tokio::test]
async fn test_dataset_page_out_of_range_redirects() {
    let h = start_harness().await;
    let client = no_redirect_client();

    let resp = client
        .get(h.url("/api/browse/wiki/dev?p=99"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
    let location = resp.headers()["location"].to_str().unwrap();
    assert!(
        location.ends_with("/api/browse/wiki/dev"),
        "unexpected location: {}",
        location
    );

    h.stop();
}

/// Prove that a blank q never reaches the backend; the gateway redirects
/// to the application root.
#[tokio::test]
async fn test_search_blank_query_redirects() {
    let h = start_harness().await;
    let client = no_redirect_client();

    for path in ["/api/search", "/api/search?q=", "/api/search?q=%20%20"] {
        let resp = client.get(h.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 307, "path {}", path);
        assert_eq!(resp.headers()["location"], "/");
    }
    assert!(h.backend_calls().is_empty());

    h.stop();
}

/// Prove the search page: canonical backend query, and page links that
/// keep every other parameter while rewriting only p.
#[tokio::test]
async fn test_search_page_links_preserve_query_state() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/search?q=rust&corpus=wiki&corpus=news&p=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["page_num"], 2);
    assert_eq!(body["total_pages"], 3);

    let prev = body["prev_page_link"].as_str().unwrap();
    let next = body["next_page_link"].as_str().unwrap();
    for link in [prev, next] {
        assert!(link.contains("q=rust"), "link lost q: {}", link);
        assert_eq!(
            link.matches("corpus=").count(),
            2,
            "link lost corpus filters: {}",
            link
        );
    }
    assert!(prev.contains("p=1"));
    assert!(next.contains("p=3"));

    let (op, query) = h.last_backend_call();
    assert_eq!(op, "search_documents");
    assert_eq!(
        query,
        "q=rust&num_results=5&offset=5&corpus_name=wiki&corpus_name=news"
    );

    h.stop();
}

/// Prove that language is validated against the backend's list: a known
/// language is forwarded, an unknown one is dropped.
#[tokio::test]
async fn test_search_language_validation() {
    let h = start_harness().await;

    reqwest::get(h.url("/api/search?q=x&language=German"))
        .await
        .unwrap();
    let (op, query) = h.last_backend_call();
    assert_eq!(op, "search_documents");
    assert!(query.contains("language=German"), "got: {}", query);

    reqwest::get(h.url("/api/search?q=x&language=Klingon"))
        .await
        .unwrap();
    let (op, query) = h.last_backend_call();
    assert_eq!(op, "search_documents");
    assert!(!query.contains("language"), "got: {}", query);

    h.stop();
}

/// Prove that an empty result set renders as a normal page with no
/// navigation links, while a page past the end redirects to the root.
#[tokio::test]
async fn test_search_empty_and_out_of_range() {
    let h = start_harness().await;
    let client = no_redirect_client();

    h.stub.search_total.store(0, Ordering::SeqCst);
    let resp = client.get(h.url("/api/search?q=rare")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_pages"], 0);
    assert_eq!(body["result"]["items"].as_array().unwrap().len(), 0);
    assert!(body["prev_page_link"].is_null());
    assert!(body["next_page_link"].is_null());

    h.stub.search_total.store(6, Ordering::SeqCst);
    let resp = client
        .get(h.url("/api/search?q=rare&p=5"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
    assert_eq!(resp.headers()["location"], "/");

    h.stop();
}

/// Prove the windowed list endpoints: corpus_name is mandatory, an
/// oversized num_results is rejected, a malformed one falls back to the
/// default.
#[tokio::test]
async fn test_documents_parameter_policy() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/documents")).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("corpus_name"));

    let resp = reqwest::get(h.url("/api/documents?corpus_name=wiki&num_results=1000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("num_results"));

    let resp = reqwest::get(h.url("/api/documents?corpus_name=wiki&num_results=many"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let (_, query) = h.last_backend_call();
    assert!(query.contains("num_results=5"), "got: {}", query);

    // the two rejected requests never reached the backend
    assert_eq!(h.backend_calls().len(), 1);

    h.stop();
}

/// Prove that ordering defaults to descending, including for an empty
/// desc value, and that desc=false flips it.
#[tokio::test]
async fn test_queries_ordering_flag() {
    let h = start_harness().await;

    reqwest::get(h.url("/api/queries?corpus_name=wiki"))
        .await
        .unwrap();
    assert!(h.last_backend_call().1.contains("order_by_desc=true"));

    reqwest::get(h.url("/api/queries?corpus_name=wiki&desc="))
        .await
        .unwrap();
    assert!(h.last_backend_call().1.contains("order_by_desc=true"));

    reqwest::get(h.url("/api/queries?corpus_name=wiki&desc=false&order_by=text"))
        .await
        .unwrap();
    let (_, query) = h.last_backend_call();
    assert!(query.contains("order_by_desc=false"));
    assert!(query.ends_with("order_by=text"), "got: {}", query);

    h.stop();
}

/// Prove that judgment records are flattened into typed rows for both
/// directions, and that a missing identifier fails before any network.
#[tokio::test]
async fn test_relevance_endpoints_flatten_records() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url("/api/relevant_queries?document_id=D1&corpus_name=wiki"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let item = &body["items"][0];
    assert_eq!(item["id"], "q7");
    assert_eq!(item["text"], "alpha?");
    assert_eq!(item["relevance"], 2);
    assert_eq!(item["dataset_name"], "dev");
    assert_eq!(h.last_backend_call().0, "get_qrels");

    let resp = reqwest::get(h.url(
        "/api/relevant_documents?query_id=q7&dataset_name=dev&corpus_name=wiki",
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let item = &body["items"][0];
    assert_eq!(item["id"], "D9");
    assert_eq!(item["relevance"], 1);

    let count_before = h.backend_calls().len();
    let resp = reqwest::get(h.url("/api/relevant_documents?dataset_name=dev&corpus_name=wiki"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(h.backend_calls().len(), count_before);

    h.stop();
}

/// Prove the RAG endpoint: paired lists are forwarded as repeated keys in
/// canonical order, and the bundle rules (pairing, ceiling, required
/// fields) are enforced before the backend sees anything.
#[tokio::test]
async fn test_rag_bundle_rules() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url(
        "/api/rag?model_name=tiny-model&q=why&corpus_name=wiki&document_id=D1&corpus_name=news&document_id=D2",
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "grounded answer");
    let (op, query) = h.last_backend_call();
    assert_eq!(op, "get_answer");
    assert_eq!(
        query,
        "model_name=tiny-model&q=why&corpus_name=wiki&corpus_name=news&document_id=D1&document_id=D2"
    );

    // over the two-document ceiling
    let resp = reqwest::get(h.url(
        "/api/rag?model_name=m&q=why&corpus_name=a&document_id=1&corpus_name=b&document_id=2&corpus_name=c&document_id=3",
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 400);

    // unpaired lists
    let resp = reqwest::get(h.url("/api/rag?model_name=m&q=why&corpus_name=a"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // no model
    let resp = reqwest::get(h.url("/api/rag?q=why&corpus_name=a&document_id=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert_eq!(h.backend_calls().len(), 1);

    h.stop();
}

/// Prove that document_summary translates model_name into the backend's
/// model parameter.
#[tokio::test]
async fn test_document_summary_wire_rename() {
    let h = start_harness().await;

    let resp = reqwest::get(h.url(
        "/api/document_summary?corpus_name=wiki&document_id=D1&model_name=tiny-model",
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "short summary");

    let (op, query) = h.last_backend_call();
    assert_eq!(op, "get_document_summary");
    assert_eq!(query, "corpus_name=wiki&document_id=D1&model=tiny-model");

    h.stop();
}

/// Prove that backend errors pass through with their status and body,
/// labeled as upstream errors, and that the failed call is not retried.
#[tokio::test]
async fn test_upstream_errors_pass_through() {
    let h = start_harness().await;
    *h.stub.fail.lock().unwrap() = Some((503, "index is rebuilding".to_string()));

    let resp = reqwest::get(h.url("/api/browse")).await.unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "upstream");
    assert_eq!(body["error"]["message"], "index is rebuilding");

    assert_eq!(h.backend_calls().len(), 1);

    h.stop();
}
