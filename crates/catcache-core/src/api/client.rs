//! HTTP client for the `/categories` REST endpoint.
//!
//! Every successful response wraps its payload in `{ "data": ... }`; the
//! client unwraps it and maps non-success statuses onto `ApiError`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{Category, CategoryInput, CategoryStatus, DataEnvelope, UpdatePayload};

use super::{ApiError, CategoryRemote};

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Collection path, relative to the base URL.
const CATEGORIES_PATH: &str = "/categories";

/// Server-side search path.
const SEARCH_PATH: &str = "/categories/search";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Delay before retry number `retry` (starting at 1), doubling each time.
fn backoff_delay(initial: Duration, retry: u32) -> Duration {
    initial * 2u32.pow(retry.saturating_sub(1))
}

/// API client for the category service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<String>>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a client for `base_url` with the default timeout
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(Arc::new(token.into()));
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    // ===== Request builders =====

    fn list_request(&self) -> RequestBuilder {
        self.request(Method::GET, CATEGORIES_PATH)
    }

    fn search_request(&self, query: &str) -> RequestBuilder {
        self.request(Method::GET, SEARCH_PATH).query(&[("query", query)])
    }

    fn filter_request(&self, status: CategoryStatus) -> RequestBuilder {
        self.request(Method::GET, CATEGORIES_PATH)
            .query(&[("status", status.as_str())])
    }

    fn create_request(&self, input: &CategoryInput) -> RequestBuilder {
        self.request(Method::POST, CATEGORIES_PATH).json(input)
    }

    fn update_request(&self, id: i64, input: &CategoryInput) -> RequestBuilder {
        self.request(Method::PUT, CATEGORIES_PATH)
            .query(&[("id", id)])
            .json(&UpdatePayload { id, input })
    }

    fn delete_request(&self, id: i64) -> RequestBuilder {
        self.request(Method::DELETE, CATEGORIES_PATH).query(&[("id", id)])
    }

    // ===== Transport =====

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, retrying with exponential backoff while the server answers 429.
    /// `build` is called once per attempt since a sent request cannot be reused.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, ApiError> {
        let mut retries = 0;

        loop {
            let request = build().build()?;
            let method = request.method().clone();
            let url = request.url().to_string();
            debug!(%method, url = %url, "Sending request");

            let response = self.client.execute(request).await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    let backoff = backoff_delay(self.initial_backoff, retries);
                    warn!(
                        url = %url,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Send and unwrap the `data` field of the response body.
    async fn fetch_data<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(build).await?;
        let url = response.url().to_string();
        let text = response.text().await?;
        let envelope: DataEnvelope<T> = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })?;
        Ok(envelope.data)
    }

    /// Send a create or update. Any 2xx means the server applied it; the
    /// returned record is decoded if present and otherwise only logged.
    async fn send_mutation(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Option<Category>, ApiError> {
        let response = self.send(build).await?;
        let url = response.url().to_string();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %url, error = %e, "Could not read mutation response body");
                return Ok(None);
            }
        };
        match serde_json::from_str::<DataEnvelope<Category>>(&text) {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) => {
                warn!(url = %url, error = %e, "Mutation response carried no readable record");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CategoryRemote for ApiClient {
    async fn list_all(&self) -> Result<Vec<Category>, ApiError> {
        self.fetch_data(|| self.list_request()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Category>, ApiError> {
        self.fetch_data(|| self.search_request(query)).await
    }

    async fn filter_by_status(&self, status: CategoryStatus) -> Result<Vec<Category>, ApiError> {
        self.fetch_data(|| self.filter_request(status)).await
    }

    async fn create(&self, input: &CategoryInput) -> Result<Option<Category>, ApiError> {
        self.send_mutation(|| self.create_request(input)).await
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>, ApiError> {
        self.send_mutation(|| self.update_request(id, input)).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        // Success body is not required, so it is never parsed.
        self.send(|| self.delete_request(id)).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::cache::CategoryStore;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:3000/").unwrap()
    }

    fn body_json(request: &reqwest::Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_list_request() {
        let request = client().list_request().build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories");
        assert!(request.body().is_none());
    }

    #[test]
    fn test_search_request_encodes_query() {
        let request = client().search_request("bo").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories/search?query=bo");

        let request = client().search_request("arts & crafts").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:3000/categories/search?query=arts+%26+crafts"
        );
    }

    #[test]
    fn test_filter_request() {
        let request = client().filter_request(CategoryStatus::Inactive).build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories?status=inactive");
    }

    #[test]
    fn test_create_request() {
        let input = CategoryInput::new("Toys", None).unwrap();
        let request = client().create_request(&input).build().unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories");
        assert_eq!(body_json(&request), serde_json::json!({"name": "Toys"}));
    }

    #[test]
    fn test_update_request() {
        let input = CategoryInput::new("Board Games", Some(CategoryStatus::Inactive)).unwrap();
        let request = client().update_request(2, &input).build().unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories?id=2");
        assert_eq!(
            body_json(&request),
            serde_json::json!({"id": 2, "name": "Board Games", "status": "inactive"})
        );
    }

    #[test]
    fn test_delete_request() {
        let request = client().delete_request(9).build().unwrap();
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.url().as_str(), "http://localhost:3000/categories?id=9");
        assert!(request.body().is_none());
    }

    #[test]
    fn test_bearer_token_is_attached() {
        let request = client().list_request().build().unwrap();
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());

        let mut authed = client();
        authed.set_token("secret");
        let request = authed.list_request().build().unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(client().base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_backoff_doubles_from_one_second() {
        let initial = Duration::from_millis(INITIAL_BACKOFF_MS);
        let delays: Vec<Duration> = (1..=MAX_RATE_LIMIT_RETRIES)
            .map(|retry| backoff_delay(initial, retry))
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    // ===== Against a local server =====

    /// Serve `app` on an ephemeral port and return a client pointed at it.
    async fn serve(app: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let mut client = ApiClient::new(&format!("http://{addr}")).unwrap();
        client.initial_backoff = Duration::from_millis(1);
        client
    }

    /// GET /categories answers 429 for the first `limited` calls, then a single record.
    fn rate_limited_list(limited: usize, hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/categories",
            get(move || {
                let hits = hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < limited {
                        StatusCode::TOO_MANY_REQUESTS.into_response()
                    } else {
                        Json(json!({"data": [{"id": 1, "name": "Books"}]})).into_response()
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_rate_limited_request_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve(rate_limited_list(1, hits.clone())).await;

        let records = api.list_all().await.unwrap();
        assert_eq!(records, vec![Category::new(1, "Books", None)]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_three_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve(rate_limited_list(usize::MAX, hits.clone())).await;

        let err = api.list_all().await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let app = Router::new().route(
            "/categories",
            get(|| async { StatusCode::BAD_GATEWAY })
                .post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "name is required") })
                .put(|| async { (StatusCode::NOT_FOUND, "no category 42") }),
        );
        let api = serve(app).await;
        let input = CategoryInput::new("Toys", None).unwrap();

        let err = api.update(42, &input).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref body) if body == "no category 42"));
        assert_eq!(api.create(&input).await.unwrap_err().kind(), ErrorKind::Validation);
        assert!(matches!(api.list_all().await.unwrap_err(), ApiError::ServerError(_)));
    }

    #[tokio::test]
    async fn test_delete_ignores_response_body() {
        let app = Router::new().route("/categories", delete(|| async { StatusCode::NO_CONTENT }));
        assert!(serve(app).await.delete(3).await.is_ok());

        let app = Router::new().route("/categories", delete(|| async { "deleted" }));
        assert!(serve(app).await.delete(3).await.is_ok());
    }

    #[tokio::test]
    async fn test_mutation_record_is_decoded_when_present() {
        let app = Router::new().route(
            "/categories",
            post(|| async { StatusCode::CREATED }).put(|| async {
                Json(json!({"data": {"id": 2, "name": "Games", "status": "inactive"}}))
            }),
        );
        let api = serve(app).await;
        let input = CategoryInput::new("Games", Some(CategoryStatus::Inactive)).unwrap();

        assert_eq!(api.create(&input).await.unwrap(), None);
        assert_eq!(
            api.update(2, &input).await.unwrap(),
            Some(Category::new(2, "Games", Some(CategoryStatus::Inactive)))
        );
    }

    #[tokio::test]
    async fn test_list_without_envelope_is_invalid() {
        let app = Router::new().route(
            "/categories",
            get(|| async { Json(json!([{"id": 1, "name": "Books"}])) }),
        );
        let err = serve(app).await.list_all().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_list_accepts_blank_status() {
        let app = Router::new().route(
            "/categories",
            get(|| async {
                Json(json!({"data": [
                    {"id": 1, "name": "Books", "status": "active"},
                    {"id": 2, "name": "Music", "status": ""}
                ]}))
            }),
        );
        let records = serve(app).await.list_all().await.unwrap();
        assert_eq!(records[1], Category::new(2, "Music", None));
        assert_eq!(records[1].effective_status(), CategoryStatus::Active);
    }

    #[tokio::test]
    async fn test_store_refetches_when_create_returns_no_record() {
        let server: Arc<Mutex<Vec<Category>>> = Arc::new(Mutex::new(Vec::new()));
        let listed = server.clone();
        let created = server.clone();
        let app = Router::new().route(
            "/categories",
            get(move || {
                let listed = listed.clone();
                async move {
                    let records = listed.lock().unwrap().clone();
                    Json(json!({ "data": records }))
                }
            })
            .post(move |Json(body): Json<serde_json::Value>| {
                let created = created.clone();
                async move {
                    let mut records = created.lock().unwrap();
                    let id = records.len() as i64 + 1;
                    let name = body["name"].as_str().unwrap_or_default().to_string();
                    records.push(Category::new(id, name, None));
                    StatusCode::CREATED
                }
            }),
        );
        let store = CategoryStore::new(Arc::new(serve(app).await));

        let input = CategoryInput::new("Toys", None).unwrap();
        assert_eq!(store.create(&input).await.unwrap(), None);
        assert_eq!(store.records(), vec![Category::new(1, "Toys", None)]);
        assert_eq!(store.snapshot().last_error(), None);
    }
}
