//! HTTP implementation of the rental backend traits.
//!
//! House endpoints carry `X-User-ID`; landmark endpoints do not. Without a
//! configured user id every house call fails with `Error::MissingIdentity`
//! before a request is built.

use async_trait::async_trait;
use reqwest::{Method, Url};
use std::time::Duration;
use tracing::{debug, warn};

use rentwise_config::RentalApiConfig;
use rentwise_core::api::{ApiResponse, HouseApi, LandmarkLookup, SearchEndpoint};
use rentwise_core::error::{Error, Result, UpstreamError};
use rentwise_core::{ActionRequest, SlotSet};

pub const USER_ID_HEADER: &str = "X-User-ID";

/// reqwest-backed client for the rental listing backend.
pub struct HttpRentalClient {
    base_url: Url,
    user_id: Option<String>,
    retry_transient: bool,
    client: reqwest::Client,
}

impl HttpRentalClient {
    pub fn new(config: &RentalApiConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| Error::Config {
            message: format!("rental_api.base_url '{}': {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("rental_api.base_url '{}' cannot be a base URL", config.base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            user_id: config
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from),
            retry_transient: config.retry_transient,
            client,
        })
    }

    /// Build `<base>/<segments...>?<query>`, percent-encoding every segment.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal("rental_api.base_url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn user_id(&self) -> Result<&str> {
        self.user_id.as_deref().ok_or(Error::MissingIdentity)
    }

    async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        identified: bool,
    ) -> Result<ApiResponse> {
        self.call(Method::GET, segments, query, identified).await
    }

    async fn post(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<ApiResponse> {
        self.call(Method::POST, segments, query, true).await
    }

    async fn call(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        identified: bool,
    ) -> Result<ApiResponse> {
        let user_id = if identified { Some(self.user_id()?) } else { None };
        let url = self.url(segments, query)?;
        let attempts = if method == Method::GET && self.retry_transient { 2 } else { 1 };

        let mut attempt = 1;
        loop {
            debug!(%method, %url, attempt, "Rental API request");
            match self.send_once(method.clone(), url.clone(), user_id).await {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(%method, %url, error = %e, "Transient rental API failure, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(%method, %url, error = %e, "Rental API call failed");
                    return Err(e.into());
                }
                Ok(response) => return Ok(response),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        user_id: Option<&str>,
    ) -> std::result::Result<ApiResponse, UpstreamError> {
        let mut builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        if let Some(user_id) = user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status_code: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(ApiResponse(serde_json::Value::Object(Default::default())));
        }
        serde_json::from_str(&body)
            .map(ApiResponse)
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

fn optional_filters(category: Option<&str>, district: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(category) = category {
        query.push(("category", category.to_string()));
    }
    if let Some(district) = district {
        query.push(("district", district.to_string()));
    }
    query
}

#[async_trait]
impl LandmarkLookup for HttpRentalClient {
    async fn by_name(&self, name: &str) -> Result<ApiResponse> {
        self.get(&["api", "landmarks", "name", name], &[], false).await
    }

    async fn by_id(&self, id: &str) -> Result<ApiResponse> {
        self.get(&["api", "landmarks", id], &[], false).await
    }

    async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        district: Option<&str>,
    ) -> Result<ApiResponse> {
        let mut params = vec![("q", query.to_string())];
        params.extend(optional_filters(category, district));
        self.get(&["api", "landmarks", "search"], &params, false).await
    }

    async fn list(&self, category: Option<&str>, district: Option<&str>) -> Result<ApiResponse> {
        self.get(&["api", "landmarks"], &optional_filters(category, district), false)
            .await
    }

    async fn stats(&self) -> Result<ApiResponse> {
        self.get(&["api", "landmarks", "stats"], &[], false).await
    }
}

#[async_trait]
impl HouseApi for HttpRentalClient {
    async fn init(&self) -> Result<ApiResponse> {
        self.post(&["api", "houses", "init"], &[]).await
    }

    async fn house(&self, house_id: &str) -> Result<ApiResponse> {
        self.get(&["api", "houses", house_id], &[], true).await
    }

    async fn listings(&self, house_id: &str) -> Result<ApiResponse> {
        self.get(&["api", "houses", "listings", house_id], &[], true).await
    }

    async fn search(&self, endpoint: SearchEndpoint, params: &SlotSet) -> Result<ApiResponse> {
        let legal = endpoint.legal_dimensions();
        let query: Vec<(&str, String)> = params
            .query_pairs()
            .into_iter()
            .filter(|(key, _)| legal.iter().any(|d| d.as_str() == *key))
            .collect();
        let segments: Vec<&str> = endpoint.path().trim_start_matches('/').split('/').collect();
        self.get(&segments, &query, true).await
    }

    async fn nearby_landmarks(
        &self,
        community: &str,
        category: Option<&str>,
        max_distance: Option<f64>,
    ) -> Result<ApiResponse> {
        let mut query = vec![("community", community.to_string())];
        if let Some(category) = category {
            query.push(("type", category.to_string()));
        }
        if let Some(max_distance) = max_distance {
            query.push(("max_distance_m", max_distance.to_string()));
        }
        self.get(&["api", "houses", "nearby_landmarks"], &query, true)
            .await
    }

    async fn stats(&self) -> Result<ApiResponse> {
        self.get(&["api", "houses", "stats"], &[], true).await
    }

    async fn execute(&self, request: &ActionRequest) -> Result<ApiResponse> {
        let query = [(
            "listing_platform",
            request.listing_platform.as_str().to_string(),
        )];
        self.post(
            &[
                "api",
                "houses",
                request.house_id.as_str(),
                request.operation.path_segment(),
            ],
            &query,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rentwise_core::{Dimension, ListingPlatform, Operation};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn user_of(headers: &HeaderMap) -> Value {
        headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| json!(v))
            .unwrap_or(Value::Null)
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/houses/by_platform",
                get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({"data": {"items": [], "total": 0, "query": q, "user": user_of(&headers)}}))
                }),
            )
            .route(
                "/api/houses/{id}",
                get(|headers: HeaderMap, Path(id): Path<String>| async move {
                    Json(json!({"data": {"id": id, "user": user_of(&headers)}}))
                }),
            )
            .route(
                "/api/houses/{id}/rent",
                post(|Path(id): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({"data": {"id": id, "platform": q.get("listing_platform")}}))
                }),
            )
            .route(
                "/api/landmarks/name/{name}",
                get(|headers: HeaderMap, Path(name): Path<String>| async move {
                    if name == "西二旗站" {
                        (StatusCode::OK, Json(json!({"data": {"id": "SS_001", "user": user_of(&headers)}})))
                    } else {
                        (StatusCode::NOT_FOUND, Json(json!({"message": "landmark not found"})))
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str, user_id: Option<&str>) -> HttpRentalClient {
        HttpRentalClient::new(&RentalApiConfig {
            base_url: base_url.into(),
            user_id: user_id.map(String::from),
            timeout_secs: 5,
            retry_transient: true,
        })
        .unwrap()
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let c = client("http://localhost:8080/", Some("u1"));
        let url = c.url(&["api", "landmarks", "name", "国贸 站/2"], &[]).unwrap();
        assert_eq!(url.path(), "/api/landmarks/name/%E5%9B%BD%E8%B4%B8%20%E7%AB%99%2F2");
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let c = client("http://localhost:8080/rental", Some("u1"));
        let url = c.url(&["api", "houses", "stats"], &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/rental/api/houses/stats");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let result = HttpRentalClient::new(&RentalApiConfig {
            base_url: "not a url".into(),
            ..RentalApiConfig::default()
        });
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn house_calls_require_user_id_before_any_io() {
        // nothing listens on this port; MissingIdentity must win regardless
        let c = client("http://127.0.0.1:9", None);
        assert!(matches!(HouseApi::stats(&c).await, Err(Error::MissingIdentity)));
        assert!(matches!(c.house("HF_1").await, Err(Error::MissingIdentity)));
        assert!(matches!(
            HouseApi::search(&c, SearchEndpoint::ByPlatform, &SlotSet::new()).await,
            Err(Error::MissingIdentity)
        ));
    }

    #[tokio::test]
    async fn search_sends_user_id_and_only_legal_params() {
        let base = spawn_backend().await;
        let c = client(&base, Some("b00897290"));

        let slots = SlotSet::new()
            .with(Dimension::District, "海淀,朝阳")
            .unwrap()
            .with(Dimension::MaxPrice, "5000")
            .unwrap()
            .with(Dimension::Community, "建清园")
            .unwrap();

        let resp = HouseApi::search(&c, SearchEndpoint::ByPlatform, &slots)
            .await
            .unwrap();
        let data = resp.data();
        assert_eq!(data["user"], "b00897290");
        assert_eq!(data["query"]["district"], "海淀,朝阳");
        assert_eq!(data["query"]["max_price"], "5000");
        assert!(data["query"].get("community").is_none());
    }

    #[tokio::test]
    async fn landmark_lookup_sends_no_user_id() {
        let base = spawn_backend().await;
        let c = client(&base, Some("b00897290"));
        let resp = c.by_name("西二旗站").await.unwrap();
        assert_eq!(resp.first_id().as_deref(), Some("SS_001"));
        assert_eq!(resp.data()["user"], Value::Null);
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        let base = spawn_backend().await;
        let c = client(&base, None);
        let err = c.by_name("不存在").await.unwrap_err();
        match err {
            Error::Upstream(UpstreamError::Status { status_code, body }) => {
                assert_eq!(status_code, 404);
                assert!(body.contains("landmark not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_posts_platform() {
        let base = spawn_backend().await;
        let c = client(&base, Some("u1"));
        let request = ActionRequest::new(
            Some(Operation::Rent),
            Some("HF_2001"),
            Some(ListingPlatform::Anjuke),
            Some("u1"),
        )
        .unwrap();
        let resp = c.execute(&request).await.unwrap();
        assert_eq!(resp.data()["id"], "HF_2001");
        assert_eq!(resp.data()["platform"], "安居客");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transient_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(&format!("http://{addr}"), Some("u1"));
        match c.house("HF_1").await {
            Err(Error::Upstream(e)) => assert!(e.is_transient()),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
