//! wom-relay - a validating pass-through for the Wise Old Man player API
//!
//! Each relayed operation is described once in [`endpoint::ENDPOINTS`]. A single generic handler
//! validates the incoming parameters, builds the upstream URL, issues one GET and hands the
//! upstream JSON back unchanged.

use axum::Router;
use axum::extract::{Query, RawPathParams, State, rejection::RawPathParamsRejection};
use axum::routing::{MethodFilter, MethodRouter, get};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub mod client;
pub mod endpoint;
pub mod errors;
pub mod forwarder;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod test_utils;

use client::{HttpClient, HyperClient, PoolSettings};
use endpoint::{ENDPOINTS, InboundMethod};
use forwarder::Forwarder;
use handlers::{endpoints as endpoints_handler, relay_handler};

/// The main application state: the forwarder and the client it owns
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub forwarder: Forwarder<T>,
}

impl AppState<HyperClient> {
    /// Create a new AppState backed by a pooled Hyper client
    pub fn new(base_url: Url, timeout: Duration, pool: PoolSettings) -> Self {
        let client = client::create_hyper_client(pool);
        Self {
            forwarder: Forwarder::builder()
                .client(client)
                .base_url(base_url)
                .timeout(timeout)
                .build(),
        }
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState around an existing forwarder (useful for testing)
    pub fn with_forwarder(forwarder: Forwarder<T>) -> Self {
        Self { forwarder }
    }
}

/// Build the main router for the relay
/// This creates routes for:
/// - `/endpoints` - Lists the relayed operations
/// - one route per described endpoint, all served by [`relay_handler`]
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router for {} endpoints", ENDPOINTS.len());

    // Operations sharing a path (GET and POST on /players/{username}) share one method router.
    let mut routes: BTreeMap<&'static str, MethodRouter<AppState<T>>> = BTreeMap::new();
    for spec in ENDPOINTS {
        let filter = match spec.method {
            InboundMethod::Get => MethodFilter::GET,
            InboundMethod::Post => MethodFilter::POST,
        };
        let handler = move |State(state): State<AppState<T>>,
                            path_params: Result<RawPathParams, RawPathParamsRejection>,
                            Query(query): Query<Vec<(String, String)>>| {
            relay_handler(state, spec, path_params, query)
        };
        let method_router = routes
            .remove(spec.path)
            .unwrap_or_else(MethodRouter::new)
            .on(filter, handler);
        routes.insert(spec.path, method_router);
    }

    routes
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
        .route("/endpoints", get(endpoints_handler))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// Requests are labelled by their matched route template, so `/players/zezima` and
/// `/players/lynx_titan` count towards the same `/players/{username}` series.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::MatchedPath)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use test_utils::MockHttpClient;

    fn server(client: MockHttpClient) -> TestServer {
        let forwarder = Forwarder::builder()
            .client(client)
            .base_url(endpoint::DEFAULT_BASE_URL.parse().unwrap())
            .build();
        let router = build_router(AppState::with_forwarder(forwarder));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_search_relays_query() {
        let mock_client = MockHttpClient::new(
            StatusCode::OK,
            r#"[{"id": 1, "username": "zezima"}, {"id": 2, "username": "zezima2"}]"#,
        );
        let server = server(mock_client.clone());

        let response = server
            .get("/players/search")
            .add_query_param("username", "zezi")
            .add_query_param("limit", "2")
            .await;

        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body[0]["username"], "zezima");
        assert_eq!(body.as_array().unwrap().len(), 2);

        let requests = mock_client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].uri,
            "https://api.wiseoldman.net/v2/players/search?username=zezi&limit=2"
        );
    }

    #[tokio::test]
    async fn test_search_without_username_is_rejected() {
        let mock_client = MockHttpClient::new(StatusCode::OK, "[]");
        let server = server(mock_client.clone());

        let response = server
            .get("/players/search")
            .add_query_param("limit", "many")
            .await;

        assert_eq!(response.status_code(), 422);
        let body: serde_json::Value = response.json();
        assert_eq!(
            body,
            json!({
                "error": {
                    "limit": ["The limit field must be an integer."],
                    "username": ["The username field is required."]
                }
            })
        );
        assert!(mock_client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_id_lookup() {
        let mock_client = MockHttpClient::new(StatusCode::OK, r#"{"id": 123}"#);
        let server = server(mock_client.clone());

        let response = server.get("/players/id/123").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<serde_json::Value>(), json!({ "id": 123 }));
        assert_eq!(
            mock_client.get_requests()[0].uri,
            "https://api.wiseoldman.net/v2/players/id/123"
        );

        let response = server.get("/players/id/abc").await;
        assert_eq!(response.status_code(), 422);
        assert_eq!(mock_client.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_capture_gets_json_error() {
        let mock_client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server(mock_client.clone());

        let response = server.get("/players/%FF/achievements").await;

        assert_eq!(response.status_code(), 422);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({
                "error": { "username": ["The username field must be a valid UTF-8 string."] }
            })
        );
        assert!(mock_client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_post_share_player_path() {
        let mock_client = MockHttpClient::new(StatusCode::OK, r#"{"username": "zezima"}"#);
        let server = server(mock_client.clone());

        assert_eq!(server.get("/players/zezima").await.status_code(), 200);
        assert_eq!(server.post("/players/zezima").await.status_code(), 200);
        assert_eq!(
            server.delete("/players/zezima").await.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let requests = mock_client.get_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method == "GET"));
        assert!(
            requests
                .iter()
                .all(|r| r.uri == "https://api.wiseoldman.net/v2/players/zezima")
        );
    }

    #[tokio::test]
    async fn test_upstream_error_body_is_relayed() {
        let mock_client = MockHttpClient::new(
            StatusCode::BAD_REQUEST,
            r#"{"message": "Invalid period."}"#,
        );
        let server = server(mock_client);

        let response = server
            .get("/players/zezima/records")
            .add_query_param("metric", "not-a-metric")
            .await;

        assert_eq!(response.status_code(), 400);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({ "message": "Invalid period." })
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let server = server(MockHttpClient::failing("dns error"));

        let response = server.get("/players/zezima/names").await;
        assert_eq!(response.status_code(), 502);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["type"], "upstream_error");
    }

    #[tokio::test]
    async fn test_endpoint_catalogue() {
        let server = server(MockHttpClient::new(StatusCode::OK, "{}"));

        let response = server.get("/endpoints").await;
        assert_eq!(response.status_code(), 200);

        let body: serde_json::Value = response.json();
        assert_eq!(body["object"], "list");
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), ENDPOINTS.len());
        assert!(names.contains(&"player_snapshots_timeline"));
        assert!(names.contains(&"assert_player_type"));
    }

    #[tokio::test]
    async fn test_metrics_count_matched_routes() {
        let (prometheus_layer, handle) = build_metrics_layer_and_handle("wom_relay");
        let metrics_server = TestServer::new(build_metrics_router(handle)).unwrap();

        let forwarder = Forwarder::builder()
            .client(MockHttpClient::new(StatusCode::OK, "[]"))
            .base_url(endpoint::DEFAULT_BASE_URL.parse().unwrap())
            .build();
        let router = build_router(AppState::with_forwarder(forwarder)).layer(prometheus_layer);
        let server = TestServer::new(router).unwrap();

        for name in ["zezima", "lynx_titan"] {
            let response = server.get(&format!("/players/{name}/archives")).await;
            assert_eq!(response.status_code(), 200);
        }

        let metrics_text = metrics_server.get("/metrics").await.text();
        let count = metrics_text
            .lines()
            .find(|line| {
                line.starts_with("wom_relay_http_requests_total")
                    && line.contains("endpoint=\"/players/{username}/archives\"")
            })
            .and_then(|line| line.split_whitespace().last())
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);
        assert_eq!(count, 2);
    }
}
