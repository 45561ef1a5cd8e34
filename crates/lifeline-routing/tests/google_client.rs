//! Wire-level tests for the Routes API client.
//!
//! Each test starts a throwaway Axum server on an ephemeral port that
//! plays the part of `computeRoutes`, then points the client at it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use lifeline_routing::{GoogleRoutesClient, GoogleRoutesConfig, RoutingError, RoutingOracle};
use lifeline_types::Coordinates;
use serde_json::Value;
use tokio::net::TcpListener;

/// Serve `router` on 127.0.0.1 and return the endpoint URL.
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/directions/v2:computeRoutes")
}

fn client(url: String, timeout: Duration) -> RoutingOracle {
    let config = GoogleRoutesConfig {
        api_url: url,
        api_key: "test-key".to_owned(),
        timeout,
    };
    RoutingOracle::Google(GoogleRoutesClient::new(&config).unwrap())
}

fn origin() -> Coordinates {
    Coordinates::new(40.0, -79.0)
}

fn destination() -> Coordinates {
    Coordinates::new(40.01, -79.0)
}

#[tokio::test]
async fn sends_traffic_aware_drive_request() {
    let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);

    let router = Router::new().route(
        "/directions/v2:computeRoutes",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = Arc::clone(&captured);
            async move {
                *captured.lock().unwrap() = Some((headers, body));
                Json(serde_json::json!({
                    "routes": [{
                        "duration": "120s",
                        "polyline": { "encodedPolyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" }
                    }]
                }))
            }
        }),
    );
    let url = serve(router).await;

    let route = client(url, Duration::from_secs(5))
        .route(origin(), destination())
        .await
        .unwrap();

    assert_eq!(route.eta_seconds, 120);
    assert_eq!(route.path.len(), 3);

    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers["x-goog-api-key"], "test-key");
    assert_eq!(
        headers["x-goog-fieldmask"],
        "routes.duration,routes.polyline.encodedPolyline"
    );
    assert_eq!(body["travelMode"], "DRIVE");
    assert_eq!(body["routingPreference"], "TRAFFIC_AWARE");
    assert_eq!(body["origin"]["location"]["latLng"]["latitude"], 40.0);
    assert_eq!(body["destination"]["location"]["latLng"]["latitude"], 40.01);
    assert!(body["departureTime"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let router = Router::new().route(
        "/directions/v2:computeRoutes",
        post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
    );
    let url = serve(router).await;

    let err = client(url, Duration::from_secs(5))
        .route(origin(), destination())
        .await
        .unwrap_err();

    match err {
        RoutingError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("API key"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_route_list_is_no_route() {
    let router = Router::new().route(
        "/directions/v2:computeRoutes",
        post(|| async { Json(serde_json::json!({})) }),
    );
    let url = serve(router).await;

    let err = client(url, Duration::from_secs(5))
        .route(origin(), destination())
        .await
        .unwrap_err();

    assert!(matches!(err, RoutingError::NoRoute));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let router = Router::new().route(
        "/directions/v2:computeRoutes",
        post(|| async { "<html>gateway</html>" }),
    );
    let url = serve(router).await;

    let err = client(url, Duration::from_secs(5))
        .route(origin(), destination())
        .await
        .unwrap_err();

    assert!(matches!(err, RoutingError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_oracle_times_out() {
    let router = Router::new().route(
        "/directions/v2:computeRoutes",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({}))
        }),
    );
    let url = serve(router).await;

    let err = client(url, Duration::from_millis(200))
        .route(origin(), destination())
        .await
        .unwrap_err();

    assert!(matches!(err, RoutingError::Timeout), "got {err:?}");
}
