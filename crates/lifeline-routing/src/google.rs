//! Client for the Google Routes API (`directions/v2:computeRoutes`).
//!
//! One `POST` per lookup with a bounded timeout. The field mask limits the
//! response to `routes.duration` and `routes.polyline.encodedPolyline`,
//! which is all the matcher needs. No retries happen here; retry policy
//! belongs to the caller.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use lifeline_types::Coordinates;
use serde::Deserialize;

use crate::error::RoutingError;
use crate::oracle::Route;
use crate::polyline;

/// Public endpoint of the Routes API.
pub const DEFAULT_API_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";

/// Field mask sent with every request.
const FIELD_MASK: &str = "routes.duration,routes.polyline.encodedPolyline";

/// Connection settings for [`GoogleRoutesClient`].
#[derive(Debug, Clone)]
pub struct GoogleRoutesConfig {
    /// Full URL of the `computeRoutes` endpoint.
    pub api_url: String,
    /// API key sent as `X-Goog-Api-Key`.
    pub api_key: String,
    /// Upper bound on the whole request, connect to body.
    pub timeout: Duration,
}

impl GoogleRoutesConfig {
    /// Configuration for the public endpoint with a 10 second timeout.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            api_key: api_key.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the Routes API.
#[derive(Debug, Clone)]
pub struct GoogleRoutesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GoogleRoutesClient {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Config`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &GoogleRoutesConfig) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RoutingError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Ask for a traffic-aware driving route from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`RoutingError`] on timeout, transport failure, non-2xx
    /// status, unparsable body, an empty route list, or a route missing
    /// either its duration or its polyline.
    pub async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Route, RoutingError> {
        let body = serde_json::json!({
            "origin": waypoint_body(origin),
            "destination": waypoint_body(destination),
            "travelMode": "DRIVE",
            "routingPreference": "TRAFFIC_AWARE",
            "departureTime": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RoutingError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let parsed: RoutesResponse = response.json().await?;
        extract_route(parsed)
    }
}

fn waypoint_body(point: Coordinates) -> serde_json::Value {
    serde_json::json!({
        "location": {
            "latLng": { "latitude": point.lat, "longitude": point.lng }
        }
    })
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    duration: Option<String>,
    polyline: Option<ApiPolyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPolyline {
    encoded_polyline: Option<String>,
}

/// Turn the first route of a response into a [`Route`], all or nothing.
fn extract_route(response: RoutesResponse) -> Result<Route, RoutingError> {
    let route = response.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;

    let eta_seconds = route
        .duration
        .as_deref()
        .and_then(parse_duration)
        .ok_or(RoutingError::MissingDuration)?;

    let encoded = route
        .polyline
        .and_then(|p| p.encoded_polyline)
        .filter(|s| !s.is_empty())
        .ok_or(RoutingError::MissingPolyline)?;

    let path = polyline::decode(&encoded)?;
    if path.is_empty() {
        return Err(RoutingError::MissingPolyline);
    }

    Ok(Route { eta_seconds, path })
}

/// Parse a protobuf duration string such as `"345s"` into whole seconds.
///
/// Fractional seconds (`"12.5s"`) are truncated.
fn parse_duration(raw: &str) -> Option<u32> {
    let digits = raw.strip_suffix('s')?;
    let whole = digits.split_once('.').map_or(digits, |(secs, _)| secs);
    whole.parse().ok()
}
