/// HTTP endpoint for querying buoy observations
///
/// Provides a simple JSON API over `SurfService`. Every request fetches
/// fresh data; nothing is cached between requests.
///
/// Endpoints:
/// - GET /health - Service health check
/// - GET /history?region={id} - Per-location observation history (default region: central)
/// - GET /compare - Cross-region comparison chart and top location
/// - GET /forecast?region={id} - Wave height forecasts for a region

use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};

use crate::service::{ServiceError, SurfService};

/// Region served by `/history` when no `region` parameter is given.
pub const DEFAULT_REGION: &str = "central";

const ENDPOINTS: [&str; 4] = ["/health", "/history?region={id}", "/compare", "/forecast?region={id}"];

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Maps a request URL (path plus query) to a status code and JSON body.
pub fn route(service: &SurfService, url: &str) -> (u16, Value) {
    let Ok(parsed) = Url::parse(&format!("http://localhost{}", url)) else {
        return (400, json!({ "error": format!("Malformed request URL: {}", url) }));
    };
    let region = parsed
        .query_pairs()
        .find(|(key, _)| key == "region")
        .map(|(_, value)| value.into_owned());

    match parsed.path() {
        "/health" => handle_health(),
        "/history" => {
            let region = region.as_deref().unwrap_or(DEFAULT_REGION);
            respond(service, service.history(region))
        }
        "/compare" => respond(service, service.compare()),
        "/forecast" => match region {
            Some(region) => respond(service, service.forecast(&region)),
            None => (
                400,
                json!({
                    "error": "Missing region parameter",
                    "available_regions": service.registry().region_ids(),
                }),
            ),
        },
        _ => (
            404,
            json!({
                "error": "Not found",
                "available_endpoints": ENDPOINTS,
            }),
        ),
    }
}

/// Handle /health endpoint
fn handle_health() -> (u16, Value) {
    (
        200,
        json!({
            "status": "ok",
            "service": "surfwatch_service",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn respond<T: Serialize>(service: &SurfService, result: Result<T, ServiceError>) -> (u16, Value) {
    match result {
        Ok(view) => match serde_json::to_value(&view) {
            Ok(body) => (200, body),
            Err(e) => (500, json!({ "error": format!("Failed to encode response: {}", e) })),
        },
        Err(e) => error_response(service, &e),
    }
}

fn error_response(service: &SurfService, err: &ServiceError) -> (u16, Value) {
    match err {
        ServiceError::UnknownRegion(region) => (
            400,
            json!({
                "error": err.to_string(),
                "region": region,
                "available_regions": service.registry().region_ids(),
            }),
        ),
        _ => {
            log::error!("Request failed: {}", err);
            (500, json!({ "error": err.to_string() }))
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port. Blocks serving
/// requests one at a time.
pub fn start_endpoint_server(port: u16, service: SurfService) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    log::info!("HTTP endpoint listening on http://0.0.0.0:{}", port);
    for endpoint in ENDPOINTS {
        log::info!("   GET {}", endpoint);
    }

    for request in server.incoming_requests() {
        let (status, body) = route(&service, request.url());
        log::debug!("{} {} -> {}", request.method(), request.url(), status);

        if let Err(e) = request.respond(create_response(status, &body)) {
            log::warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(json).unwrap_or_else(|_| "{}".to_string());
    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));

    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
