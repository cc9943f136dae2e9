//! CORS middleware configuration.

use axum::http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Header reporting how many files were left out of a folder archive.
pub const ARCHIVE_SKIPPED_HEADER: &str = "x-archive-skipped";

const METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer for the configured origins.
///
/// With no valid origins every origin is allowed without credentials.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        CONTENT_DISPOSITION,
        CONTENT_LENGTH,
        HeaderName::from_static(ARCHIVE_SKIPPED_HEADER),
    ];
    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    let layer = CorsLayer::new()
        .allow_methods(METHODS)
        .expose_headers(exposed);

    if parsed_origins.is_empty() {
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        layer
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
            .allow_credentials(true)
            .allow_origin(parsed_origins)
    }
}
