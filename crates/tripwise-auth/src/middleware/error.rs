//! HTTP error responses for authentication failures.
//!
//! Implements `IntoResponse` for `AuthError`: every client rejection maps to
//! a 401 with a stable machine-readable reason code in the JSON body and a
//! `WWW-Authenticate` header; infrastructure failures map to 5xx. Bodies
//! never carry store keys or token material.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let reason = self.reason_code();
        let message = self.to_string();

        let body = json!({
            "error": reason,
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(reason, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="tripwise", error="token_expired", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!("Bearer realm=\"tripwise\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}
