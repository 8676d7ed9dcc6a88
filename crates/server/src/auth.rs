//! Static-token authentication for the control surface.

use axum::Json;
use axum::http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};

/// Accepts the token as `?token=…` or an `Authorization: Bearer …` header.
pub fn token_matches(expected: &str, query_token: Option<&str>, headers: &HeaderMap) -> bool {
	if query_token == Some(expected) {
		return true;
	}

	headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
		== Some(expected)
}

/// 401 payload with a usage hint, mirroring what clients see on a typo'd
/// token.
pub fn unauthorized(expected: &str) -> (StatusCode, Json<Value>) {
	(
		StatusCode::UNAUTHORIZED,
		Json(json!({
			"error": "Unauthorized",
			"hint": format!("use ?token={expected} or an Authorization: Bearer header"),
		})),
	)
}

#[cfg(test)]
mod tests {
	use axum::http::HeaderValue;

	use super::*;

	#[test]
	fn query_token_is_accepted() {
		assert!(token_matches("secret", Some("secret"), &HeaderMap::new()));
		assert!(!token_matches("secret", Some("wrong"), &HeaderMap::new()));
		assert!(!token_matches("secret", None, &HeaderMap::new()));
	}

	#[test]
	fn bearer_header_is_accepted() {
		let mut headers = HeaderMap::new();
		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
		assert!(token_matches("secret", None, &headers));

		let mut wrong = HeaderMap::new();
		wrong.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
		assert!(!token_matches("secret", None, &wrong));
	}

	#[test]
	fn bare_header_value_is_rejected() {
		let mut headers = HeaderMap::new();
		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("secret"));
		assert!(!token_matches("secret", None, &headers));
	}
}
