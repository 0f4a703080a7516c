use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use log::*;

use crate::error::error_response;
use crate::AppState;

/// Header carrying the API token for callers that cannot set `Authorization`.
pub(crate) const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests that do not present the API token, either as
/// `Authorization: Bearer <token>` or in the `x-api-key` header.
pub async fn require_auth(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let verified =
        presented_token(request.headers()).map(|token| app_state.api_token.verify(token));

    match verified {
        Some(true) => next.run(request).await,
        Some(false) => {
            warn!(
                "Rejected request to {} with an invalid API token",
                request.uri().path()
            );
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized", None)
        }
        None => error_response(StatusCode::UNAUTHORIZED, "Unauthorized", None),
    }
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    bearer.or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_presented_token_reads_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(presented_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_presented_token_falls_back_to_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("abc123"));
        assert_eq!(presented_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_presented_token_ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(presented_token(&headers), None);
    }
}
