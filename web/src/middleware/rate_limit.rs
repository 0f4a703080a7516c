use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use log::*;

use crate::error::error_response;
use crate::extractors::client_addr::ClientAddr;
use crate::AppState;

/// Applies the sliding-window limit per client IP; over the limit is a 429 with `Retry-After`.
pub async fn limit_requests(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ClientAddr(client) = ClientAddr::from_extensions(request.extensions());

    match app_state.rate_limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            warn!("Rate limit exceeded for {client}, retry in {seconds}s");
            error_response(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many requests, retry in {seconds}s"),
                Some(seconds),
            )
        }
    }
}
