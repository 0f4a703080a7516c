use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::controller::ApiResponse;
use crate::{AppState, Error};
use domain::control as ConnectionApi;
use log::*;

/// Credential entries removed by a credentials reset.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedCredentials {
    pub removed: Vec<String>,
}

/// GET the connection summary
#[utoipa::path(
    get,
    path = "/connection/status",
    responses(
        (status = 200, description = "Current connection summary", body = domain::Status),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many requests")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn status(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let status = ConnectionApi::status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// GET the full connection state, including backoff and cooldown details
#[utoipa::path(
    get,
    path = "/connection/status/detailed",
    responses(
        (status = 200, description = "Detailed connection state", body = domain::DetailedStatus),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many requests")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn detailed_status(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let status = ConnectionApi::detailed_status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// POST start a session unless the reconnect cooldown is active
#[utoipa::path(
    post,
    path = "/connection/initialize",
    responses(
        (status = 200, description = "Session started; progress is reported through /connection/events", body = domain::Status),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Credentials were revoked"),
        (status = 429, description = "Reconnect cooldown active, see Retry-After"),
        (status = 502, description = "The session could not be created")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn initialize(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    debug!("POST Initialize connection");
    ConnectionApi::initialize(&app_state.connection).await?;
    let status = ConnectionApi::status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// POST tear down any session and start a new one, ignoring backoff and cooldown
#[utoipa::path(
    post,
    path = "/connection/reconnect",
    responses(
        (status = 200, description = "New session started", body = domain::Status),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "The session could not be created")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn force_reconnect(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    info!("POST Force reconnect");
    ConnectionApi::force_reconnect(&app_state.connection).await?;
    let status = ConnectionApi::status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// POST end the session and clear every reconnect counter
#[utoipa::path(
    post,
    path = "/connection/reset",
    responses(
        (status = 200, description = "Connection state reset", body = domain::Status),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn reset(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    info!("POST Reset connection");
    ConnectionApi::reset(&app_state.connection).await?;
    let status = ConnectionApi::status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// POST end the session without reconnecting
#[utoipa::path(
    post,
    path = "/connection/disconnect",
    responses(
        (status = 200, description = "Session ended", body = domain::Status),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn disconnect(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    info!("POST Disconnect");
    ConnectionApi::disconnect(&app_state.connection).await?;
    let status = ConnectionApi::status(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// DELETE the persisted credentials and start a fresh pairing flow
#[utoipa::path(
    delete,
    path = "/connection/credentials",
    responses(
        (status = 200, description = "Credentials removed; a new pairing code will follow", body = ClearedCredentials),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "The credential store could not be cleared")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn clear_credentials(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    info!("DELETE Persisted credentials");
    let removed = ConnectionApi::clear_credentials(&app_state.connection).await?;
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        ClearedCredentials { removed },
    )))
}
