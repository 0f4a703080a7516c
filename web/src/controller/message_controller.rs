use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::controller::ApiResponse;
use crate::{AppState, Error};
use domain::notification as NotificationApi;
use log::*;

/// Request body for sending a notification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// International number, optionally prefixed with `+`.
    #[schema(example = "+15551234567")]
    pub destination: String,
    pub body: String,
}

/// POST send a notification over the open session
#[utoipa::path(
    post,
    path = "/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Accepted by the messaging network", body = domain::notification::SentNotification),
        (status = 400, description = "Malformed destination or empty body"),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many requests"),
        (status = 502, description = "The messaging network rejected or timed out the send"),
        (status = 503, description = "Not connected, see Retry-After")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Send message to {}", request.destination);

    let sent = NotificationApi::send(
        &app_state.connection,
        app_state.config.address_domain(),
        &request.destination,
        &request.body,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sent)))
}
