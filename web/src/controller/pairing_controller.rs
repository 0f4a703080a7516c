use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::params::pairing::PairingParams;
use crate::{AppState, Error};
use domain::pairing as PairingApi;
use log::*;

/// GET the outstanding pairing code rendered as a QR code
#[utoipa::path(
    get,
    path = "/connection/pairing",
    params(PairingParams),
    responses(
        (status = 200, description = "Pairing code rendered in the requested format", body = domain::pairing::RenderedPairing),
        (status = 400, description = "Unknown format"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No pairing code is outstanding")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Query(params): Query<PairingParams>,
) -> Result<impl IntoResponse, Error> {
    let format = params.format.unwrap_or_default();
    debug!("GET Pairing code as {format:?}");

    let rendered = PairingApi::current(&app_state.connection, format.into()).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), rendered)))
}
