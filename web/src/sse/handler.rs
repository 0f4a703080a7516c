use crate::extractors::client_addr::ClientAddr;
use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use log::*;
use service::AppState;
use sse::message::Event as SseEvent;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// SSE handler streaming connection lifecycle events to a dashboard.
/// The stream opens with a snapshot of the detailed connection status.
#[utoipa::path(
    get,
    path = "/connection/events",
    responses(
        (status = 200, description = "text/event-stream of connection lifecycle events"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_token" = []),
        ("api_key" = [])
    )
)]
pub(crate) async fn sse_handler(
    ClientAddr(client): ClientAddr,
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Establishing SSE connection for {client}");

    let (tx, mut rx) = mpsc::unbounded_channel();

    let connection_id = app_state
        .sse_manager
        .register_connection(client.clone(), tx);

    match app_state.connection.detailed_status().await {
        Ok(status) => match serde_json::to_value(status) {
            Ok(status) => {
                app_state
                    .sse_manager
                    .send_to(&connection_id, &SseEvent::ConnectionStatus { status });
            }
            Err(e) => warn!("Failed to serialize connection status snapshot: {e}"),
        },
        Err(e) => warn!("No connection status snapshot for {client}: {e}"),
    }

    let manager = app_state.sse_manager.clone();

    // Create the stream - events arrive from the channel
    // The channel sends Result<Event, Infallible>, so we just pass them through
    let stream = stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }

        // Connection closed, clean up
        debug!("SSE connection closed for {client}, cleaning up");
        manager.unregister_connection(&connection_id);
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
