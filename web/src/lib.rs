use axum::http::{header, HeaderName, HeaderValue, Method};
use log::*;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
pub mod error;
mod extractors;
mod middleware;
mod params;
mod router;
mod sse;

#[cfg(test)]
mod tests;

pub use router::define_routes;

/// Binds the configured interface and serves the API until `shutdown` resolves.
pub async fn init_server(
    app_state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let interface = app_state.config.interface.as_deref().unwrap_or("127.0.0.1");
    let server_url = format!("{interface}:{}", app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    spawn_rate_limit_pruning(&app_state);

    let app = define_routes(app_state.clone()).layer(cors_layer(&app_state.config.allowed_origins));

    info!("Server starting... listening for connections on http://{server_url}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::auth::API_KEY_HEADER),
        ])
}

/// Forgets idle clients once per rate limit window.
fn spawn_rate_limit_pruning(app_state: &AppState) {
    let limiter = Arc::clone(&app_state.rate_limiter);
    let window = app_state.config.rate_limit_window();
    if window.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            limiter.prune();
            trace!(
                "Rate limiter tracking {} client(s)",
                limiter.tracked_clients()
            );
        }
    });
}
