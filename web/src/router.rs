use crate::{
    controller::health_check_controller,
    middleware::{auth::require_auth, rate_limit::limit_requests},
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::controller::{
    connection_controller, message_controller, pairing_controller,
};
use crate::sse::handler as sse_handler;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Courier Notification API"
        ),
        paths(
            health_check_controller::health_check,
            connection_controller::status,
            connection_controller::detailed_status,
            connection_controller::initialize,
            connection_controller::force_reconnect,
            connection_controller::reset,
            connection_controller::disconnect,
            connection_controller::clear_credentials,
            pairing_controller::read,
            message_controller::create,
            sse_handler::sse_handler,
        ),
        components(
            schemas(
                domain::Status,
                domain::DetailedStatus,
                domain::Phase,
                domain::notification::SentNotification,
                domain::pairing::RenderedPairing,
                connection_controller::ClearedCredentials,
                message_controller::SendMessageRequest,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "courier", description = "Notification sending over a paired messaging session")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the API token requirement for OpenAPI: a bearer token, or the same
// token in the x-api-key header.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-api-key",
                    "The API token, for clients that cannot set an Authorization header",
                ))),
            );
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(connection_routes(app_state.clone()))
        .merge(pairing_routes(app_state.clone()))
        .merge(event_routes(app_state.clone()))
        .merge(message_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

// Every authenticated router is wrapped the same way: the rate limit runs
// first, then the token check.
fn protect(router: Router<AppState>, app_state: AppState) -> Router {
    router
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .route_layer(from_fn_with_state(app_state.clone(), limit_requests))
        .with_state(app_state)
}

fn connection_routes(app_state: AppState) -> Router {
    let router = Router::new()
        .route("/connection/status", get(connection_controller::status))
        .route(
            "/connection/status/detailed",
            get(connection_controller::detailed_status),
        )
        .route(
            "/connection/initialize",
            post(connection_controller::initialize),
        )
        .route(
            "/connection/reconnect",
            post(connection_controller::force_reconnect),
        )
        .route("/connection/reset", post(connection_controller::reset))
        .route(
            "/connection/disconnect",
            post(connection_controller::disconnect),
        )
        .route(
            "/connection/credentials",
            delete(connection_controller::clear_credentials),
        );
    protect(router, app_state)
}

fn pairing_routes(app_state: AppState) -> Router {
    let router = Router::new().route("/connection/pairing", get(pairing_controller::read));
    protect(router, app_state)
}

fn event_routes(app_state: AppState) -> Router {
    let router = Router::new().route("/connection/events", get(sse_handler::sse_handler));
    protect(router, app_state)
}

fn message_routes(app_state: AppState) -> Router {
    let router = Router::new().route("/messages", post(message_controller::create));
    protect(router, app_state)
}
