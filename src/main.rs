use connection::Manager;
use events::EventPublisher;
use log::*;
use service::{api_token::ApiToken, config::Config, logging::Logger, AppState};
use std::sync::Arc;
use transport::{bridge::BridgeTransportFactory, credentials::FileCredentialStore};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting courier_rs in {} mode, session bridge at {}",
        config.runtime_env(),
        config.session_bridge_url()
    );

    let store = match FileCredentialStore::open(config.credential_store_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                "Failed to open credential store at {}: {e}",
                config.credential_store_path().display()
            );
            std::process::exit(1);
        }
    };

    let sse_manager = Arc::new(sse::Manager::new());
    let publisher = EventPublisher::new().with_handler(Arc::new(
        sse::SseDomainEventHandler::new(Arc::clone(&sse_manager)),
    ));

    let connection = Manager::spawn(
        config.manager_config(),
        Arc::new(BridgeTransportFactory::new(config.session_bridge_url())),
        store,
        publisher,
    );

    if let Err(e) = connection.initialize().await {
        warn!("Initial connection attempt failed: {e}");
    }

    let (api_token, generated) = ApiToken::resolve(config.api_token());
    if let Some(token) = generated {
        warn!("No API token configured, generated one for this run");
        println!("API token: {token}");
    }

    let app_state = AppState::new(config, connection.clone(), sse_manager, api_token);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
        }
        info!("Shutdown signal received");
    };

    let served = web::init_server(app_state, shutdown).await;
    if let Err(e) = &served {
        error!("Server stopped with an error: {e}");
    }

    if let Err(e) = connection.disconnect().await {
        warn!("Failed to disconnect cleanly: {e}");
    }

    if served.is_err() {
        std::process::exit(1);
    }
}
