use api_token::ApiToken;
use config::Config;
use rate_limit::RateLimiter;
use std::sync::Arc;

pub mod api_token;
pub mod config;
pub mod logging;
pub mod rate_limit;

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub connection: connection::Manager,
    pub sse_manager: Arc<sse::Manager>,
    pub api_token: Arc<ApiToken>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        app_config: Config,
        connection: connection::Manager,
        sse_manager: Arc<sse::Manager>,
        api_token: ApiToken,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            app_config.rate_limit_max_requests,
            app_config.rate_limit_window(),
        );
        Self {
            config: app_config,
            connection,
            sse_manager,
            api_token: Arc::new(api_token),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
