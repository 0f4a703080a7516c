use clap::builder::TypedValueParser as _;
use clap::Parser;
use connection::ManagerConfig;
use dotenvy::dotenv;
use log::LevelFilter;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use transport::SessionOptions;

/// Default WebSocket endpoint of the local session bridge.
pub const DEFAULT_SESSION_BRIDGE_URL: &str = "ws://127.0.0.1:8085/session";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Also append log output to this file.
    #[arg(long, env)]
    log_file: Option<PathBuf>,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Token API callers must present. A random one is generated at startup when unset.
    #[arg(long, env, hide_env_values = true)]
    api_token: Option<String>,

    /// Consecutive reconnect attempts before the connection manager cools down.
    #[arg(long, env, default_value_t = 5)]
    pub max_reconnect_attempts: u32,

    /// Reconnect attempt n waits n times this many milliseconds.
    #[arg(long, env, default_value_t = 5_000)]
    pub reconnect_base_delay_ms: u64,

    /// How long initialize is refused once the reconnect ceiling is reached.
    #[arg(long, env, default_value_t = 300_000)]
    pub reconnect_cooldown_ms: u64,

    /// Directory holding the persisted session credentials.
    #[arg(long, env, default_value = "auth_info")]
    credential_store_path: PathBuf,

    /// WebSocket URL of the session bridge that speaks to the remote network.
    #[arg(long, env, default_value = DEFAULT_SESSION_BRIDGE_URL)]
    session_bridge_url: String,

    /// Device label announced to the remote network when pairing.
    #[arg(long, env, default_value = "courier")]
    device_name: String,

    /// Suffix appended to normalized destination numbers.
    #[arg(long, env, default_value = "s.whatsapp.net")]
    address_domain: String,

    /// Seconds to wait for the bridge to acknowledge a send.
    #[arg(long, env, default_value_t = 30)]
    pub send_timeout_secs: u64,

    /// Requests each client may make per rate limit window.
    #[arg(long, env, default_value_t = 30)]
    pub rate_limit_max_requests: usize,

    /// Length of the sliding rate limit window in seconds.
    #[arg(long, env, default_value_t = 60)]
    pub rate_limit_window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Parse an explicit argument list instead of the process arguments. `.env` is not read.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Config::try_parse_from(args)
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn set_api_token(mut self, api_token: String) -> Self {
        self.api_token = Some(api_token);
        self
    }

    pub fn credential_store_path(&self) -> &Path {
        &self.credential_store_path
    }

    pub fn session_bridge_url(&self) -> &str {
        &self.session_bridge_url
    }

    pub fn address_domain(&self) -> &str {
        &self.address_domain
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Reconnection policy and session options for the connection manager.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            max_attempts: self.max_reconnect_attempts,
            base_retry_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            cooldown: Duration::from_millis(self.reconnect_cooldown_ms),
            session_options: SessionOptions {
                device_name: self.device_name.clone(),
                send_timeout: Duration::from_secs(self.send_timeout_secs),
            },
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}
