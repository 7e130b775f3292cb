use std::env;

use log::*;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8360;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Configuration for the external communication-thread service. `None` disables thread integration entirely;
    /// negotiations still work, they just have no chat thread attached.
    pub thread_service: Option<ThreadServiceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: String::default(),
            thread_service: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = env::var("MKT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MKT_PORT. {e} Using the default, {DEFAULT_MKT_PORT}, instead."
                    );
                    DEFAULT_MKT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MKT_PORT);
        let database_url = market_engine::sqlite::db::db_url();
        let thread_service = ThreadServiceConfig::from_env();
        Self { host, port, database_url, thread_service }
    }
}

#[derive(Clone, Debug)]
pub struct ThreadServiceConfig {
    /// Base url of the thread service, e.g. "https://threads.internal:8443".
    pub base_url: String,
    pub api_key: String,
}

impl ThreadServiceConfig {
    pub fn from_env() -> Option<Self> {
        let base_url = match env::var("MKT_THREAD_SERVICE_URL") {
            Ok(url) => url,
            Err(_) => {
                warn!("🪛️ MKT_THREAD_SERVICE_URL not set. Thread integration is disabled.");
                return None;
            },
        };
        let api_key = env::var("MKT_THREAD_SERVICE_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ MKT_THREAD_SERVICE_API_KEY not set, using an empty key");
            String::new()
        });
        Some(Self { base_url, api_key })
    }
}
