use super::RequestsLoggingLevel;
use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub bind_address: String,
    /// Serves this directory instead of the embedded page when set.
    pub frontend_dir_path: Option<String>,
    /// Idle browser sessions are forgotten after this long.
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            bind_address: "127.0.0.1".to_string(),
            frontend_dir_path: None,
            session_ttl: Duration::from_secs(3600),
        }
    }
}
