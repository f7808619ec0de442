use axum::extract::FromRef;

use crate::discovery::DiscoveryServices;
use std::sync::Arc;
use std::time::Instant;

use super::session::SessionStore;
use super::ServerConfig;

pub type GuardedSessionStore = Arc<SessionStore>;
pub type GuardedDiscoveryServices = Arc<DiscoveryServices>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub sessions: GuardedSessionStore,
    pub services: GuardedDiscoveryServices,
}

impl ServerState {
    pub fn new(config: ServerConfig, services: DiscoveryServices) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_string(),
            sessions: Arc::new(sessions),
            services: Arc::new(services),
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}

impl FromRef<ServerState> for GuardedDiscoveryServices {
    fn from_ref(input: &ServerState) -> Self {
        input.services.clone()
    }
}
