use super::state::ServerState;
use crate::discovery::{CredentialOverrides, DiscoveryResult};

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

pub const COOKIE_SESSION_KEY: &str = "discovery_session";

/// What the server remembers about one browser.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub credentials: CredentialOverrides,
    pub last_result: Option<DiscoveryResult>,
}

struct SessionEntry {
    session: UserSession,
    last_seen: Instant,
}

/// In-memory browser sessions, dropped after `ttl` without activity.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prune(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Expired {} browser session(s)", removed);
        }
    }

    /// Refreshes a known session. Returns false when the id is unknown or
    /// expired.
    pub fn touch(&self, id: &str) -> bool {
        let mut sessions = self.lock();
        self.prune(&mut sessions);
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Starts a new, empty session and returns its id.
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.lock();
        self.prune(&mut sessions);
        sessions.insert(
            id.clone(),
            SessionEntry {
                session: UserSession::default(),
                last_seen: Instant::now(),
            },
        );
        debug!("Created browser session, {} active", sessions.len());
        id
    }

    pub fn get(&self, id: &str) -> Option<UserSession> {
        self.lock().get(id).map(|entry| entry.session.clone())
    }

    pub fn credentials(&self, id: &str) -> CredentialOverrides {
        self.lock()
            .get(id)
            .map(|entry| entry.session.credentials.clone())
            .unwrap_or_default()
    }

    fn update<F: FnOnce(&mut UserSession)>(&self, id: &str, f: F) {
        let mut sessions = self.lock();
        let entry = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionEntry {
                session: UserSession::default(),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        f(&mut entry.session);
    }

    pub fn set_credentials(&self, id: &str, credentials: CredentialOverrides) {
        self.update(id, |session| session.credentials = credentials);
    }

    pub fn store_result(&self, id: &str, result: DiscoveryResult) {
        self.update(id, |session| session.last_result = Some(result));
    }

    /// Forgets the last result. Returns whether there was one.
    pub fn clear_result(&self, id: &str) -> bool {
        let mut cleared = false;
        self.update(id, |session| cleared = session.last_result.take().is_some());
        cleared
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The caller's browser session. A session is created when the request
/// carries no valid cookie; `jar` then holds the cookie to set, so
/// handlers should return it with their response.
pub struct BrowserSession {
    pub id: String,
    pub jar: CookieJar,
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_KEY, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

impl FromRequestParts<ServerState> for BrowserSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;

        let existing = jar
            .get(COOKIE_SESSION_KEY)
            .map(|cookie| cookie.value().to_string())
            .filter(|id| state.sessions.touch(id));

        Ok(match existing {
            Some(id) => BrowserSession { id, jar },
            None => {
                let id = state.sessions.create();
                let jar = jar.add(session_cookie(id.clone()));
                BrowserSession { id, jar }
            }
        })
    }
}
