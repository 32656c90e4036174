//! Bearer-token authentication for the query endpoints.
//!
//! Tokens are opaque uuid strings held in an in-memory registry and expire
//! after 24 hours. A single operator credential pair comes from the
//! configuration; there is no user database behind this service.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::store::Clock;

// ---

/// Issued tokens expire this many hours after issuance.
const TOKEN_TTL_HOURS: i64 = 24;

struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Validates operator credentials and tracks issued bearer tokens.
pub struct TokenRegistry {
    username: String,
    password: String,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl TokenRegistry {
    pub fn new(username: String, password: String, clock: Arc<dyn Clock>) -> Self {
        // ---
        Self {
            username,
            password,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token when the credentials match the configured
    /// operator account.
    pub fn issue(&self, username: &str, password: &str) -> Option<String> {
        // ---
        if username != self.username || password != self.password {
            return None;
        }

        let token = Uuid::new_v4().to_string();
        let session = Session {
            username: username.to_string(),
            expires_at: self.clock.now() + Duration::hours(TOKEN_TTL_HOURS),
        };

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.insert(token.clone(), session);

        Some(token)
    }

    /// Resolve a token to its username. Expired tokens are dropped on sight.
    pub fn validate(&self, token: &str) -> Option<String> {
        // ---
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match sessions.get(token) {
            Some(session) if session.expires_at > now => Some(session.username.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Authorize a request from its `Authorization: Bearer <token>` header.
    pub fn authorize(&self, headers: &HeaderMap) -> Option<String> {
        // ---
        let token = bearer_token(headers)?;
        self.validate(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    // ---
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
