use std::sync::Arc;

use axum::Router;

use crate::auth::TokenRegistry;
use crate::store::HistoryStore;

mod health;
mod history;
mod report;
mod token;
mod upload;

// ---

/// Shared state handed to every route handler. The store and the token
/// registry are injected so tests can swap in deterministic backends.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HistoryStore>,
    pub auth: Arc<TokenRegistry>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(token::router())
        .merge(upload::router())
        .merge(history::router())
        .merge(report::router())
        .merge(health::router())
        .with_state(state)
}
