use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use crate::models::{ErrorBody, HistoryEntry};
use crate::routes::AppState;
use crate::store::HISTORY_KEEP;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/history/", get(handler))
}

async fn handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    // ---
    if state.auth.authorize(&headers).is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Authentication required")),
        )
            .into_response();
    }

    match state.store.recent(HISTORY_KEEP).await {
        Ok(records) => {
            info!("GET /api/history/ - returning {} records", records.len());
            let entries: Vec<HistoryEntry> = records.into_iter().map(HistoryEntry::from).collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => {
            error!("Failed to query history: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to query history")),
            )
                .into_response()
        }
    }
}
