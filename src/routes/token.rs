use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::ErrorBody;
use crate::routes::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/token/", post(handler))
}

/// Credentials posted by the desktop client.
#[derive(Debug, Deserialize)]
struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access: String,
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> impl IntoResponse {
    // ---
    match state.auth.issue(&request.username, &request.password) {
        Some(access) => {
            info!("POST /api/token/ - issued token for {}", request.username);
            (StatusCode::OK, Json(TokenResponse { access })).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Invalid username or password")),
        )
            .into_response(),
    }
}
