use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use crate::models::ErrorBody;
use crate::report::{self, ReportError, REPORT_FILENAME};
use crate::routes::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/report/", get(handler))
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

    let record = match state.store.latest().await {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to load latest summary: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to query history")),
            )
                .into_response();
        }
    };

    match report::render(record.as_ref()) {
        Ok(pdf) => {
            info!("GET /api/report/ - rendered {} bytes", pdf.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{REPORT_FILENAME}\""),
                    ),
                ],
                pdf,
            )
                .into_response()
        }
        Err(ReportError::NoData) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("No data available to generate report")),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render report: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to render report")),
            )
                .into_response()
        }
    }
}
