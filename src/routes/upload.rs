use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::{ErrorBody, UploadResponse};
use crate::routes::AppState;
use crate::store::HistoryStore;
use crate::{aggregate, table};

// ---

pub fn router() -> Router<AppState> {
    // ---
    // telemetry exports routinely exceed axum's 2 MB default body cap
    Router::new()
        .route("/api/upload/", post(handler))
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
}

async fn handler(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    // ---
    info!("POST /api/upload/ - Starting pipeline");

    // Step 1: pull the file field out of the multipart body
    let Some(raw) = file_field(multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("No file uploaded")),
        )
            .into_response();
    };

    debug!("POST /api/upload/ - received {} bytes", raw.len());

    // Steps 2-5: parse, validate, aggregate, persist (retention included)
    match process_upload(state.store.as_ref(), &raw).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(UploadError::Parse(e)) => {
            debug!("Rejected upload: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new("Invalid CSV file")),
            )
                .into_response()
        }
        Err(UploadError::Validation(e)) => {
            debug!("Rejected upload: {:?}", e);
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))).into_response()
        }
        Err(UploadError::Store(e)) => {
            error!("Failed to persist upload summary: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to store results")),
            )
                .into_response()
        }
    }
}

// ---

#[derive(Debug, Error)]
enum UploadError {
    #[error(transparent)]
    Parse(#[from] table::ParseError),
    #[error(transparent)]
    Validation(#[from] table::ValidationError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Run one upload end-to-end: parse, validate, aggregate, persist. The
/// returned body carries the distribution even though the store keeps only
/// the scalar summary.
async fn process_upload(
    store: &dyn HistoryStore,
    raw: &[u8],
) -> Result<UploadResponse, UploadError> {
    // ---
    let table = table::parse(raw)?;
    table::validate(&table)?;

    let result = aggregate::aggregate(&table);
    let record = store.append(&result).await?;

    info!(
        "Stored upload summary id={} rows={} categories={}",
        record.id,
        result.row_count,
        result.equipment_distribution.pairs().len()
    );
    Ok(UploadResponse::new(result))
}

/// Extract the bytes of the multipart field named `file`, if present.
async fn file_field(mut multipart: Multipart) -> Option<Vec<u8>> {
    // ---
    while let Some(field) = multipart.next_field().await.ok()? {
        if field.name() == Some("file") {
            return field.bytes().await.ok().map(|bytes| bytes.to_vec());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::{Clock, HistoryStore, ManualClock, MemoryHistoryStore, HISTORY_KEEP};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const SAMPLE: &[u8] = b"Flowrate,Pressure,Temperature,Equipment\n\
        10,100,25,Pump\n\
        20,200,30,Valve\n\
        15,150,28,Pump\n";

    fn memory_store() -> MemoryHistoryStore {
        // ---
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        MemoryHistoryStore::new(clock as Arc<dyn Clock>)
    }

    #[tokio::test]
    async fn successful_upload_responds_and_persists() {
        // ---
        let store = memory_store();

        let response = process_upload(&store, SAMPLE).await.unwrap();
        assert_eq!(response.message, "File processed successfully");
        assert_eq!(response.total_equipment, 3);
        assert_eq!(response.avg_flowrate, 15.0);
        assert_eq!(response.avg_pressure, 150.0);
        assert_eq!(response.avg_temperature, 27.67);
        assert_eq!(
            response.equipment_distribution.pairs(),
            [("Pump".to_string(), 2), ("Valve".to_string(), 1)]
        );

        let kept = store.recent(HISTORY_KEEP).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].total_equipment, 3);
    }

    #[tokio::test]
    async fn missing_column_never_reaches_the_store() {
        // ---
        let store = memory_store();
        let raw = b"Flowrate,Temperature,Equipment\n10,25,Pump\n";

        let err = process_upload(&store, raw).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "CSV must contain Flowrate, Pressure, Temperature columns"
        );
        assert!(store.recent(HISTORY_KEEP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_bytes_never_reach_the_store() {
        // ---
        let store = memory_store();

        let err = process_upload(&store, b"").await.unwrap_err();
        assert!(matches!(err, UploadError::Parse(_)));
        assert!(store.recent(HISTORY_KEEP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn six_uploads_leave_five_records() {
        // ---
        let store = memory_store();

        for _ in 0..6 {
            process_upload(&store, SAMPLE).await.unwrap();
        }

        let kept = store.recent(HISTORY_KEEP).await.unwrap();
        assert_eq!(kept.len(), 5);
        // uploads #2..=#6 survive by recency
        let ids: Vec<i64> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, [6, 5, 4, 3, 2]);
    }

    #[tokio::test]
    async fn empty_table_produces_null_like_averages() {
        // ---
        let store = memory_store();

        let response = process_upload(&store, b"Flowrate,Pressure,Temperature\n")
            .await
            .unwrap();
        assert_eq!(response.total_equipment, 0);
        assert!(response.avg_flowrate.is_nan());

        // NaN averages reach the wire as null, never as 0
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["avg_flowrate"].is_null());
    }
}
