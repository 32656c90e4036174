//! Database schema management for the analytics backend.
//!
//! Ensures the upload history table exists before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `upload_history` table that backs the bounded history store.
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Bounded history of upload summaries served by /api/history/
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_history (
            id              BIGSERIAL PRIMARY KEY,
            uploaded_at     TIMESTAMPTZ      NOT NULL,
            total_equipment BIGINT           NOT NULL,
            avg_flowrate    DOUBLE PRECISION NOT NULL,
            avg_pressure    DOUBLE PRECISION NOT NULL,
            avg_temperature DOUBLE PRECISION NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Retention and the history endpoint both scan by recency
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_upload_history_uploaded_at
            ON upload_history (uploaded_at DESC, id DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
