//! Bounded history persistence for upload summaries.
//!
//! The store owns the persisted record set exclusively: every append trims
//! the set back down to the [`HISTORY_KEEP`] most recent rows in the same
//! logical operation, so no reader ever observes more. Timestamps come from
//! an injected [`Clock`] so tests run against fixed time.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{AggregationResult, HistoryRecord};

// ---

/// Number of summaries that survive every append.
pub const HISTORY_KEEP: i64 = 5;

/// Source of the server-assigned upload timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, the production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a new record stamped with the store's clock, then trim the
    /// set down to the `HISTORY_KEEP` most recent entries. Trimming is part
    /// of the append, never deferred.
    async fn append(&self, result: &AggregationResult) -> Result<HistoryRecord>;

    /// Up to `n` records, most recent first. Read-only.
    async fn recent(&self, n: i64) -> Result<Vec<HistoryRecord>>;

    /// The most recent record, if any exists.
    async fn latest(&self) -> Result<Option<HistoryRecord>> {
        Ok(self.recent(1).await?.into_iter().next())
    }
}

// ---

/// Postgres-backed store. Insert and trim run in one transaction so
/// concurrent uploads cannot leave more than `HISTORY_KEEP` rows behind.
pub struct PgHistoryStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, result: &AggregationResult) -> Result<HistoryRecord> {
        // ---
        let at = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let record: HistoryRecord = sqlx::query_as(
            r#"
            INSERT INTO upload_history (
                uploaded_at, total_equipment,
                avg_flowrate, avg_pressure, avg_temperature
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING id, uploaded_at, total_equipment,
                      avg_flowrate, avg_pressure, avg_temperature
            "#,
        )
        .bind(at)
        .bind(result.row_count)
        .bind(result.avg_flowrate)
        .bind(result.avg_pressure)
        .bind(result.avg_temperature)
        .fetch_one(&mut *tx)
        .await?;

        // id breaks ties between equal timestamps
        sqlx::query(
            r#"
            DELETE FROM upload_history
            WHERE id NOT IN (
                SELECT id FROM upload_history
                ORDER BY uploaded_at DESC, id DESC
                LIMIT $1
            )
            "#,
        )
        .bind(HISTORY_KEEP)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn recent(&self, n: i64) -> Result<Vec<HistoryRecord>> {
        // ---
        let records = sqlx::query_as(
            r#"
            SELECT id, uploaded_at, total_equipment,
                   avg_flowrate, avg_pressure, avg_temperature
            FROM upload_history
            ORDER BY uploaded_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// ---

#[cfg(test)]
use anyhow::anyhow;
#[cfg(test)]
use std::sync::Mutex;

/// In-memory store with the same retention rule, holding its mutex across
/// append and trim. Backs the deterministic unit tests.
#[cfg(test)]
pub struct MemoryHistoryStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<MemoryInner>,
}

#[cfg(test)]
struct MemoryInner {
    next_id: i64,
    /// Most recent first.
    records: Vec<HistoryRecord>,
}

#[cfg(test)]
impl MemoryHistoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        // ---
        Self {
            clock,
            inner: Mutex::new(MemoryInner {
                next_id: 1,
                records: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, result: &AggregationResult) -> Result<HistoryRecord> {
        // ---
        let now = self.clock.now();
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("history store mutex poisoned"))?;

        // uploaded_at never decreases, even if the clock steps backwards
        let at = inner
            .records
            .first()
            .map_or(now, |newest| now.max(newest.uploaded_at));

        let record = HistoryRecord {
            id: inner.next_id,
            uploaded_at: at,
            total_equipment: result.row_count,
            avg_flowrate: result.avg_flowrate,
            avg_pressure: result.avg_pressure,
            avg_temperature: result.avg_temperature,
        };
        inner.next_id += 1;
        inner.records.insert(0, record.clone());
        inner.records.truncate(HISTORY_KEEP as usize);

        Ok(record)
    }

    async fn recent(&self, n: i64) -> Result<Vec<HistoryRecord>> {
        // ---
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("history store mutex poisoned"))?;
        Ok(inner.records.iter().take(n.max(0) as usize).cloned().collect())
    }
}

// ---

/// Test clock advanced by hand.
#[cfg(test)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn rewind(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() -= by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::EquipmentDistribution;
    use chrono::{Duration, TimeZone};

    fn sample_result(rows: i64) -> AggregationResult {
        // ---
        AggregationResult {
            row_count: rows,
            avg_flowrate: 15.0,
            avg_pressure: 150.0,
            avg_temperature: 27.666,
            equipment_distribution: EquipmentDistribution::default(),
        }
    }

    fn fixture() -> (Arc<ManualClock>, MemoryHistoryStore) {
        // ---
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let store = MemoryHistoryStore::new(Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, store)
    }

    #[tokio::test]
    async fn latest_on_empty_store_is_none() {
        // ---
        let (_, store) = fixture();
        assert!(store.latest().await.unwrap().is_none());
        assert!(store.recent(HISTORY_KEEP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_assigns_store_side_timestamps() {
        // ---
        let (clock, store) = fixture();
        let record = store.append(&sample_result(3)).await.unwrap();

        assert_eq!(record.uploaded_at, clock.now());
        assert_eq!(record.total_equipment, 3);
        assert_eq!(store.latest().await.unwrap().unwrap().id, record.id);
    }

    #[tokio::test]
    async fn retention_keeps_only_the_five_most_recent() {
        // ---
        let (clock, store) = fixture();

        for rows in 1..=6 {
            store.append(&sample_result(rows)).await.unwrap();
            clock.advance(Duration::minutes(1));

            let kept = store.recent(HISTORY_KEEP).await.unwrap();
            assert_eq!(kept.len() as i64, rows.min(5));
        }

        // uploads #2..=#6 survive, newest first
        let kept = store.recent(HISTORY_KEEP).await.unwrap();
        let counts: Vec<i64> = kept.iter().map(|r| r.total_equipment).collect();
        assert_eq!(counts, [6, 5, 4, 3, 2]);
        for pair in kept.windows(2) {
            assert!(pair[0].uploaded_at >= pair[1].uploaded_at);
        }
    }

    #[tokio::test]
    async fn recent_caps_at_the_requested_count() {
        // ---
        let (clock, store) = fixture();
        for rows in 1..=4 {
            store.append(&sample_result(rows)).await.unwrap();
            clock.advance(Duration::seconds(30));
        }

        assert_eq!(store.recent(2).await.unwrap().len(), 2);
        assert_eq!(store.recent(10).await.unwrap().len(), 4);
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timestamps_never_decrease_when_the_clock_rewinds() {
        // ---
        let (clock, store) = fixture();
        let first = store.append(&sample_result(1)).await.unwrap();

        clock.rewind(Duration::hours(1));
        let second = store.append(&sample_result(2)).await.unwrap();

        assert!(second.uploaded_at >= first.uploaded_at);
        let kept = store.recent(HISTORY_KEEP).await.unwrap();
        assert_eq!(kept[0].total_equipment, 2);
    }
}
