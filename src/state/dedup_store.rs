use std::sync::Arc;

use dashmap::DashSet;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::NotifiedRow;
use crate::error::Result;

/// Ids of sale events that have already produced a notification.
///
/// The SQLite table is the durable copy; `seen` mirrors it in memory so the
/// per-event check never touches the database. Ids are only ever added.
pub struct DedupStore {
    pool: SqlitePool,
    seen: DashSet<i64>,
}

impl DedupStore {
    /// Loads every id flagged in SQLite. Must resolve before the first poll cycle.
    pub async fn load(pool: SqlitePool) -> Result<Arc<Self>> {
        let rows: Vec<NotifiedRow> =
            sqlx::query_as("SELECT id, notified FROM notified_events")
                .fetch_all(&pool)
                .await?;

        let seen = DashSet::with_capacity(rows.len());
        for row in rows.into_iter().filter(|r| r.notified) {
            seen.insert(row.id);
        }
        info!(known = seen.len(), "Dedup store loaded {} notified events", seen.len());

        Ok(Arc::new(Self { pool, seen }))
    }

    pub fn has_notified(&self, id: i64) -> bool {
        self.seen.contains(&id)
    }

    /// Persists `id` then records it in memory. Rewriting an existing id is a no-op
    /// as far as callers can tell.
    pub async fn mark_notified(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notified_events (id, notified) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET notified = excluded.notified
            "#,
        )
        .bind(id)
        .bind(true)
        .execute(&self.pool)
        .await?;

        self.seen.insert(id);
        Ok(())
    }

    /// Number of ids flagged in SQLite, read from disk rather than the set.
    pub async fn persisted_count(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notified_events WHERE notified = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Reads the durable flag directly, bypassing the in-memory set.
    #[cfg(test)]
    pub async fn is_persisted(&self, id: i64) -> Result<bool> {
        let row: Option<NotifiedRow> =
            sqlx::query_as("SELECT id, notified FROM notified_events WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.notified).unwrap_or(false))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
