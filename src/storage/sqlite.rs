//! SQLite implementation of OpportunityLog.

use crate::domain::{Confidence, DiscardReason, OpportunityKind, OpportunityRecord};
use crate::storage::{OpportunityLog, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

/// SqliteLog implements OpportunityLog using SQLite.
pub struct SqliteLog {
    pool: Pool<Sqlite>,
}

/// SqliteLogConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteLogConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteLogConfig {
    fn default() -> Self {
        Self {
            path: "data/decisions.db".to_string(),
            max_connections: 5,
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, ts_ms, kind, pair, route, venues, spread_gross, spread_net,
        simulated_pnl, confidence, discard_reason, realized_net
    FROM decisions
"#;

impl SqliteLog {
    /// Opens (creating if missing) the database and runs migrations.
    pub async fn new(config: SqliteLogConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let log = Self { pool };

        log.migrate().await?;

        info!(path = %config.path, "SQLite decision log initialized");
        Ok(log)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decisions (
                id TEXT PRIMARY KEY,
                ts_ms INTEGER NOT NULL,
                kind TEXT NOT NULL,
                pair TEXT NOT NULL,
                route TEXT NOT NULL,
                venues TEXT NOT NULL,
                spread_gross TEXT,
                spread_net TEXT,
                simulated_pnl TEXT,
                confidence TEXT,
                discard_reason TEXT,
                realized_net TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_decisions_ts ON decisions(ts_ms)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_decisions_pair ON decisions(pair)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn opt_string<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

#[async_trait]
impl OpportunityLog for SqliteLog {
    async fn append(&self, records: &[OpportunityRecord]) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            let venues = serde_json::to_string(&record.venues)
                .map_err(|e| StorageError::InvalidData(format!("venues: {}", e)))?;

            let result = sqlx::query(
                r#"
                INSERT INTO decisions (
                    id, ts_ms, kind, pair, route, venues, spread_gross, spread_net,
                    simulated_pnl, confidence, discard_reason, realized_net
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(&record.id)
            .bind(record.timestamp.timestamp_millis())
            .bind(record.kind.to_string())
            .bind(&record.pair)
            .bind(&record.route)
            .bind(venues)
            .bind(opt_string(record.spread_gross))
            .bind(opt_string(record.spread_net))
            .bind(opt_string(record.simulated_pnl))
            .bind(opt_string(record.confidence))
            .bind(opt_string(record.discard_reason))
            .bind(opt_string(record.realized_net_percent))
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected() as usize;
        }

        tx.commit().await?;

        if written > 0 {
            debug!(rows = written, "Decision rows appended");
        }
        Ok(written)
    }

    async fn history(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OpportunityRecord>, StorageError> {
        let since_ms = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);
        let sql = format!("{} WHERE ts_ms >= ? ORDER BY ts_ms ASC, id ASC", SELECT_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(since_ms)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(parse_record_row).collect()
    }

    async fn record_outcome(
        &self,
        id: &str,
        realized_net_percent: Decimal,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE decisions SET realized_net = ?1 WHERE id = ?2 AND discard_reason IS NULL",
        )
        .bind(realized_net_percent.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        debug!(id = %id, realized = %realized_net_percent, "Outcome recorded");
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM decisions")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

fn parse_decimal(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Option<Decimal>, StorageError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        Decimal::from_str(&s)
            .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
    })
    .transpose()
}

/// Parses a decision record from a database row.
fn parse_record_row(row: &sqlx::sqlite::SqliteRow) -> Result<OpportunityRecord, StorageError> {
    let kind_str: String = row.try_get("kind")?;
    let kind = OpportunityKind::from_str(&kind_str).map_err(StorageError::InvalidData)?;

    let ts_ms: i64 = row.try_get("ts_ms")?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .ok_or_else(|| StorageError::InvalidData(format!("Invalid ts_ms: {}", ts_ms)))?;

    let venues_json: String = row.try_get("venues")?;
    let venues: Vec<String> = serde_json::from_str(&venues_json)
        .map_err(|e| StorageError::InvalidData(format!("Invalid venues: {}", e)))?;

    let confidence = row
        .try_get::<Option<String>, _>("confidence")?
        .map(|s| Confidence::from_str(&s).map_err(StorageError::InvalidData))
        .transpose()?;

    let discard_reason = row
        .try_get::<Option<String>, _>("discard_reason")?
        .map(|s| DiscardReason::from_str(&s).map_err(StorageError::InvalidData))
        .transpose()?;

    Ok(OpportunityRecord {
        id: row.try_get("id")?,
        timestamp,
        kind,
        pair: row.try_get("pair")?,
        route: row.try_get("route")?,
        venues,
        spread_gross: parse_decimal(row, "spread_gross")?,
        spread_net: parse_decimal(row, "spread_net")?,
        simulated_pnl: parse_decimal(row, "simulated_pnl")?,
        confidence,
        discard_reason,
        realized_net_percent: parse_decimal(row, "realized_net")?,
    })
}
