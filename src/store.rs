//! History storage. `MemoryHistoryStore` is process-local; `PgHistoryStore` keeps records in
//! `{schema}.project_history`, schema from `APPGEN_HISTORY_SCHEMA` env (default `generator_governance`).

use crate::error::HistoryError;
use crate::history::{HistoryRecord, HistoryRecordSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::RwLock;
use uuid::Uuid;

/// Narrow append-only interface the recorder depends on.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError>;
    async fn list(&self) -> Result<Vec<HistoryRecordSummary>, HistoryError>;
    async fn fetch(&self, id: Uuid) -> Result<Option<HistoryRecord>, HistoryError>;
    async fn ping(&self) -> Result<(), HistoryError>;
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

fn poisoned<T>(_: T) -> HistoryError {
    HistoryError::StorageUnavailable("history lock poisoned".into())
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.records.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryRecordSummary>, HistoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().rev().map(HistoryRecord::summary).collect())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<HistoryRecord>, HistoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        let _records = self.records.read().map_err(poisoned)?;
        Ok(())
    }
}

/// Schema for the history table. From env `APPGEN_HISTORY_SCHEMA`, default `generator_governance`.
pub fn history_schema() -> String {
    std::env::var("APPGEN_HISTORY_SCHEMA").unwrap_or_else(|_| "generator_governance".into())
}

fn valid_pg_identifier(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}

pub struct PgHistoryStore {
    pool: PgPool,
    table: String,
}

impl PgHistoryStore {
    /// Wrap a pool; the schema must be a plain lowercase identifier since it is spliced into SQL.
    pub fn new(pool: PgPool, schema: &str) -> Result<Self, HistoryError> {
        if !valid_pg_identifier(schema) {
            return Err(HistoryError::StorageUnavailable(format!(
                "invalid history schema name '{}'",
                schema
            )));
        }
        Ok(PgHistoryStore {
            pool,
            table: format!("{}.project_history", schema),
        })
    }

    fn schema(&self) -> &str {
        self.table.split('.').next().unwrap_or_default()
    }

    /// Create the schema and the append-only history table if missing.
    pub async fn ensure_history_table(&self) -> Result<(), HistoryError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema()))
            .execute(&self.pool)
            .await?;
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                requester TEXT NOT NULL,
                project_name TEXT NOT NULL,
                database_name TEXT NOT NULL,
                table_count BIGINT NOT NULL,
                column_count BIGINT NOT NULL,
                generated_at TIMESTAMPTZ NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                payload JSONB NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

type SummaryRow = (Uuid, String, String, String, i64, i64, DateTime<Utc>, DateTime<Utc>);

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let payload = serde_json::to_value(&record.artifacts)
            .map_err(|e| HistoryError::Corrupt(e.to_string()))?;
        let sql = format!(
            "INSERT INTO {} (id, requester, project_name, database_name, table_count, column_count, generated_at, recorded_at, payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            self.table
        );
        tracing::debug!(sql = %sql, id = %record.id, "history append");
        sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.requester)
            .bind(&record.artifacts.project.project_name)
            .bind(&record.artifacts.database)
            .bind(record.artifacts.table_count() as i64)
            .bind(record.artifacts.column_count() as i64)
            .bind(record.artifacts.generated_at)
            .bind(record.recorded_at)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryRecordSummary>, HistoryError> {
        let sql = format!(
            "SELECT id, requester, project_name, database_name, table_count, column_count, generated_at, recorded_at \
             FROM {} ORDER BY recorded_at DESC",
            self.table
        );
        tracing::debug!(sql = %sql, "history list");
        let rows: Vec<SummaryRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, requester, project_name, database, tables, columns, generated_at, recorded_at)| {
                    HistoryRecordSummary {
                        id,
                        project_name,
                        database,
                        requester,
                        generated_at,
                        recorded_at,
                        table_count: tables.max(0) as usize,
                        column_count: columns.max(0) as usize,
                    }
                },
            )
            .collect())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<HistoryRecord>, HistoryError> {
        let sql = format!(
            "SELECT requester, recorded_at, payload FROM {} WHERE id = $1",
            self.table
        );
        tracing::debug!(sql = %sql, id = %id, "history fetch");
        let row: Option<(String, DateTime<Utc>, serde_json::Value)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some((requester, recorded_at, payload)) => {
                let artifacts = serde_json::from_value(payload)
                    .map_err(|e| HistoryError::Corrupt(format!("{}: {}", id, e)))?;
                Ok(Some(HistoryRecord {
                    id,
                    requester,
                    recorded_at,
                    artifacts,
                }))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Database named by a history URL, with options for the server's `postgres` maintenance database.
struct HistoryDatabase {
    name: Option<String>,
    maintenance: PgConnectOptions,
}

impl HistoryDatabase {
    fn from_url(database_url: &str) -> Result<Self, HistoryError> {
        let opts = PgConnectOptions::from_str(database_url)
            .map_err(|e| HistoryError::StorageUnavailable(format!("invalid DATABASE_URL: {}", e)))?;
        let name = opts
            .get_database()
            .filter(|db| !db.is_empty() && *db != "postgres")
            .map(str::to_string);
        Ok(HistoryDatabase {
            name,
            maintenance: opts.database("postgres"),
        })
    }
}

/// Create the history database if the server lacks it. Run before the main pool connects.
/// Only plain lowercase names are created; anything else must be provisioned by hand.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), HistoryError> {
    let target = HistoryDatabase::from_url(database_url)?;
    let Some(name) = target.name else {
        return Ok(());
    };
    if !valid_pg_identifier(&name) {
        return Err(HistoryError::StorageUnavailable(format!(
            "history database name {:?} must be created manually",
            name
        )));
    }
    let mut conn = target.maintenance.connect().await?;
    let (present,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&name)
        .fetch_one(&mut conn)
        .await?;
    if !present {
        sqlx::query(&format!("CREATE DATABASE {}", name)).execute(&mut conn).await?;
        tracing::info!(database = %name, "history database created");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_database_targets_maintenance_db() {
        let target =
            HistoryDatabase::from_url("postgres://u:p@localhost:5432/governance?sslmode=disable").unwrap();
        assert_eq!(target.name.as_deref(), Some("governance"));
        assert_eq!(target.maintenance.get_database(), Some("postgres"));
        assert_eq!(target.maintenance.get_host(), "localhost");
        assert_eq!(target.maintenance.get_port(), 5432);

        let admin = HistoryDatabase::from_url("postgres://u:p@localhost:5432/postgres").unwrap();
        assert_eq!(admin.name, None);
        assert!(HistoryDatabase::from_url("not a url").is_err());
    }

    #[test]
    fn history_schema_must_be_plain_identifier() {
        assert!(valid_pg_identifier("generator_governance"));
        assert!(!valid_pg_identifier("gov; DROP TABLE x"));
        assert!(!valid_pg_identifier("1abc"));
        assert!(!valid_pg_identifier(""));
    }
}
