use crate::error::PipelineError;
use crate::sql::SanitizedSql;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum rows rendered to the user, independent of true match count.
pub const PREVIEW_ROW_LIMIT: usize = 10;

/// Column names in execution-engine order plus stringified rows, truncated
/// to the preview cap. `total_rows` is the true count before truncation.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// Seam between the pipeline and the database, so the pipeline is testable
/// against a fake without a live Postgres.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, sql: &SanitizedSql) -> Result<QueryResult, PipelineError>;
}

pub struct PgQueryRunner {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgQueryRunner {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }
}

#[async_trait]
impl QueryRunner for PgQueryRunner {
    async fn run(&self, sql: &SanitizedSql) -> Result<QueryResult, PipelineError> {
        // begin() acquires a pooled connection, bounded by the pool's
        // acquire timeout, and opens a transaction on it.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error(e, sql.as_str()))?;

        let fetched = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(sql.as_str()).fetch_all(&mut *tx),
        )
        .await;

        // Read-only safety net: end the transaction with a rollback on every
        // exit path, even though the statement is expected to be a SELECT.
        if let Err(e) = tx.rollback().await {
            warn!("rollback after query failed: {}", e);
        }

        let all_rows = match fetched {
            Err(_) => {
                return Err(PipelineError::QueryTimeout {
                    sql: sql.as_str().to_string(),
                });
            }
            Ok(Err(e)) => return Err(map_db_error(e, sql.as_str())),
            Ok(Ok(rows)) => rows,
        };

        let total_rows = all_rows.len();
        let columns: Vec<String> = all_rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Vec<String>> = all_rows
            .iter()
            .take(PREVIEW_ROW_LIMIT)
            .map(|row| {
                (0..row.columns().len())
                    .map(|idx| decode_cell(row, idx))
                    .collect()
            })
            .collect();

        debug!("query returned {} rows ({} shown)", total_rows, rows.len());

        Ok(QueryResult {
            columns,
            rows,
            total_rows,
        })
    }
}

pub(crate) fn map_db_error(err: sqlx::Error, sql: &str) -> PipelineError {
    match err {
        sqlx::Error::PoolTimedOut => PipelineError::QueryExecution {
            message: "connection pool exhausted: timed out waiting for a database connection"
                .to_string(),
            sql: sql.to_string(),
        },
        other => PipelineError::QueryExecution {
            message: other.to_string(),
            sql: sql.to_string(),
        },
    }
}

/// Stringifies one cell using the result descriptor's type, not the data.
fn decode_cell(row: &PgRow, idx: usize) -> String {
    let type_name = row.columns()[idx].type_info().name();
    match type_name {
        "BOOL" => fmt_cell(row.try_get::<Option<bool>, _>(idx)),
        "INT2" => fmt_cell(row.try_get::<Option<i16>, _>(idx)),
        "INT4" => fmt_cell(row.try_get::<Option<i32>, _>(idx)),
        "INT8" => fmt_cell(row.try_get::<Option<i64>, _>(idx)),
        "FLOAT4" => fmt_cell(row.try_get::<Option<f32>, _>(idx)),
        "FLOAT8" => fmt_cell(row.try_get::<Option<f64>, _>(idx)),
        "NUMERIC" => fmt_cell(row.try_get::<Option<Decimal>, _>(idx)),
        "DATE" => fmt_cell(row.try_get::<Option<NaiveDate>, _>(idx)),
        "TIMESTAMP" => fmt_cell(row.try_get::<Option<NaiveDateTime>, _>(idx)),
        "TIMESTAMPTZ" => fmt_cell(row.try_get::<Option<DateTime<Utc>>, _>(idx)),
        _ => fmt_cell(row.try_get::<Option<String>, _>(idx)),
    }
}

fn fmt_cell<T: std::fmt::Display>(value: Result<Option<T>, sqlx::Error>) -> String {
    match value {
        Ok(Some(v)) => v.to_string(),
        Ok(None) => "NULL".to_string(),
        Err(_) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_maps_to_query_execution_error() {
        let err = map_db_error(sqlx::Error::PoolTimedOut, "SELECT 1");
        match err {
            PipelineError::QueryExecution { message, sql } => {
                assert!(message.contains("pool exhausted"));
                assert_eq!(sql, "SELECT 1");
            }
            other => panic!("expected QueryExecution, got {:?}", other),
        }
    }

    #[test]
    fn driver_errors_carry_the_sql() {
        let err = map_db_error(
            sqlx::Error::Protocol("unexpected message".to_string()),
            "SELECT region FROM public.sales_daily",
        );
        match err {
            PipelineError::QueryExecution { sql, .. } => {
                assert_eq!(sql, "SELECT region FROM public.sales_daily");
            }
            other => panic!("expected QueryExecution, got {:?}", other),
        }
    }
}
