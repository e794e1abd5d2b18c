//! Schema-bound SQLite table wrapper.
//!
//! A `RelationalStore` owns one database file and one table inside it. The
//! table is created from a caller-supplied definition statement on open, and
//! its column names are introspected once and cached. Writes only ever touch
//! known columns; unknown keys in input rows are dropped with a warning.
//!
//! Every operation holds the process-wide lock for the database path (see
//! [`crate::lock`]) for its whole critical section, and batch writes run in a
//! single transaction, so concurrent callers never observe interleaved
//! partial writes. The pool has a single connection for the same reason.

use std::path::{Path, PathBuf};
use std::time::Duration;

use memoria_types::error::StoreError;
use memoria_types::value::{Row, SqlValue};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::value::{bind_value, decode_row};
use crate::lock::{location_lock, release_location_lock, LocationLock};

/// Schema-bound persistent table.
pub struct RelationalStore {
    pool: SqlitePool,
    path: PathBuf,
    table: String,
    create_table_sql: String,
    columns: Vec<String>,
    lock: LocationLock,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Primary SQLite result codes that mean the file itself cannot be used:
/// READONLY, IOERR, FULL, CANTOPEN.
const UNAVAILABLE_RESULT_CODES: [i32; 4] = [8, 10, 13, 14];

/// Whether a (possibly extended) SQLite result code reports an I/O-class failure.
fn is_unavailable_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|code| UNAVAILABLE_RESULT_CODES.contains(&(code & 0xff)))
        .unwrap_or(false)
}

fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| is_unavailable_code(&code)) =>
        {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Query(err.to_string()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// RelationalStore
// ---------------------------------------------------------------------------

impl RelationalStore {
    /// Open (creating if needed) `path` and ensure `table` exists by running
    /// `create_table_sql`, which should be idempotent (`CREATE TABLE IF NOT EXISTS`).
    pub async fn open(
        path: impl AsRef<Path>,
        table: &str,
        create_table_sql: &str,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !is_identifier(table) {
            return Err(StoreError::Schema(format!("invalid table name '{table}'")));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;

        let lock = location_lock(&path);
        let columns = {
            let _guard = lock.lock().await;
            sqlx::raw_sql(create_table_sql)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::Schema(format!("table definition failed: {e}")))?;
            Self::introspect_columns(&pool, table).await?
        };

        tracing::info!(
            path = %path.display(),
            table = %table,
            columns = columns.len(),
            "relational store opened"
        );

        Ok(Self {
            pool,
            path,
            table: table.to_string(),
            create_table_sql: create_table_sql.to_string(),
            columns,
            lock,
        })
    }

    async fn introspect_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, StoreError> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(table)
                .fetch_all(pool)
                .await
                .map_err(store_err)?;

        if columns.is_empty() {
            return Err(StoreError::Schema(format!(
                "table definition did not create table '{table}'"
            )));
        }
        Ok(columns)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Keep only fields whose column exists in the table.
    fn known_fields<'r>(&self, row: &'r Row, skip: Option<&str>) -> Vec<(&'r str, &'r SqlValue)> {
        row.iter()
            .filter(|(column, _)| Some(*column) != skip)
            .filter(|(column, _)| {
                let known = self.has_column(column);
                if !known {
                    tracing::warn!(
                        table = %self.table,
                        column = %column,
                        "dropping value for unknown column"
                    );
                }
                known
            })
            .collect()
    }

    /// Insert each row unless it violates a uniqueness constraint.
    ///
    /// Conflicting rows are skipped, as are rows with no recognized column.
    /// Returns how many rows were actually inserted.
    pub async fn insert_if_absent(&self, rows: &[Row]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut inserted = 0;

        for row in rows {
            let fields = self.known_fields(row, None);
            if fields.is_empty() {
                tracing::debug!(table = %self.table, "skipping insert with no known columns");
                continue;
            }

            let columns: Vec<String> = fields.iter().map(|(c, _)| quote_ident(c)).collect();
            let placeholders = vec!["?"; fields.len()].join(", ");
            let sql = format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({placeholders})",
                self.table,
                columns.join(", ")
            );

            let mut query = sqlx::query(&sql);
            for (_, value) in &fields {
                query = bind_value(query, value);
            }
            inserted += query.execute(&mut *tx).await.map_err(store_err)?.rows_affected();
        }

        tx.commit().await.map_err(store_err)?;
        Ok(inserted)
    }

    /// Update rows identified by their `id` field.
    ///
    /// Rows without an integer `id`, or without any other known column, are
    /// skipped. Returns the number of rows changed.
    pub async fn update(&self, rows: &[Row]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if !self.has_column("id") {
            return Err(StoreError::Schema(format!(
                "table '{}' has no id column to update by",
                self.table
            )));
        }

        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut updated = 0;

        for row in rows {
            let Some(id) = row.get("id").and_then(SqlValue::as_i64) else {
                tracing::warn!(table = %self.table, "skipping update without integer id");
                continue;
            };
            let fields = self.known_fields(row, Some("id"));
            if fields.is_empty() {
                continue;
            }

            let assignments: Vec<String> = fields
                .iter()
                .map(|(c, _)| format!("{} = ?", quote_ident(c)))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?",
                self.table,
                assignments.join(", ")
            );

            let mut query = sqlx::query(&sql);
            for (_, value) in &fields {
                query = bind_value(query, value);
            }
            updated += query
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?
                .rows_affected();
        }

        tx.commit().await.map_err(store_err)?;
        Ok(updated)
    }

    /// Set `column` to `value` on every row. Unknown columns are a no-op.
    pub async fn update_column(
        &self,
        column: &str,
        value: impl Into<SqlValue>,
    ) -> Result<u64, StoreError> {
        if !self.has_column(column) {
            tracing::warn!(table = %self.table, column = %column, "ignoring update of unknown column");
            return Ok(0);
        }

        let sql = format!("UPDATE {} SET {} = ?", self.table, quote_ident(column));
        let _guard = self.lock.lock().await;
        let result = bind_value(sqlx::query(&sql), &value.into())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    /// Rows whose `column` equals `value`.
    pub async fn find_by(
        &self,
        column: &str,
        value: impl Into<SqlValue>,
    ) -> Result<Vec<Row>, StoreError> {
        if !self.has_column(column) {
            return Err(StoreError::Schema(format!(
                "unknown column '{column}' in table '{}'",
                self.table
            )));
        }

        let sql = format!("SELECT * FROM {} WHERE {} = ?", self.table, quote_ident(column));
        let _guard = self.lock.lock().await;
        let rows = bind_value(sqlx::query(&sql), &value.into())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(decode_row).collect()
    }

    /// Every row, in insertion order.
    pub async fn find_all(&self) -> Result<Vec<Row>, StoreError> {
        let sql = format!("SELECT * FROM {}", self.table);
        let _guard = self.lock.lock().await;
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(decode_row).collect()
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let _guard = self.lock.lock().await;
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }

    /// Drop and recreate the table, losing every row.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let drop_sql = format!("DROP TABLE IF EXISTS {}", self.table);
        let _guard = self.lock.lock().await;
        sqlx::query(&drop_sql)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        sqlx::raw_sql(&self.create_table_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Schema(format!("table definition failed: {e}")))?;
        tracing::info!(path = %self.path.display(), table = %self.table, "relational store cleared");
        Ok(())
    }

    /// Durability checkpoint: fold the write-ahead log into the database file.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

impl Drop for RelationalStore {
    fn drop(&mut self) {
        release_location_lock(&self.path, &self.lock);
    }
}
