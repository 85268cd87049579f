//! Embedded SQLite executor.
//!
//! Runs the same statement texts the D1 client sends, so the sync pipeline
//! and the services can be driven against a local file or an in-memory
//! database. Each `execute` call runs inside one transaction.

use crate::executor::{RemoteExecutor, Row, SqlParam};
use async_trait::async_trait;
use roscoe_core::StoreError;
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Batch, Connection};
use serde_json::{Number, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed [`RemoteExecutor`].
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor").finish_non_exhaustive()
    }
}

fn sqlite_err(err: rusqlite::Error) -> StoreError {
    StoreError::Sqlite {
        reason: err.to_string(),
    }
}

impl SqliteExecutor {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(sqlite_err)?;
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database, dropped with the last clone.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn execute_blocking(
        conn: &mut Connection,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, StoreError> {
        let tx = conn.transaction().map_err(sqlite_err)?;
        let mut rows = Vec::new();

        {
            let mut batch = Batch::new(&tx, sql);
            while let Some(mut stmt) = batch.next().map_err(sqlite_err)? {
                let names: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect();

                let bound = if stmt.parameter_count() > 0 {
                    params
                } else {
                    &[][..]
                };
                let mut result = stmt
                    .query(params_from_iter(bound.iter()))
                    .map_err(sqlite_err)?;

                while let Some(row) = result.next().map_err(sqlite_err)? {
                    let mut out = Row::new();
                    for (idx, name) in names.iter().enumerate() {
                        let value = row.get_ref(idx).map_err(sqlite_err)?;
                        out.insert(name.clone(), to_json(value));
                    }
                    rows.push(out);
                }
            }
        }

        tx.commit().map_err(sqlite_err)?;
        Ok(rows)
    }
}

#[async_trait]
impl RemoteExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, StoreError> {
        let bound = params
            .iter()
            .map(to_sql)
            .collect::<Result<Vec<_>, _>>()?;
        let sql = sql.to_string();
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            Self::execute_blocking(&mut guard, &sql, &bound)
        })
        .await
        .map_err(|e| StoreError::Sqlite {
            reason: format!("blocking task failed: {}", e),
        })?
    }
}

// ============================================================================
// VALUE CONVERSION
// ============================================================================

fn to_sql(param: &SqlParam) -> Result<SqlValue, StoreError> {
    match param {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Err(StoreError::InvalidParam {
                    reason: format!("integer {} exceeds the signed 64-bit range", u),
                })
            } else {
                n.as_f64()
                    .map(SqlValue::Real)
                    .ok_or_else(|| StoreError::InvalidParam {
                        reason: format!("unrepresentable number {}", n),
                    })
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidParam {
            reason: "nested JSON values cannot be bound".to_string(),
        }),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
