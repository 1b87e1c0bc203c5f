//! libSQL ticket log: a local table whose columns are the log header.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::RecorderError;
use crate::recorder::{LogRow, Recorder, migrations};

const SELECT_ROWS: &str = r#"SELECT "Timestamp", "Query", "Department", "Sentiment", "Priority", "Assigned Employee", "Auto Response" FROM support_log ORDER BY rowid ASC"#;

const INSERT_ROW: &str = r#"INSERT INTO support_log ("Timestamp", "Query", "Department", "Sentiment", "Priority", "Assigned Employee", "Auto Response") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#;

/// libSQL-backed `Recorder`.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlRecorder {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlRecorder {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, RecorderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecorderError::Query(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| RecorderError::Query(format!("Failed to open libSQL database: {e}")))?;
        let recorder = Self::from_database(db).await?;
        info!(path = %path.display(), "Ticket log database opened");
        Ok(recorder)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, RecorderError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                RecorderError::Query(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, RecorderError> {
        let conn = db
            .connect()
            .map_err(|e| RecorderError::Query(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl Recorder for LibSqlRecorder {
    fn name(&self) -> &str {
        "libsql"
    }

    async fn header(&self) -> Result<Vec<String>, RecorderError> {
        let mut rows = self
            .conn
            .query("SELECT name FROM pragma_table_info('support_log') ORDER BY cid", ())
            .await
            .map_err(|e| RecorderError::Query(format!("header: {e}")))?;

        let mut columns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| RecorderError::Query(format!("header: {e}")))?
        {
            let name: String = row
                .get(0)
                .map_err(|e| RecorderError::Query(format!("header column: {e}")))?;
            columns.push(name);
        }
        Ok(columns)
    }

    async fn append_row(&self, row: &LogRow) -> Result<(), RecorderError> {
        let [timestamp, query, department, sentiment, priority, employee, reply] = row.to_cells();
        self.conn
            .execute(
                INSERT_ROW,
                params![timestamp, query, department, sentiment, priority, employee, reply],
            )
            .await
            .map_err(|e| RecorderError::Query(format!("append_row: {e}")))?;

        debug!(employee = %row.assigned_employee, "Ticket row appended to libSQL log");
        Ok(())
    }

    async fn read_all_rows(&self) -> Result<Vec<LogRow>, RecorderError> {
        let mut rows = self
            .conn
            .query(SELECT_ROWS, ())
            .await
            .map_err(|e| RecorderError::Query(format!("read_all_rows: {e}")))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| RecorderError::Query(format!("read_all_rows: {e}")))?
        {
            let mut cells = Vec::with_capacity(7);
            for i in 0..7 {
                let cell: String = row.get(i).map_err(|e| RecorderError::MalformedRow {
                    index: out.len(),
                    reason: e.to_string(),
                })?;
                cells.push(cell);
            }
            out.push(LogRow::from_cells(&cells));
        }
        Ok(out)
    }
}
