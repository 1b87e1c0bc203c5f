//! Ticket log: one append-only row per submission.
//!
//! Two backends implement `Recorder`:
//! - `SheetsRecorder`: a Google Sheets worksheet (the production log)
//! - `LibSqlRecorder`: a local libSQL table with the same seven columns

pub mod libsql_backend;
mod migrations;
pub mod sheets;

pub use libsql_backend::LibSqlRecorder;
pub use sheets::{SheetsConfig, SheetsRecorder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ConfigError, RecorderError};

/// Column order of the ticket log. Must match the stored header exactly.
pub const LOG_HEADER: [&str; 7] = [
    "Timestamp",
    "Query",
    "Department",
    "Sentiment",
    "Priority",
    "Assigned Employee",
    "Auto Response",
];

/// Timestamp format written to the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One ticket as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub timestamp: String,
    pub query: String,
    pub department: String,
    pub sentiment: String,
    pub priority: String,
    pub assigned_employee: String,
    pub auto_response: String,
}

impl LogRow {
    /// Cells in `LOG_HEADER` order.
    pub fn to_cells(&self) -> [String; 7] {
        [
            self.timestamp.clone(),
            self.query.clone(),
            self.department.clone(),
            self.sentiment.clone(),
            self.priority.clone(),
            self.assigned_employee.clone(),
            self.auto_response.clone(),
        ]
    }

    /// Build a row from stored cells. Missing trailing cells read as empty;
    /// extra cells are ignored.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        Self {
            timestamp: cell(0),
            query: cell(1),
            department: cell(2),
            sentiment: cell(3),
            priority: cell(4),
            assigned_employee: cell(5),
            auto_response: cell(6),
        }
    }
}

/// Durable, append-only ticket log.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Column names as currently stored.
    async fn header(&self) -> Result<Vec<String>, RecorderError>;

    /// Append one row.
    async fn append_row(&self, row: &LogRow) -> Result<(), RecorderError>;

    /// Every data row, oldest first (header excluded).
    async fn read_all_rows(&self) -> Result<Vec<LogRow>, RecorderError>;
}

/// Refuse to start unless the stored header is exactly `LOG_HEADER`.
///
/// The header is never repaired automatically.
pub async fn verify_header(recorder: &dyn Recorder) -> Result<(), crate::error::Error> {
    let found = recorder.header().await?;
    if found.iter().map(String::as_str).ne(LOG_HEADER) {
        error!(
            backend = recorder.name(),
            found = ?found,
            "Ticket log is not set up correctly; fix the header row and restart"
        );
        return Err(ConfigError::HeaderMismatch {
            expected: LOG_HEADER.iter().map(|s| s.to_string()).collect(),
            found,
        }
        .into());
    }
    info!(backend = recorder.name(), "Ticket log header verified");
    Ok(())
}
