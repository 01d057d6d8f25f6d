use std::path::Path;

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::models::{AnalysisReport, StoredAnalysis};
use crate::services::table::types::ISO_FORMAT;

const HEAD_ROWS: usize = 5;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS file_analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    upload_date TEXT NOT NULL,
    head_data TEXT NOT NULL,
    describe_data TEXT NOT NULL,
    dtypes_data TEXT NOT NULL,
    null_counts TEXT NOT NULL,
    report TEXT NOT NULL
)";

/// Holds at most one analysis; each upload replaces the previous one.
pub trait AnalysisStore: Send + Sync {
    fn replace(&self, filename: &str, report: &AnalysisReport) -> Result<StoredAnalysis, AppError>;
    fn list_all(&self) -> Result<Vec<StoredAnalysis>, AppError>;
}

pub struct SqliteAnalysisStore {
    conn: Mutex<Connection>,
}

impl SqliteAnalysisStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        info!("Opening analysis store at {}", path.display());
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open database {}: {}", path.display(), e);
            AppError::PersistenceFailure(e.to_string())
        })?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, AppError> {
        debug!("Opening in-memory analysis store");
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AppError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl AnalysisStore for SqliteAnalysisStore {
    fn replace(&self, filename: &str, report: &AnalysisReport) -> Result<StoredAnalysis, AppError> {
        let upload_date = Utc::now().naive_utc().format(ISO_FORMAT).to_string();
        let head_data = head_records(report);

        let head_json = encode(&head_data)?;
        let describe_json = encode(&report.describe)?;
        let dtypes_json = encode(&report.dtypes)?;
        let nulls_json = encode(&report.null_counts)?;
        let report_json = encode(report)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM file_analyses", [])?;
        tx.execute(
            "INSERT INTO file_analyses
                (filename, upload_date, head_data, describe_data, dtypes_data, null_counts, report)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                filename,
                upload_date,
                head_json,
                describe_json,
                dtypes_json,
                nulls_json,
                report_json
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Stored analysis {} for {} (replaced {} previous)", id, filename, removed);

        Ok(StoredAnalysis {
            id,
            filename: filename.to_string(),
            upload_date,
            head_data,
            describe_data: serde_json::to_value(&report.describe).map_err(persistence)?,
            dtypes_data: serde_json::to_value(&report.dtypes).map_err(persistence)?,
            null_counts: serde_json::to_value(&report.null_counts).map_err(persistence)?,
            report: report.clone(),
        })
    }

    fn list_all(&self) -> Result<Vec<StoredAnalysis>, AppError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, filename, upload_date, head_data, describe_data, dtypes_data, null_counts, report
             FROM file_analyses ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, filename, upload_date, head, describe, dtypes, nulls, report)| {
                Ok(StoredAnalysis {
                    id,
                    filename,
                    upload_date,
                    head_data: decode(&head)?,
                    describe_data: decode(&describe)?,
                    dtypes_data: decode(&dtypes)?,
                    null_counts: decode(&nulls)?,
                    report: decode(&report)?,
                })
            })
            .collect()
    }
}

/// First rows of the report's column data, as column -> value records.
fn head_records(report: &AnalysisReport) -> Vec<IndexMap<String, Value>> {
    let rows = report.dataset_info.total_rows.min(HEAD_ROWS);
    (0..rows)
        .map(|idx| {
            report
                .raw_data
                .iter()
                .map(|(name, values)| (name.clone(), values.get(idx).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

fn persistence(err: serde_json::Error) -> AppError {
    AppError::PersistenceFailure(err.to_string())
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(persistence)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(persistence)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::services::eda::analyze;
    use crate::services::table::{FileFormat, TableProcessor};

    fn report(csv: &str) -> AnalysisReport {
        let table = TableProcessor.parse(csv.as_bytes(), FileFormat::Csv).unwrap();
        analyze(&table).unwrap()
    }

    #[test]
    fn test_replace_keeps_single_row() {
        let store = SqliteAnalysisStore::in_memory().unwrap();
        let first = store.replace("a.csv", &report("x\n1\n2\n3\n")).unwrap();
        let second = store.replace("b.csv", &report("y\n4\n5\n")).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].filename, "b.csv");
        assert_eq!(all[0].id, second.id);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_round_trip_through_sqlite() {
        let store = SqliteAnalysisStore::in_memory().unwrap();
        let r = report("n,city\n1,NY\n2,NY\n3,LA\n4,NY\n5,NY\n6,NY\n7,NY\n");
        let stored = store.replace("data.csv", &r).unwrap();

        let loaded = store.list_all().unwrap().remove(0);
        assert_eq!(loaded, stored);
        assert_eq!(loaded.report, r);
        assert_eq!(loaded.head_data.len(), 5);
        assert_eq!(loaded.head_data[0]["n"], json!(1));
        assert_eq!(loaded.head_data[2]["city"], json!("LA"));
        assert_eq!(loaded.dtypes_data, json!({"n": "int64", "city": "object"}));
        assert_eq!(loaded.null_counts, json!({"n": 0, "city": 0}));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analyses.db");

        {
            let store = SqliteAnalysisStore::open(&path).unwrap();
            store.replace("kept.csv", &report("v\n1\n2\n")).unwrap();
        }

        let reopened = SqliteAnalysisStore::open(&path).unwrap();
        let all = reopened.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].filename, "kept.csv");
        assert_eq!(all[0].head_data.len(), 2);
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = SqliteAnalysisStore::in_memory().unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }
}
