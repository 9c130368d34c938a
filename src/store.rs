//! SQLite persistence gateway for aggregated records.
//!
//! Records are append-only rows in `data_records`. The connection is shared by
//! every caller (scheduled and manual runs, the API) behind a mutex; statements
//! run on the blocking pool so the async executor never waits on disk I/O.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::record::{AggregatedRecord, StoredRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record and return its assigned identity.
    async fn save(&self, record: &AggregatedRecord) -> Result<i64>;
    /// Newest record by capture timestamp, if any.
    async fn latest(&self) -> Result<Option<StoredRecord>>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS data_records (
        id                        INTEGER PRIMARY KEY AUTOINCREMENT,
        aggregation_timestamp_utc TEXT NOT NULL,
        city_name                 TEXT NOT NULL,
        current_temperature_c     REAL NOT NULL,
        brand_name                TEXT NOT NULL,
        sentiment_summary         TEXT NOT NULL,
        news_summary              TEXT NOT NULL,
        popularity_score          REAL,
        raw_weather_response      TEXT NOT NULL,
        raw_osint_response        TEXT NOT NULL,
        raw_gemini_response       TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_records_ts ON data_records(aggregation_timestamp_utc);";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("create {}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::info!(target: "store", "database initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<i64> {
        self.with_conn(|c| {
            c.query_row("SELECT COUNT(*) FROM data_records", [], |r| r.get(0))
                .map_err(Error::from)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| Error::Storage(format!("connection lock poisoned: {e}")))?;
            f(&*guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn save(&self, record: &AggregatedRecord) -> Result<i64> {
        let r = record.clone();
        let id = self
            .with_conn(move |c| {
                c.execute(
                    "INSERT INTO data_records (
                        aggregation_timestamp_utc, city_name, current_temperature_c,
                        brand_name, sentiment_summary, news_summary, popularity_score,
                        raw_weather_response, raw_osint_response, raw_gemini_response
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        format_ts(&r.aggregation_timestamp_utc),
                        r.city_name,
                        r.current_temperature_c,
                        r.brand_name,
                        r.sentiment_summary,
                        r.news_summary,
                        r.popularity_score,
                        r.raw_weather_response,
                        r.raw_osint_response,
                        r.raw_gemini_response,
                    ],
                )?;
                Ok(c.last_insert_rowid())
            })
            .await?;

        tracing::info!(
            target: "store",
            record_id = id,
            city = %record.city_name,
            brand = %record.brand_name,
            "created data record"
        );
        Ok(id)
    }

    async fn latest(&self) -> Result<Option<StoredRecord>> {
        self.with_conn(|c| {
            c.query_row(
                "SELECT id, aggregation_timestamp_utc, city_name, current_temperature_c,
                        brand_name, sentiment_summary, news_summary, popularity_score,
                        raw_weather_response, raw_osint_response, raw_gemini_response
                 FROM data_records
                 ORDER BY aggregation_timestamp_utc DESC, id DESC
                 LIMIT 1",
                [],
                row_to_stored,
            )
            .optional()
            .map_err(Error::from)
        })
        .await
    }
}

/// Fixed-width UTC so lexical order in SQLite equals chronological order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let ts: String = row.get(1)?;
    let aggregation_timestamp_utc = DateTime::parse_from_rfc3339(&ts)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(StoredRecord {
        id: row.get(0)?,
        record: AggregatedRecord {
            aggregation_timestamp_utc,
            city_name: row.get(2)?,
            current_temperature_c: row.get(3)?,
            brand_name: row.get(4)?,
            sentiment_summary: row.get(5)?,
            news_summary: row.get(6)?,
            popularity_score: row.get(7)?,
            raw_weather_response: row.get(8)?,
            raw_osint_response: row.get(9)?,
            raw_gemini_response: row.get(10)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap();
        assert!(format_ts(&a) < format_ts(&b));
        assert_eq!(format_ts(&a), "2024-01-02T03:04:05.000000Z");
    }
}
