//! SQLite dataset sink
//!
//! Listings and failures are appended to one database file, tagged with the
//! run that produced them.

use crate::model::{FailureKind, FailureRecord, ListingRecord, Portal};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DatasetSink, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed sink
pub struct SqliteSink {
    conn: Mutex<Connection>,
    run_id: Option<i64>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            run_id: None,
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            run_id: None,
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("Connection lock poisoned".to_string()))
    }

    /// Starts a new run; records written afterwards are tagged with it
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `portal` - The portal being crawled
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    pub fn create_run(&mut self, config_hash: &str, portal: Portal) -> StorageResult<i64> {
        let run_id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO runs (started_at, config_hash, portal, status) VALUES (?1, ?2, ?3, ?4)",
                params![
                    Utc::now().to_rfc3339(),
                    config_hash,
                    portal.id(),
                    RunStatus::Running.to_db_string()
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.run_id = Some(run_id);
        Ok(run_id)
    }

    /// The run new records are tagged with
    pub fn current_run(&self) -> Option<i64> {
        self.run_id
    }

    /// Closes a run with its final status and a finish timestamp
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.lock()?.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Utc::now().to_rfc3339(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Marks a run as completed
    pub fn complete_run(&self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    /// Gets the most recent run
    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.lock()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, portal, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        portal: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    /// Counts listings, optionally restricted to one run
    pub fn count_listings(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE ?1 IS NULL OR run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts failures, optionally restricted to one run
    pub fn count_failures(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM failures WHERE ?1 IS NULL OR run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Gets failure counts per kind
    pub fn failure_summary(&self, run_id: Option<i64>) -> StorageResult<HashMap<FailureKind, u64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT kind, COUNT(*) FROM failures WHERE ?1 IS NULL OR run_id = ?1 GROUP BY kind",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = FailureKind::from_db_string(&kind) {
                summary.insert(kind, count as u64);
            }
        }
        Ok(summary)
    }

    /// Gets listing counts per neighborhood, largest first
    pub fn listings_by_neighborhood(&self, run_id: Option<i64>) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT COALESCE(neighborhood, '(seed url)'), COUNT(*) FROM listings
             WHERE ?1 IS NULL OR run_id = ?1
             GROUP BY 1 ORDER BY 2 DESC, 1",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Loads the listings of one run in insertion order
    pub fn load_listings(&self, run_id: Option<i64>) -> StorageResult<Vec<ListingRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT portal, title, price, address, area, rooms, baths, parking, url,
                    neighborhood, page, extracted_at
             FROM listings WHERE ?1 IS NULL OR run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRecord> {
    let portal: String = row.get(0)?;
    let extracted_at: String = row.get(11)?;
    Ok(ListingRecord {
        portal: portal.parse().unwrap_or(Portal::ZapImoveis),
        title: row.get(1)?,
        price: row.get(2)?,
        address: row.get(3)?,
        area: row.get(4)?,
        rooms: row.get(5)?,
        baths: row.get(6)?,
        parking: row.get(7)?,
        url: row.get(8)?,
        neighborhood: row.get(9)?,
        page: row.get(10)?,
        extracted_at: DateTime::parse_from_rfc3339(&extracted_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

impl DatasetSink for SqliteSink {
    fn push_listing(&self, record: &ListingRecord) -> StorageResult<()> {
        self.lock()?.execute(
            "INSERT INTO listings (run_id, portal, url, title, price, address, area, rooms,
                                   baths, parking, neighborhood, page, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                self.run_id,
                record.portal.id(),
                record.url,
                record.title,
                record.price,
                record.address,
                record.area,
                record.rooms,
                record.baths,
                record.parking,
                record.neighborhood,
                record.page,
                record.extracted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn push_failure(&self, record: &FailureRecord) -> StorageResult<()> {
        self.lock()?.execute(
            "INSERT INTO failures (run_id, portal, origin, url, kind, message, page,
                                   retry_count, failed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.run_id,
                record.portal.id(),
                record.origin,
                record.url,
                record.kind.to_db_string(),
                record.message,
                record.page,
                record.retry_count,
                record.failed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn listing(url: &str, neighborhood: Option<&str>) -> ListingRecord {
        ListingRecord {
            portal: Portal::ZapImoveis,
            title: Some("Apartamento com 3 quartos".to_string()),
            price: Some("R$ 450.000".to_string()),
            address: Some("Rua Barão de Monte Alto, Barreiro".to_string()),
            area: Some(72.5),
            rooms: Some(3),
            baths: Some(2),
            parking: None,
            url: url.to_string(),
            neighborhood: neighborhood.map(str::to_string),
            page: 1,
            extracted_at: Utc::now(),
        }
    }

    fn failure(kind: FailureKind) -> FailureRecord {
        FailureRecord {
            url: "https://www.zapimoveis.com.br/venda/".to_string(),
            kind,
            message: "test".to_string(),
            page: 1,
            retry_count: 2,
            portal: Portal::ZapImoveis,
            origin: "Barreiro".to_string(),
            failed_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_lifecycle() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let run_id = sink.create_run("abc123", Portal::VivaReal).unwrap();
        assert_eq!(sink.current_run(), Some(run_id));

        let run = sink.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.portal, "vivareal");
        assert!(run.finished_at.is_none());

        sink.complete_run(run_id).unwrap();
        let run = sink.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let sink = SqliteSink::new_in_memory().unwrap();
        assert!(matches!(
            sink.complete_run(99),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_listing_roundtrip_keeps_nulls() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let run_id = sink.create_run("abc", Portal::ZapImoveis).unwrap();

        let record = listing("https://www.zapimoveis.com.br/imovel/1", Some("Barreiro"));
        sink.push_listing(&record).unwrap();

        let loaded = sink.load_listings(Some(run_id)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].url, record.url);
        assert_eq!(loaded[0].area, Some(72.5));
        assert_eq!(loaded[0].parking, None);
        assert_eq!(loaded[0].portal, Portal::ZapImoveis);
    }

    #[test]
    fn test_statistics() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let run_id = sink.create_run("abc", Portal::ZapImoveis).unwrap();

        sink.push_listing(&listing("https://x/1", Some("Barreiro"))).unwrap();
        sink.push_listing(&listing("https://x/2", Some("Barreiro"))).unwrap();
        sink.push_listing(&listing("https://x/3", Some("Savassi"))).unwrap();
        sink.push_failure(&failure(FailureKind::StructuralMiss)).unwrap();
        sink.push_failure(&failure(FailureKind::RequestExhausted)).unwrap();
        sink.push_failure(&failure(FailureKind::RequestExhausted)).unwrap();

        assert_eq!(sink.count_listings(Some(run_id)).unwrap(), 3);
        assert_eq!(sink.count_failures(None).unwrap(), 3);

        let summary = sink.failure_summary(Some(run_id)).unwrap();
        assert_eq!(summary.get(&FailureKind::RequestExhausted), Some(&2));
        assert_eq!(summary.get(&FailureKind::StructuralMiss), Some(&1));

        let by_neighborhood = sink.listings_by_neighborhood(None).unwrap();
        assert_eq!(by_neighborhood[0], ("Barreiro".to_string(), 2));
        assert_eq!(by_neighborhood[1], ("Savassi".to_string(), 1));
    }

    #[test]
    fn test_counts_are_scoped_to_run() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let first = sink.create_run("a", Portal::ZapImoveis).unwrap();
        sink.push_listing(&listing("https://x/1", None)).unwrap();
        let second = sink.create_run("b", Portal::ZapImoveis).unwrap();
        sink.push_listing(&listing("https://x/2", None)).unwrap();
        sink.push_listing(&listing("https://x/3", None)).unwrap();

        assert_eq!(sink.count_listings(Some(first)).unwrap(), 1);
        assert_eq!(sink.count_listings(Some(second)).unwrap(), 2);
        assert_eq!(sink.count_listings(None).unwrap(), 3);
    }

    #[test]
    fn test_file_database_persists() {
        let file = NamedTempFile::new().unwrap();
        {
            let mut sink = SqliteSink::open(file.path()).unwrap();
            sink.create_run("abc", Portal::ZapImoveis).unwrap();
            sink.push_listing(&listing("https://x/1", None)).unwrap();
        }

        let sink = SqliteSink::open(file.path()).unwrap();
        assert_eq!(sink.count_listings(None).unwrap(), 1);
    }
}
