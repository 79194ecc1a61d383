//! JSON-lines dataset sink

use crate::model::{FailureRecord, ListingRecord};
use crate::storage::traits::{DatasetSink, StorageError, StorageResult};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// One output line
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Line<'a> {
    Listing(&'a ListingRecord),
    Failure(&'a FailureRecord),
}

/// Appends one JSON object per record to a file
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if missing
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line(&self, line: &Line<'_>) -> StorageResult<()> {
        let mut json = serde_json::to_string(line)?;
        json.push('\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Database("Writer lock poisoned".to_string()))?;
        writer.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl DatasetSink for JsonLinesSink {
    fn push_listing(&self, record: &ListingRecord) -> StorageResult<()> {
        self.write_line(&Line::Listing(record))
    }

    fn push_failure(&self, record: &FailureRecord) -> StorageResult<()> {
        self.write_line(&Line::Failure(record))
    }

    fn flush(&self) -> StorageResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Database("Writer lock poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FailureKind, Portal};
    use chrono::Utc;
    use tempfile::NamedTempFile;

    #[test]
    fn test_lines_are_tagged() {
        let file = NamedTempFile::new().unwrap();
        let sink = JsonLinesSink::open(file.path()).unwrap();

        sink.push_listing(&ListingRecord {
            portal: Portal::VivaReal,
            title: None,
            price: Some("R$ 320.000".to_string()),
            address: None,
            area: None,
            rooms: Some(2),
            baths: None,
            parking: None,
            url: "https://www.vivareal.com.br/imovel/9".to_string(),
            neighborhood: Some("Savassi".to_string()),
            page: 1,
            extracted_at: Utc::now(),
        })
        .unwrap();
        sink.push_failure(&FailureRecord {
            url: "https://www.vivareal.com.br/venda/".to_string(),
            kind: FailureKind::NavigationTimeout,
            message: "Navigation timed out".to_string(),
            page: 2,
            retry_count: 0,
            portal: Portal::VivaReal,
            origin: "Savassi".to_string(),
            failed_at: Utc::now(),
        })
        .unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "listing");
        assert_eq!(lines[0]["portal"], "vivareal");
        assert!(lines[0]["title"].is_null());
        assert_eq!(lines[1]["type"], "failure");
        assert_eq!(lines[1]["kind"], "navigation_timeout");
    }
}
