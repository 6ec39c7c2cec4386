use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::{error::AppResult, models::RawTable};

/// Durable storage for tabular snapshots
///
/// Columns are addressed by the header row; rows come back in file order.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotStore: Send + Sync {
    /// Reads a whole snapshot
    fn load(&self, source: &Path) -> AppResult<RawTable>;

    /// Replaces the snapshot at `destination` with `table`
    fn save(&self, table: &RawTable, destination: &Path) -> AppResult<()>;
}

/// CSV files with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSnapshotStore;

impl CsvSnapshotStore {
    pub fn new() -> Self {
        Self
    }

    /// Parses CSV from any reader
    pub fn read_from<R: Read>(reader: R) -> AppResult<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(RawTable::new(headers, rows))
    }

    /// Writes CSV to any writer
    pub fn write_to<W: Write>(table: &RawTable, writer: W) -> AppResult<()> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn staging_path(destination: &Path) -> PathBuf {
        let mut name = destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        destination.with_file_name(name)
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn load(&self, source: &Path) -> AppResult<RawTable> {
        let file = fs::File::open(source)?;
        let table = Self::read_from(file)?;

        tracing::debug!(
            path = %source.display(),
            columns = table.headers.len(),
            rows = table.len(),
            "Snapshot loaded"
        );

        Ok(table)
    }

    fn save(&self, table: &RawTable, destination: &Path) -> AppResult<()> {
        // Readers never see a half-written file
        let staging = Self::staging_path(destination);
        Self::write_to(table, fs::File::create(&staging)?)?;
        fs::rename(&staging, destination)?;

        tracing::info!(
            path = %destination.display(),
            rows = table.len(),
            "Snapshot saved"
        );

        Ok(())
    }
}
