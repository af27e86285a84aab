//! CSV-backed EOD archive.
//!
//! The whole table is rewritten on every save: serialized in memory, written
//! to a sibling `.tmp` file, then renamed over the archive.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::ports::{ArchiveError, ArchiveStorePort};
use crate::domain::archive::{EOD_COLUMNS, EodRow, EodTable};

/// EOD archive stored as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvArchiveStore {
    path: PathBuf,
}

impl CsvArchiveStore {
    /// Create a store at `path`. The file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Archive file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> ArchiveError {
        ArchiveError::Io {
            path: self.location(),
            source,
        }
    }

    fn format_error(&self, message: impl std::fmt::Display) -> ArchiveError {
        ArchiveError::Format {
            path: self.location(),
            message: message.to_string(),
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<EodTable, ArchiveError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(EodTable::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let headers = reader.headers().map_err(|e| self.format_error(e))?;
        if headers.iter().ne(EOD_COLUMNS) {
            return Err(self.format_error(format!(
                "unexpected header '{}', expected '{}'",
                headers.iter().collect::<Vec<_>>().join(","),
                EOD_COLUMNS.join(",")
            )));
        }

        let rows = reader
            .deserialize::<EodRow>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.format_error(e))?;
        Ok(EodTable::from_rows(rows))
    }

    fn render(&self, table: &EodTable) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(EOD_COLUMNS)
            .map_err(|e| self.format_error(e))?;
        for row in table.rows() {
            writer.serialize(row).map_err(|e| self.format_error(e))?;
        }
        writer
            .into_inner()
            .map_err(|e| self.format_error(e.error()))
    }
}

#[async_trait]
impl ArchiveStorePort for CsvArchiveStore {
    async fn load(&self) -> Result<EodTable, ArchiveError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.location(), "No archive yet, starting empty");
                return Ok(EodTable::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let table = self.parse(&bytes)?;
        tracing::debug!(
            path = %self.location(),
            rows = table.len(),
            latest = ?table.latest_date(),
            "Loaded archive"
        );
        Ok(table)
    }

    async fn save(&self, table: &EodTable) -> Result<(), ArchiveError> {
        let bytes = self.render(table)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(e));
        }

        tracing::debug!(path = %self.location(), rows = table.len(), "Saved archive");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
