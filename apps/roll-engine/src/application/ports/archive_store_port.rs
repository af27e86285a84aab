//! Archive Store Port (Driven Port)
//!
//! Interface for loading and saving the EOD table.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::archive::EodTable;

/// Archive store error.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem failure.
    #[error("Archive I/O error at '{path}': {source}")]
    Io {
        /// Archive location.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The file could not be parsed or written as a table.
    #[error("Archive format error at '{path}': {message}")]
    Format {
        /// Archive location.
        path: String,
        /// Error details.
        message: String,
    },
}

/// Port for EOD table persistence.
#[async_trait]
pub trait ArchiveStorePort: Send + Sync {
    /// Load the table. A store that does not exist yet loads as empty.
    async fn load(&self) -> Result<EodTable, ArchiveError>;

    /// Replace the stored table with `table`.
    async fn save(&self, table: &EodTable) -> Result<(), ArchiveError>;

    /// Human-readable location for reporting.
    fn location(&self) -> String;
}

/// In-memory implementation for testing.
#[derive(Debug, Default)]
pub struct InMemoryArchiveStore {
    table: parking_lot::RwLock<EodTable>,
    saves: std::sync::atomic::AtomicUsize,
}

impl InMemoryArchiveStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `table`.
    #[must_use]
    pub fn with_table(table: EodTable) -> Self {
        Self {
            table: parking_lot::RwLock::new(table),
            saves: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn snapshot(&self) -> EodTable {
        self.table.read().clone()
    }

    /// Number of `save` calls.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveStorePort for InMemoryArchiveStore {
    async fn load(&self) -> Result<EodTable, ArchiveError> {
        Ok(self.table.read().clone())
    }

    async fn save(&self, table: &EodTable) -> Result<(), ArchiveError> {
        *self.table.write() = table.clone();
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
