//! SQLite persistence for signatory checkpoints
//!
//! The store keeps the latest `SignatorySnapshot` of each custody service so
//! an expander can resume from its last applied block instead of genesis.
//!
//! - **schema** - table definitions
//! - **checkpoint** - save/load/clear operations on `CheckpointStore`

mod checkpoint;
pub mod schema;

pub use checkpoint::CheckpointRecord;
pub use schema::setup_schema;

use crate::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Checkpoint database handle
pub struct CheckpointStore {
    connection: Connection,
}

impl CheckpointStore {
    /// Open (or create) the checkpoint database at `database_path`
    pub fn new(database_path: impl AsRef<Path>) -> AppResult<Self> {
        let path = database_path.as_ref();
        let connection = Connection::open(path)?;
        setup_schema(&connection)?;

        info!("Checkpoint store opened at: {}", path.display());
        Ok(Self { connection })
    }

    /// Throwaway store for tests and dry runs
    pub fn in_memory() -> AppResult<Self> {
        let connection = Connection::open_in_memory()?;
        setup_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Execute a function within a database transaction
    pub fn execute_transaction<F, R>(&mut self, f: F) -> AppResult<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> AppResult<R>,
    {
        let tx = self.connection.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}
