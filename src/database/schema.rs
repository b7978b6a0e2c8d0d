use crate::errors::AppResult;
use rusqlite::Connection;
use tracing::debug;

/// Create the checkpoint table if missing
pub fn setup_schema(connection: &Connection) -> AppResult<()> {
    connection.execute_batch(
        r#"
        PRAGMA user_version = 1;

        -- One row per custody service, replaced on every save
        CREATE TABLE IF NOT EXISTS signatory_checkpoints (
            service TEXT PRIMARY KEY,
            snapshot_json TEXT NOT NULL,
            version INTEGER NOT NULL,
            last_block INTEGER,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;
    debug!("Checkpoint schema ready");
    Ok(())
}
