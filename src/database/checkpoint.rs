use super::CheckpointStore;
use crate::errors::{AppError, AppResult};
use crate::expansion::CustodyService;
use crate::types::SignatorySnapshot;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Stored snapshot of one service
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub service: CustodyService,
    pub snapshot: SignatorySnapshot,
    pub updated_at: DateTime<Utc>,
}

fn decode_snapshot(service: CustodyService, json: &str) -> AppResult<SignatorySnapshot> {
    serde_json::from_str(json).map_err(|e| {
        AppError::Checkpoint(format!("stored snapshot for {} is invalid: {}", service, e))
    })
}

fn decode_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Checkpoint(format!("bad checkpoint timestamp '{}': {}", raw, e)))
}

impl CheckpointStore {
    /// Replace the checkpoint of `service`
    pub fn save(&self, service: CustodyService, snapshot: &SignatorySnapshot) -> AppResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.connection.execute(
            "INSERT OR REPLACE INTO signatory_checkpoints
                 (service, snapshot_json, version, last_block, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                service.as_str(),
                json,
                snapshot.version as i64,
                snapshot.last_block.map(|b| b as i64),
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!(
            "Saved {} checkpoint: version {} at block {:?}",
            service, snapshot.version, snapshot.last_block
        );
        Ok(())
    }

    /// Save every snapshot in one transaction
    pub fn save_all(
        &mut self,
        snapshots: &BTreeMap<CustodyService, Arc<SignatorySnapshot>>,
    ) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        self.execute_transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO signatory_checkpoints
                     (service, snapshot_json, version, last_block, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (service, snapshot) in snapshots {
                stmt.execute(params![
                    service.as_str(),
                    serde_json::to_string(snapshot.as_ref())?,
                    snapshot.version as i64,
                    snapshot.last_block.map(|b| b as i64),
                    now,
                ])?;
            }
            Ok(())
        })?;
        info!("Saved {} signatory checkpoints", snapshots.len());
        Ok(())
    }

    pub fn load(&self, service: CustodyService) -> AppResult<Option<SignatorySnapshot>> {
        Ok(self.load_record(service)?.map(|record| record.snapshot))
    }

    pub fn load_record(&self, service: CustodyService) -> AppResult<Option<CheckpointRecord>> {
        let row: Option<(String, String)> = self
            .connection
            .query_row(
                "SELECT snapshot_json, updated_at FROM signatory_checkpoints WHERE service = ?1",
                params![service.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(json, updated_at)| -> AppResult<CheckpointRecord> {
            Ok(CheckpointRecord {
                service,
                snapshot: decode_snapshot(service, &json)?,
                updated_at: decode_timestamp(&updated_at)?,
            })
        })
        .transpose()
    }

    /// Remove the checkpoint of `service`; returns whether one existed
    pub fn clear(&self, service: CustodyService) -> AppResult<bool> {
        let removed = self.connection.execute(
            "DELETE FROM signatory_checkpoints WHERE service = ?1",
            params![service.as_str()],
        )?;
        if removed > 0 {
            info!("Cleared {} checkpoint", service);
        }
        Ok(removed > 0)
    }
}
