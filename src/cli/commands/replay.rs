use super::load_config;
use crate::database::CheckpointStore;
use crate::errors::AppResult;
use crate::expansion::{ExpansionDispatcher, SignatorySetExpander};
use crate::ledger::{InMemoryLedger, LedgerSnapshot};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Replay ledger blocks through the signatory-set expanders
#[derive(Args)]
pub struct ReplayCommand {
    /// Ledger snapshot JSON file
    #[arg(long)]
    ledger: PathBuf,

    /// Start from the stored checkpoints instead of the configured genesis set
    #[arg(long)]
    resume: bool,

    /// Write the resulting sets to the checkpoint store
    #[arg(long)]
    write_checkpoint: bool,

    /// Checkpoint database (overrides config.toml and env vars)
    #[arg(long)]
    checkpoint_path: Option<PathBuf>,
}

impl ReplayCommand {
    pub fn run(&self) -> AppResult<()> {
        info!("=== Signatory set replay ===");
        let app_config = load_config()?;
        let genesis = app_config.initial_signatory_set()?;

        let store = if self.resume || self.write_checkpoint {
            let path = self
                .checkpoint_path
                .clone()
                .unwrap_or_else(|| app_config.custody.checkpoint_path.clone());
            Some(CheckpointStore::new(path)?)
        } else {
            None
        };

        let mut expanders = Vec::new();
        for config in app_config.expansion_configs() {
            let stored = match (&store, self.resume) {
                (Some(store), true) => store.load(config.service)?,
                _ => None,
            };
            expanders.push(match stored {
                Some(snapshot) => {
                    info!(
                        "{} resumes from block {:?} (version {})",
                        config.service, snapshot.last_block, snapshot.version
                    );
                    SignatorySetExpander::from_snapshot(config, snapshot)
                }
                None => SignatorySetExpander::new(config, genesis.clone()),
            });
        }

        let ledger = InMemoryLedger::from_snapshot(LedgerSnapshot::load(&self.ledger)?);
        let dispatcher = ExpansionDispatcher::new(expanders);
        let summary = dispatcher.run(&mut ledger.replay())?;

        println!(
            "Replayed {} blocks (last height {}): {} updates applied, {} rejected",
            summary.blocks,
            summary
                .last_height
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string()),
            summary.applied,
            summary.rejected
        );
        let snapshots = dispatcher.snapshots();
        for (service, snapshot) in &snapshots {
            println!("{:<20} v{:<4} {}", service.as_str(), snapshot.version, snapshot.set);
        }

        if self.write_checkpoint {
            if let Some(mut store) = store {
                store.save_all(&snapshots)?;
                println!("Checkpoints written");
            }
        }
        Ok(())
    }
}
