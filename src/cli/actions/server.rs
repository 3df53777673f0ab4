use crate::{
    cli::globals::GlobalArgs,
    landing::{self, HandoverState},
    protocol::{AuthStore, FileStore, KeyValueStore, MemoryStore, ReplicaSet},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub storage: Option<PathBuf>,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the replica set or storage is invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {:?}", args);

    let replicas = ReplicaSet::new(&args.globals.apps).context("Invalid --apps")?;

    let storage: Arc<dyn KeyValueStore> = match &args.storage {
        Some(path) => {
            let store = FileStore::open(path)
                .with_context(|| format!("Failed to open storage {}", path.display()))?;

            info!("Keeping auth replicas in {}", store.path().display());

            Arc::new(store)
        }
        None => {
            info!("Keeping auth replicas in memory");

            Arc::new(MemoryStore::new())
        }
    };

    let state = HandoverState::new(
        &args.globals.public_url,
        args.globals.endpoints.clone(),
        AuthStore::new(storage, replicas),
    )?;

    landing::new(args.port, state).await
}
