// LogSleuth - app/state.rs
//
// Shared application state handed to every HTTP handler (§4.I, §5): the
// miner actor handle, the storage adapter, and the resolved configuration.
// Cheap to clone — every field is already reference-counted.

use crate::core::miner_actor::MinerHandle;
use crate::storage::StorageAdapter;
use crate::util::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub miner: MinerHandle,
    pub storage: Arc<dyn StorageAdapter>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(miner: MinerHandle, storage: Arc<dyn StorageAdapter>, config: AppConfig) -> Self {
        Self {
            miner,
            storage,
            config: Arc::new(config),
        }
    }
}
