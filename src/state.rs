//! Per-process service state handed to every request handler

use crate::config::{AppConfig, BackendConfig};
use crate::directory::PublicDirectory;
use crate::intake::{IntakeConfig, ProfileIntake};
use crate::memory_store::MemoryProfileStore;
use crate::moderation::{AdminGate, ModerationGateway};
use crate::object_storage::{MemoryObjectStorage, ObjectStorage};
use crate::store::ProfileStore;
use crate::supabase::SupabaseClient;
use crate::supabase_storage::SupabaseObjectStorage;
use crate::supabase_store::SupabaseProfileStore;
use std::sync::Arc;
use tracing::info;

/// Services built once at startup. Nothing here is mutated after
/// construction; the store and object storage own all shared data.
#[derive(Clone, Debug)]
pub struct AppState {
    pub intake: ProfileIntake,
    pub moderation: ModerationGateway,
    pub directory: PublicDirectory,
    pub admin_gate: AdminGate,
    pub backend: &'static str,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        storage: Arc<dyn ObjectStorage>,
        admin_gate: AdminGate,
        intake: IntakeConfig,
        backend: &'static str,
    ) -> Self {
        Self {
            intake: ProfileIntake::new(store.clone(), storage, intake),
            moderation: ModerationGateway::new(store.clone()),
            directory: PublicDirectory::new(store),
            admin_gate,
            backend,
        }
    }

    /// Wire the backends named by the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let admin_gate = AdminGate::new(config.admin_secret.clone());

        let state = match &config.backend {
            BackendConfig::Supabase(supabase) => {
                info!(
                    "Using Supabase backend at {} (table '{}', bucket '{}')",
                    supabase.url, supabase.table, supabase.bucket
                );
                let client = SupabaseClient::new(supabase.clone())?;
                Self::new(
                    Arc::new(SupabaseProfileStore::new(client.clone())),
                    Arc::new(SupabaseObjectStorage::new(client)),
                    admin_gate,
                    config.intake,
                    config.backend.name(),
                )
            }
            BackendConfig::Memory => Self::new(
                Arc::new(MemoryProfileStore::new()),
                Arc::new(MemoryObjectStorage::default()),
                admin_gate,
                config.intake,
                config.backend.name(),
            ),
        };

        Ok(state)
    }
}
