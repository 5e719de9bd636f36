pub mod config;
pub mod directory;
pub mod error;
pub mod intake;
pub mod memory_store;
pub mod migrations;
pub mod moderation;
pub mod object_storage;
pub mod profile;
pub mod routes;
pub mod slug;
pub mod state;
pub mod store;
pub mod supabase;
pub mod supabase_storage;
pub mod supabase_store;

#[cfg(test)]
mod tests;

pub use config::{AppConfig, BackendConfig, ConfigError, Environment};
pub use directory::{CountrySummary, PublicDirectory, PublicFilter};
pub use error::ApiError;
pub use intake::{IntakeConfig, IntakeError, ProfileIntake, SubmissionForm};
pub use memory_store::MemoryProfileStore;
pub use moderation::{AdminGate, ModerationError, ModerationGateway};
pub use object_storage::{MemoryObjectStorage, ObjectStorage};
pub use profile::{Gender, Profile, ProfileStatus};
pub use routes::build_router;
pub use state::AppState;
pub use store::{ProfileStore, StoreError};
