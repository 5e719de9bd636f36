//! Persistent store seam for profiles

use crate::profile::{NewProfile, ProfileFilter, ProfileRow, ProfileStatus};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Name of the unique index on `profiles.slug`
pub const SLUG_CONSTRAINT: &str = "profiles_slug_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    #[error("store returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("store request failed: {0}")]
    Transport(String),

    #[error("failed to decode store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// True when the error is the slug uniqueness constraint firing
    pub fn is_slug_conflict(&self) -> bool {
        match self {
            StoreError::UniqueViolation { constraint } => constraint
                .as_deref()
                .map_or(true, |name| name.contains("slug")),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

/// Storage operations the service needs; the store is the arbiter of
/// consistency, including slug uniqueness.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError>;

    /// Insert a new row. Must fail with [`StoreError::UniqueViolation`] when
    /// the slug is already taken.
    async fn insert(&self, profile: NewProfile) -> Result<ProfileRow, StoreError>;

    /// Rows matching `filter`, newest first
    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileRow>, StoreError>;

    async fn find_by_slug(
        &self,
        slug: &str,
        status: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>, StoreError>;

    /// Set `status = next` only if the row is currently in `expected`.
    /// Returns `None` when no row matched.
    async fn update_status(
        &self,
        id: Uuid,
        expected: ProfileStatus,
        next: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
