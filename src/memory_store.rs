//! In-process profile store used for development and tests

use crate::profile::{NewProfile, ProfileFilter, ProfileRow, ProfileStatus};
use crate::store::{ProfileStore, StoreError, SLUG_CONSTRAINT};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// Rows kept in insertion order; the slug check and the insert happen under
/// the same write lock, which gives the same guarantee as a unique index.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    rows: RwLock<Vec<ProfileRow>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.rows.read().iter().any(|row| row.slug == slug))
    }

    async fn insert(&self, profile: NewProfile) -> Result<ProfileRow, StoreError> {
        let mut rows = self.rows.write();
        if rows.iter().any(|row| row.slug == profile.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: Some(SLUG_CONSTRAINT.to_string()),
            });
        }

        let row = profile.into_row(Uuid::new_v4());
        rows.push(row.clone());
        Ok(row)
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileRow>, StoreError> {
        // Reverse first so rows sharing a timestamp still come out newest-inserted first
        let mut matching: Vec<ProfileRow> = self
            .rows
            .read()
            .iter()
            .rev()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        status: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .find(|row| row.slug == slug && row.status == status)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        Ok(self.rows.read().iter().find(|row| row.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ProfileStatus,
        next: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        let mut rows = self.rows.write();
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.id == id && row.status == expected)
        else {
            return Ok(None);
        };
        row.status = next;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }
}
