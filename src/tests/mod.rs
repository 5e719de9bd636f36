mod directory_tests;
mod intake_tests;

use crate::memory_store::MemoryProfileStore;
use crate::moderation::{AdminAccess, AdminCredentials, AdminGate};
use crate::object_storage::{MemoryObjectStorage, ObjectStorage, StorageError};
use crate::profile::{Gender, NewProfile, ProfileFilter, ProfileRow, ProfileStatus};
use crate::store::{ProfileStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

pub(crate) fn open_access() -> AdminAccess {
    AdminGate::disabled()
        .authorize(AdminCredentials::default())
        .unwrap()
}

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A row ready for `ProfileStore::insert`, created `minutes` after the base time
pub(crate) fn new_profile(slug: &str, gender: Gender, status: ProfileStatus, minutes: i64) -> NewProfile {
    NewProfile {
        slug: slug.to_string(),
        name: slug.replace('-', " "),
        title: None,
        gender,
        age: Some(25),
        country: Some("Portugal".to_string()),
        city: "Lisbon".to_string(),
        headline: None,
        description: "Likes long walks".to_string(),
        avatar: None,
        images: Vec::new(),
        status,
        created_at: base_time() + Duration::minutes(minutes),
        email: None,
        telegram_username: None,
        discord_username: None,
        tags: None,
    }
}

/// Store whose slug existence check can be made to fail or to lie
#[derive(Default)]
pub(crate) struct UnreliableStore {
    pub inner: MemoryProfileStore,
    /// Every existence check errors
    pub check_fails: bool,
    /// The first `stale_checks` existence checks report the slug as free
    pub stale_checks: usize,
    /// Yield to the scheduler before every check and insert
    pub yields: bool,
    pub checks: AtomicUsize,
}

impl UnreliableStore {
    pub fn failing() -> Self {
        Self {
            check_fails: true,
            ..Self::default()
        }
    }

    pub fn stale(stale_checks: usize) -> Self {
        Self {
            stale_checks,
            ..Self::default()
        }
    }

    pub fn interleaving() -> Self {
        Self {
            yields: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProfileStore for UnreliableStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        if self.yields {
            tokio::task::yield_now().await;
        }
        let call = self.checks.fetch_add(1, Ordering::SeqCst);
        if self.check_fails {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        if call < self.stale_checks {
            return Ok(false);
        }
        self.inner.slug_exists(slug).await
    }

    async fn insert(&self, profile: NewProfile) -> Result<ProfileRow, StoreError> {
        if self.yields {
            tokio::task::yield_now().await;
        }
        self.inner.insert(profile).await
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileRow>, StoreError> {
        self.inner.list(filter).await
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        status: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        self.inner.find_by_slug(slug, status).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ProfileStatus,
        next: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        self.inner.update_status(id, expected, next).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

/// Object storage that rejects the upload with the given 1-based call number
pub(crate) struct FlakyStorage {
    pub inner: MemoryObjectStorage,
    pub fail_on: usize,
    pub calls: AtomicUsize,
}

impl FlakyStorage {
    pub fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: MemoryObjectStorage::default(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(StorageError::Rejected {
                status: 500,
                message: "bucket unavailable".to_string(),
            });
        }
        self.inner.upload(path, bytes, content_type).await
    }
}
