//! Admin gate and moderation operations (list by status, approve, reject, delete)

use crate::profile::{Profile, ProfileFilter, ProfileStatus};
use crate::store::{ProfileStore, StoreError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Credentials as carried by a request
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminCredentials<'a> {
    /// Raw `Authorization` header
    pub authorization: Option<&'a str>,
    /// Raw `x-admin-secret` header
    pub admin_secret: Option<&'a str>,
}

impl<'a> AdminCredentials<'a> {
    /// The bearer token when present, otherwise the dedicated header
    pub fn provided(&self) -> Option<&'a str> {
        self.authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .or(self.admin_secret)
    }
}

/// Proof that a caller passed the admin gate. Moderation operations take one
/// so they cannot run before the check.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess {
    _private: (),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unauthorized")]
pub struct Unauthorized;

/// Shared-secret check for admin requests. With no secret configured every
/// request is let through (development mode).
#[derive(Clone, Default)]
pub struct AdminGate {
    expected: Option<String>,
}

impl fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AdminGate {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|s| !s.is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self { expected: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    pub fn authorize(&self, credentials: AdminCredentials<'_>) -> Result<AdminAccess, Unauthorized> {
        let Some(expected) = self.expected.as_deref() else {
            return Ok(AdminAccess { _private: () });
        };

        match credentials.provided() {
            Some(provided) if provided.as_bytes() == expected.as_bytes() => {
                Ok(AdminAccess { _private: () })
            }
            Some(_) => {
                warn!("Admin request rejected: secret mismatch");
                Err(Unauthorized)
            }
            None => {
                warn!("Admin request rejected: no credential");
                Err(Unauthorized)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Profile not found")]
    NotFound,

    #[error("Profile was already {current}")]
    AlreadyReviewed { current: ProfileStatus },

    #[error("moderation store error: {0}")]
    Store(#[from] StoreError),
}

/// Status-changing and status-listing operations over the store
#[derive(Clone)]
pub struct ModerationGateway {
    store: Arc<dyn ProfileStore>,
}

impl fmt::Debug for ModerationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModerationGateway").finish()
    }
}

impl ModerationGateway {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// All profiles in `status`, newest first
    pub async fn list_by_status(
        &self,
        _access: AdminAccess,
        status: ProfileStatus,
    ) -> Result<Vec<Profile>, ModerationError> {
        let rows = self.store.list(&ProfileFilter::with_status(status)).await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    pub async fn approve(&self, access: AdminAccess, id: Uuid) -> Result<Profile, ModerationError> {
        self.transition(access, id, ProfileStatus::Approved).await
    }

    pub async fn reject(&self, access: AdminAccess, id: Uuid) -> Result<Profile, ModerationError> {
        self.transition(access, id, ProfileStatus::Rejected).await
    }

    /// Hard delete; there is no tombstone
    pub async fn delete(&self, _access: AdminAccess, id: Uuid) -> Result<(), ModerationError> {
        if self.store.delete(id).await? {
            info!("Deleted profile {}", id);
            Ok(())
        } else {
            Err(ModerationError::NotFound)
        }
    }

    async fn transition(
        &self,
        _access: AdminAccess,
        id: Uuid,
        next: ProfileStatus,
    ) -> Result<Profile, ModerationError> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ModerationError::NotFound)?;

        // Repeating a decision is a no-op
        if current.status == next {
            return Ok(current.into());
        }
        if !current.status.can_transition_to(next) {
            return Err(ModerationError::AlreadyReviewed {
                current: current.status,
            });
        }

        match self.store.update_status(id, current.status, next).await? {
            Some(row) => {
                info!("Profile {} ({}) is now {}", row.slug, row.id, row.status);
                Ok(row.into())
            }
            // Changed or removed between the read and the conditional update
            None => match self.store.find_by_id(id).await? {
                None => Err(ModerationError::NotFound),
                Some(row) if row.status == next => Ok(row.into()),
                Some(row) => Err(ModerationError::AlreadyReviewed {
                    current: row.status,
                }),
            },
        }
    }
}
