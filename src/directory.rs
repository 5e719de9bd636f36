//! Public, unauthenticated reads over approved profiles

use crate::profile::{Gender, Profile, ProfileFilter, ProfileStatus};
use crate::store::{ProfileStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Optional exact-match narrowing for the public listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicFilter {
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl PublicFilter {
    fn into_store_filter(self) -> ProfileFilter {
        ProfileFilter {
            status: ProfileStatus::Approved,
            gender: self.gender,
            city: self.city,
            country: self.country,
        }
    }
}

/// Approved profile counts for one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub girls: usize,
    pub boys: usize,
    pub total: usize,
}

#[derive(Clone)]
pub struct PublicDirectory {
    store: Arc<dyn ProfileStore>,
}

impl fmt::Debug for PublicDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicDirectory").finish()
    }
}

impl PublicDirectory {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Approved profiles, newest first
    pub async fn list(&self, filter: PublicFilter) -> Result<Vec<Profile>, StoreError> {
        let rows = self.store.list(&filter.into_store_filter()).await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    /// The approved profile with this slug; pending and rejected ones are
    /// reported as absent
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .store
            .find_by_slug(slug, ProfileStatus::Approved)
            .await?
            .map(Profile::from))
    }

    /// Approved profiles grouped by country, largest first
    pub async fn countries(&self) -> Result<Vec<CountrySummary>, StoreError> {
        let profiles = self.list(PublicFilter::default()).await?;
        Ok(summarize_countries(&profiles))
    }
}

pub fn summarize_countries(profiles: &[Profile]) -> Vec<CountrySummary> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for profile in profiles {
        let country = profile.country.as_deref().unwrap_or(UNKNOWN_COUNTRY);
        let entry = counts.entry(country).or_default();
        match profile.gender {
            Gender::Girl => entry.0 += 1,
            Gender::Boy => entry.1 += 1,
        }
    }

    let mut summaries: Vec<CountrySummary> = counts
        .into_iter()
        .map(|(country, (girls, boys))| CountrySummary {
            country: country.to_string(),
            girls,
            boys,
            total: girls + boys,
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.country.cmp(&b.country)));
    summaries
}
