//! Profile store backed by the Supabase PostgREST API

use crate::profile::{NewProfile, ProfileFilter, ProfileRow, ProfileStatus};
use crate::store::{ProfileStore, StoreError};
use crate::supabase::{PostgrestError, SupabaseClient};
use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

#[derive(Clone, Debug)]
pub struct SupabaseProfileStore {
    client: SupabaseClient,
}

impl SupabaseProfileStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn eq_filter(value: impl std::fmt::Display) -> String {
        format!("eq.{value}")
    }
}

/// Decode a PostgREST array response, mapping error bodies onto [`StoreError`]
async fn read_rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StoreError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let error = PostgrestError::parse(&body);
    debug!("PostgREST returned {}: {}", status, error.summary());

    if error.is_unique_violation() {
        return Err(StoreError::UniqueViolation {
            constraint: error.constraint(),
        });
    }

    Err(StoreError::Backend {
        status: status.as_u16(),
        message: error.summary(),
    })
}

#[async_trait]
impl ProfileStore for SupabaseProfileStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(&self.client.rest_url())
            .query(&[
                ("select", "id".to_string()),
                ("slug", Self::eq_filter(slug)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<Value> = read_rows(response).await?;
        Ok(!rows.is_empty())
    }

    async fn insert(&self, profile: NewProfile) -> Result<ProfileRow, StoreError> {
        let response = self
            .client
            .post(&self.client.rest_url())
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&profile)
            .send()
            .await?;

        read_rows::<ProfileRow>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<ProfileRow>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("status", Self::eq_filter(filter.status)),
        ];
        if let Some(gender) = filter.gender {
            query.push(("gender", Self::eq_filter(gender)));
        }
        if let Some(city) = &filter.city {
            query.push(("city", Self::eq_filter(city)));
        }
        if let Some(country) = &filter.country {
            query.push(("country", Self::eq_filter(country)));
        }
        query.push(("order", "created_at.desc".to_string()));

        let response = self
            .client
            .get(&self.client.rest_url())
            .query(&query)
            .send()
            .await?;

        read_rows(response).await
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        status: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        let response = self
            .client
            .get(&self.client.rest_url())
            .query(&[
                ("select", "*".to_string()),
                ("slug", Self::eq_filter(slug)),
                ("status", Self::eq_filter(status)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        Ok(read_rows(response).await?.into_iter().next())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        let response = self
            .client
            .get(&self.client.rest_url())
            .query(&[
                ("select", "*".to_string()),
                ("id", Self::eq_filter(id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        Ok(read_rows(response).await?.into_iter().next())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ProfileStatus,
        next: ProfileStatus,
    ) -> Result<Option<ProfileRow>, StoreError> {
        let response = self
            .client
            .patch(&self.client.rest_url())
            .query(&[("id", Self::eq_filter(id)), ("status", Self::eq_filter(expected))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&json!({ "status": next }))
            .send()
            .await?;

        Ok(read_rows(response).await?.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let response = self
            .client
            .delete(&self.client.rest_url())
            .query(&[("id", Self::eq_filter(id))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .send()
            .await?;

        let removed: Vec<Value> = read_rows(response).await?;
        Ok(!removed.is_empty())
    }
}
