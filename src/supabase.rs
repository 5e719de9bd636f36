//! Shared HTTP client for the managed Supabase backend

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Connection settings for the Supabase project
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Service role key, sent both as `apikey` and bearer token
    pub service_role_key: String,
    /// Table holding profiles
    pub table: String,
    /// Bucket holding uploaded images
    pub bucket: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .field("table", &self.table)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_role_key: service_role_key.into(),
            table: "profiles".to_string(),
            bucket: "profile-images".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Authenticated reqwest client shared by the table and storage adapters
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("profile_directory/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.table)
    }

    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }

    pub fn public_object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }

    /// Attach the service key headers
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.post(url))
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.patch(url))
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.delete(url))
    }
}

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestError {
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            message: Some(body.to_string()),
            ..Self::default()
        })
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(Self::UNIQUE_VIOLATION)
    }

    /// Constraint name quoted in the Postgres message, if any
    pub fn constraint(&self) -> Option<String> {
        let message = self.message.as_deref()?;
        let start = message.find("constraint \"")? + "constraint \"".len();
        let end = message[start..].find('"')? + start;
        Some(message[start..end].to_string())
    }

    pub fn summary(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}
