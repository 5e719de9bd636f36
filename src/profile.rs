//! Profile data model shared by the store, intake and query layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Girl,
    Boy,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Girl => "girl",
            Gender::Boy => "boy",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "girl" => Ok(Gender::Girl),
            "boy" => Ok(Gender::Boy),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Moderation state of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "pending",
            ProfileStatus::Approved => "approved",
            ProfileStatus::Rejected => "rejected",
        }
    }

    /// Only pending profiles can be reviewed; there is no re-review.
    pub fn can_transition_to(&self, next: ProfileStatus) -> bool {
        matches!(
            (self, next),
            (
                ProfileStatus::Pending,
                ProfileStatus::Approved | ProfileStatus::Rejected
            )
        )
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProfileStatus::Pending),
            "approved" => Ok(ProfileStatus::Approved),
            "rejected" => Ok(ProfileStatus::Rejected),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// A profile as persisted in the `profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub gender: Gender,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub country: Option<String>,
    pub city: String,
    #[serde(default)]
    pub headline: Option<String>,
    pub description: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telegram_username: Option<String>,
    #[serde(default)]
    pub discord_username: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Insert payload; the store assigns `id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub images: Vec<String>,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl NewProfile {
    pub fn into_row(self, id: Uuid) -> ProfileRow {
        ProfileRow {
            id,
            slug: self.slug,
            name: self.name,
            title: self.title,
            gender: self.gender,
            age: self.age,
            country: self.country,
            city: self.city,
            headline: self.headline,
            description: self.description,
            avatar: self.avatar,
            images: self.images,
            status: self.status,
            created_at: self.created_at,
            email: self.email,
            telegram_username: self.telegram_username,
            discord_username: self.discord_username,
            tags: self.tags,
        }
    }
}

/// Profile as returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub images: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub status: ProfileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        // Fall back to the first image when no dedicated avatar was set
        let avatar = row.avatar.or_else(|| row.images.first().cloned());

        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            title: row.title,
            gender: row.gender,
            age: row.age,
            country: row.country,
            city: row.city,
            headline: row.headline,
            description: row.description,
            avatar,
            images: row.images,
            created_at: row.created_at,
            status: row.status,
            email: row.email,
            telegram_username: row.telegram_username,
            discord_username: row.discord_username,
            tags: row.tags,
        }
    }
}

/// Exact-match filter for listing profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    pub status: ProfileStatus,
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl ProfileFilter {
    pub fn with_status(status: ProfileStatus) -> Self {
        Self {
            status,
            gender: None,
            city: None,
            country: None,
        }
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn matches(&self, row: &ProfileRow) -> bool {
        row.status == self.status
            && self.gender.map_or(true, |g| row.gender == g)
            && self.city.as_deref().map_or(true, |c| row.city == c)
            && self
                .country
                .as_deref()
                .map_or(true, |c| row.country.as_deref() == Some(c))
    }
}
