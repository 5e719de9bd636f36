//! Profile intake: form schema, validation, image collection and insert

use crate::object_storage::{upload_path, ObjectStorage, DEFAULT_CONTENT_TYPE};
use crate::profile::{Gender, NewProfile, Profile, ProfileStatus};
use crate::slug::{resolve_unique_slug, slugify, SlugCheckPolicy};
use crate::store::{ProfileStore, StoreError};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Used when the name/title has nothing left after slugification
pub const FALLBACK_SLUG_BASE: &str = "profile";

pub const SLUG_TAKEN_MESSAGE: &str =
    "A profile with a similar name already exists. Please slightly change the name or title and try again.";

/// A file part of the submission form
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// One `images` entry: either text (a URL or a JSON array of URLs) or a file
#[derive(Debug, Clone, PartialEq)]
pub enum ImageEntry {
    Text(String),
    Upload(UploadedFile),
}

/// Raw submission as it arrives from the form, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    pub name: Option<String>,
    pub title: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub telegram_username: Option<String>,
    pub discord_username: Option<String>,
    pub avatar: Option<String>,
    pub tags: Option<String>,
    pub images: Vec<ImageEntry>,
}

impl SubmissionForm {
    /// Record a text field by its form name. A repeated field keeps its first
    /// value. Returns `false` for names the form does not know about.
    pub fn set_text(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "gender" => &mut self.gender,
            "age" => &mut self.age,
            "country" => &mut self.country,
            "city" => &mut self.city,
            "headline" => &mut self.headline,
            "description" => &mut self.description,
            "email" => &mut self.email,
            "telegram_username" => &mut self.telegram_username,
            "discord_username" => &mut self.discord_username,
            "avatar" => &mut self.avatar,
            "tags" => &mut self.tags,
            "images" => {
                self.images.push(ImageEntry::Text(value));
                return true;
            }
            _ => return false,
        };
        slot.get_or_insert(value);
        true
    }

    pub fn push_upload(&mut self, file: UploadedFile) {
        self.images.push(ImageEntry::Upload(file));
    }

    /// Validate every field in one pass
    pub fn validate(self) -> Result<ProfileSubmission, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = non_blank(self.name);
        let city = non_blank(self.city);
        let description = non_blank(self.description);

        if name.is_none() {
            errors.missing("name");
        }

        let gender = match non_blank(self.gender) {
            None => {
                errors.missing("gender");
                None
            }
            Some(raw) => match raw.parse::<Gender>() {
                Ok(gender) => Some(gender),
                Err(_) => {
                    errors.invalid("gender", "must be 'girl' or 'boy'");
                    None
                }
            },
        };

        if city.is_none() {
            errors.missing("city");
        }
        if description.is_none() {
            errors.missing("description");
        }

        let age = match non_blank(self.age) {
            None => None,
            Some(raw) => match raw.parse::<u32>() {
                Ok(age) => Some(age),
                Err(_) => {
                    errors.invalid("age", "must be a whole number");
                    None
                }
            },
        };

        match (name, gender, city, description) {
            (Some(name), Some(gender), Some(city), Some(description)) if errors.is_empty() => {
                Ok(ProfileSubmission {
                    name,
                    title: non_blank(self.title),
                    gender,
                    age,
                    country: non_blank(self.country),
                    city,
                    headline: non_blank(self.headline),
                    description,
                    email: non_blank(self.email),
                    telegram_username: non_blank(self.telegram_username),
                    discord_username: non_blank(self.discord_username),
                    avatar: non_blank(self.avatar),
                    tags: self.tags.as_deref().and_then(parse_tags),
                    images: self.images,
                })
            }
            _ => Err(errors),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A validated submission with typed fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSubmission {
    pub name: String,
    pub title: Option<String>,
    pub gender: Gender,
    pub age: Option<u32>,
    pub country: Option<String>,
    pub city: String,
    pub headline: Option<String>,
    pub description: String,
    pub email: Option<String>,
    pub telegram_username: Option<String>,
    pub discord_username: Option<String>,
    pub avatar: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Vec<ImageEntry>,
}

impl ProfileSubmission {
    /// Title wins over name as the slug source
    pub fn slug_source(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn slug_base(&self) -> String {
        let base = slugify(self.slug_source());
        if base.is_empty() {
            FALLBACK_SLUG_BASE.to_string()
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    const REQUIRED: &'static str = "is required";

    fn missing(&mut self, field: &'static str) {
        self.fields.push(FieldError {
            field,
            message: Self::REQUIRED.to_string(),
        });
    }

    fn invalid(&mut self, field: &'static str, message: &str) {
        self.fields.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_missing(&self) -> bool {
        self.fields.iter().any(|f| f.message == Self::REQUIRED)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_missing() {
            f.write_str("Missing required fields")
        } else {
            f.write_str("Invalid profile submission")
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Tags from a JSON array or a comma-separated list; `None` when nothing is left
pub fn parse_tags(raw: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => raw
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    };

    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// URLs carried by a text `images` entry
pub fn parse_image_urls(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect(),
        _ => {
            let url = raw.trim();
            if url.is_empty() {
                Vec::new()
            } else {
                vec![url.to_string()]
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{}", SLUG_TAKEN_MESSAGE)]
    SlugTaken,

    #[error("failed to check slug availability: {0}")]
    SlugCheck(StoreError),

    #[error("failed to create profile: {0}")]
    Store(StoreError),
}

impl From<ValidationErrors> for IntakeError {
    fn from(e: ValidationErrors) -> Self {
        IntakeError::Validation(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeConfig {
    pub slug_check_policy: SlugCheckPolicy,
    /// Insert attempts when the slug index rejects the row; at least 1
    pub slug_insert_attempts: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            slug_check_policy: SlugCheckPolicy::BestEffort,
            slug_insert_attempts: 3,
        }
    }
}

/// Turns submissions into pending profiles
#[derive(Clone)]
pub struct ProfileIntake {
    store: Arc<dyn ProfileStore>,
    storage: Arc<dyn ObjectStorage>,
    config: IntakeConfig,
}

impl fmt::Debug for ProfileIntake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileIntake")
            .field("config", &self.config)
            .finish()
    }
}

impl ProfileIntake {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        storage: Arc<dyn ObjectStorage>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }

    /// Validate a raw form and create the profile
    pub async fn submit(&self, form: SubmissionForm) -> Result<Profile, IntakeError> {
        let submission = form.validate()?;
        self.create(submission).await
    }

    /// Upload images, pick a slug and insert the pending row
    pub async fn create(&self, submission: ProfileSubmission) -> Result<Profile, IntakeError> {
        let base = submission.slug_base();
        let images = self.collect_images(submission.images).await;

        let mut record = NewProfile {
            slug: String::new(),
            name: submission.name,
            title: submission.title,
            gender: submission.gender,
            age: submission.age,
            country: submission.country,
            city: submission.city,
            headline: submission.headline,
            description: submission.description,
            avatar: submission.avatar,
            images,
            status: ProfileStatus::Pending,
            created_at: Utc::now(),
            email: submission.email,
            telegram_username: submission.telegram_username,
            discord_username: submission.discord_username,
            tags: submission.tags,
        };

        let max_attempts = self.config.slug_insert_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            record.slug =
                resolve_unique_slug(self.store.as_ref(), &base, self.config.slug_check_policy)
                    .await
                    .map_err(IntakeError::SlugCheck)?;

            match self.store.insert(record.clone()).await {
                Ok(row) => {
                    info!("Created pending profile {} ({})", row.slug, row.id);
                    return Ok(row.into());
                }
                Err(e) if e.is_slug_conflict() => {
                    if attempt >= max_attempts {
                        warn!(
                            "Slug '{}' still taken after {} attempts, giving up",
                            record.slug, attempt
                        );
                        return Err(IntakeError::SlugTaken);
                    }
                    debug!(
                        "Slug '{}' was claimed concurrently, resolving again (attempt {})",
                        record.slug, attempt
                    );
                }
                Err(e) => return Err(IntakeError::Store(e)),
            }
        }
    }

    /// Resolve image entries in order; uploads run one after another and a
    /// failed upload is skipped.
    async fn collect_images(&self, entries: Vec<ImageEntry>) -> Vec<String> {
        let mut images = Vec::new();

        for entry in entries {
            match entry {
                ImageEntry::Text(raw) => images.extend(parse_image_urls(&raw)),
                ImageEntry::Upload(file) => {
                    if file.bytes.is_empty() {
                        debug!("Skipping empty upload {:?}", file.file_name);
                        continue;
                    }

                    let path = upload_path(file.file_name.as_deref());
                    let content_type = file
                        .content_type
                        .as_deref()
                        .filter(|ct| !ct.is_empty())
                        .unwrap_or(DEFAULT_CONTENT_TYPE);

                    match self.storage.upload(&path, file.bytes, content_type).await {
                        Ok(url) => images.push(url),
                        Err(e) => warn!("Failed to upload image to {}: {}", path, e),
                    }
                }
            }
        }

        images
    }
}
