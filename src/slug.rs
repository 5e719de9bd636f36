//! URL slugs: generation from display strings and uniqueness resolution

use crate::store::{ProfileStore, StoreError};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Turn a display string into a URL-safe token.
///
/// Lower-cases the input, drops everything but ASCII letters, digits,
/// whitespace and hyphens, then folds each run of whitespace/hyphens into a
/// single hyphen. Leading and trailing hyphens never survive. Empty or
/// all-symbol input yields an empty string.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch);
            pending_hyphen = false;
        } else if ch == '-' || ch.is_whitespace() {
            pending_hyphen = true;
        }
    }

    slug
}

/// `base-n` disambiguated candidate
pub fn with_suffix(base: &str, counter: u32) -> String {
    format!("{base}-{counter}")
}

/// What to do when the existence check itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlugCheckPolicy {
    /// Keep the candidate being checked and let the store's unique index
    /// catch a collision at insert time
    #[default]
    BestEffort,
    /// Abort the submission
    Fail,
}

impl FromStr for SlugCheckPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(SlugCheckPolicy::BestEffort),
            "fail" => Ok(SlugCheckPolicy::Fail),
            other => Err(format!(
                "expected 'best-effort' or 'fail', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for SlugCheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugCheckPolicy::BestEffort => f.write_str("best-effort"),
            SlugCheckPolicy::Fail => f.write_str("fail"),
        }
    }
}

/// Find the first free slug among `base`, `base-1`, `base-2`, ...
///
/// Free means free at the time of the check only; the caller still has to
/// handle a unique violation from the insert.
pub async fn resolve_unique_slug(
    store: &dyn ProfileStore,
    base: &str,
    policy: SlugCheckPolicy,
) -> Result<String, StoreError> {
    let mut candidate = base.to_string();
    let mut counter = 1;

    loop {
        match store.slug_exists(&candidate).await {
            Ok(false) => return Ok(candidate),
            Ok(true) => {
                debug!("Slug '{}' is taken, trying next suffix", candidate);
                candidate = with_suffix(base, counter);
                counter += 1;
            }
            Err(e) => match policy {
                SlugCheckPolicy::BestEffort => {
                    warn!(
                        "Slug existence check failed for '{}', keeping candidate: {}",
                        candidate, e
                    );
                    return Ok(candidate);
                }
                SlugCheckPolicy::Fail => return Err(e),
            },
        }
    }
}
