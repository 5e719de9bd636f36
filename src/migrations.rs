//! SQL migrations embedded at build time and a JSON log of the ones applied.
//!
//! The managed database does not accept raw SQL over its REST API, so the
//! SQL is printed for the operator to run and then marked completed here.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_LOG_FILE: &str = ".migrations_log.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub file: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn name(&self) -> &'static str {
        self.file.strip_suffix(".sql").unwrap_or(self.file)
    }
}

/// Every migration, in the order they must be applied
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        file: "001_create_profiles.sql",
        sql: include_str!("../migrations/001_create_profiles.sql"),
    },
    Migration {
        file: "002_add_title_column.sql",
        sql: include_str!("../migrations/002_add_title_column.sql"),
    },
    Migration {
        file: "003_add_slug_unique_constraint.sql",
        sql: include_str!("../migrations/003_add_slug_unique_constraint.sql"),
    },
];

/// Look a migration up by file name, with or without the `migrations/`
/// prefix and `.sql` suffix
pub fn find(file: &str) -> Option<&'static Migration> {
    let file = file.strip_prefix("migrations/").unwrap_or(file);
    MIGRATIONS
        .iter()
        .find(|m| m.file == file || m.name() == file)
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("unknown migration: {0}")]
    Unknown(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode migration log: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File names of completed migrations, persisted as a JSON array
#[derive(Debug, Clone)]
pub struct MigrationLog {
    path: PathBuf,
    completed: Vec<String>,
}

impl MigrationLog {
    /// A missing or unreadable log counts as nothing completed
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let completed = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed migration log {}: {}", path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read migration log {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self { path, completed }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn is_completed(&self, migration: &Migration) -> bool {
        self.completed.iter().any(|f| f == migration.file)
    }

    pub fn pending(&self) -> Vec<&'static Migration> {
        MIGRATIONS.iter().filter(|m| !self.is_completed(m)).collect()
    }

    /// Record `file` as applied. Returns `false` when it already was.
    pub fn mark_completed(&mut self, file: &str) -> Result<bool, MigrationError> {
        let migration = find(file).ok_or_else(|| MigrationError::Unknown(file.to_string()))?;
        if self.is_completed(migration) {
            return Ok(false);
        }

        self.completed.push(migration.file.to_string());
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> Result<(), MigrationError> {
        let content = serde_json::to_string_pretty(&self.completed)?;
        fs::write(&self.path, content).map_err(|source| MigrationError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
