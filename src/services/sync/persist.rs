use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::sync::changelog::Changelog;

pub const CHANGELOG_FILE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ChangelogFileError {
    #[error("Failed to read changelog file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write changelog file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse changelog file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize changelog: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(
        "Unsupported changelog file version {found} (expected {})",
        CHANGELOG_FILE_VERSION
    )]
    UnsupportedVersion { found: u32 },
}

/// A saved plan: the changelog plus where it came from, so it can be reviewed and applied later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogFile {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub destination: String,
    pub changelog: Changelog,
}

impl ChangelogFile {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        changelog: Changelog,
    ) -> Self {
        Self {
            version: CHANGELOG_FILE_VERSION,
            created_at: Utc::now(),
            source: source.into(),
            destination: destination.into(),
            changelog,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ChangelogFileError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ChangelogFileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ChangelogFileError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ChangelogFileError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let file: ChangelogFile =
            serde_json::from_str(&contents).map_err(|source| ChangelogFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if file.version != CHANGELOG_FILE_VERSION {
            return Err(ChangelogFileError::UnsupportedVersion {
                found: file.version,
            });
        }

        Ok(file)
    }
}
