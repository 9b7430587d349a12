//! Filesystem vault handle
//!
//! Thin file access rooted at a vault directory. All callers address
//! files by layout-relative path; the handle owns directory creation and
//! the sync bookkeeping kept under `.trellis/`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frontmatter::FrontmatterError;
use super::layout;

/// Errors that can occur during vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    Document(String),
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Content written into a fresh `description.md`. An existing file, with
/// any content at all, is never touched again.
pub const DESCRIPTION_PLACEHOLDER: &str = "*No description yet.*\n";

/// Per-source sync bookkeeping, stored at `.trellis/sync.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSync {
    /// Latest contribution date seen from this source.
    pub last_sync_date: DateTime<Utc>,
    /// Wall-clock time the source was last applied.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSync>,
}

impl SyncState {
    /// Upsert one source's entry, stamping `updated_at` with the current
    /// time.
    pub fn record_sync(&mut self, source: &str, last_sync_date: DateTime<Utc>) {
        self.sources.insert(
            source.to_string(),
            SourceSync {
                last_sync_date,
                updated_at: Utc::now(),
            },
        );
    }
}

/// Handle to a vault directory tree.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Open a vault at `root`, creating the directory layout as needed.
    pub fn open(root: impl Into<PathBuf>) -> VaultResult<Self> {
        let root = root.into();
        for dir in layout::base_dirs() {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a layout-relative one.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn read_to_string(&self, rel: &str) -> VaultResult<String> {
        Ok(fs::read_to_string(self.path(rel))?)
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, rel: &str, contents: &str) -> VaultResult<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create a description file with the placeholder if absent. Returns
    /// whether a file was created; an existing file is left untouched.
    pub fn ensure_description(&self, rel: &str) -> VaultResult<bool> {
        if self.exists(rel) {
            return Ok(false);
        }
        self.write(rel, DESCRIPTION_PLACEHOLDER)?;
        Ok(true)
    }

    /// Markdown files directly under a layout-relative directory, sorted
    /// by file name. A missing directory reads as empty.
    pub fn list_markdown(&self, rel: &str) -> VaultResult<Vec<PathBuf>> {
        let dir = self.path(rel);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Slug directories under `topics/` or `areas/`, sorted.
    pub fn list_subdirs(&self, rel: &str) -> VaultResult<Vec<String>> {
        let dir = self.path(rel);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load `.trellis/sync.json`; a vault that has never synced reads as
    /// the empty state.
    pub fn load_sync_state(&self) -> VaultResult<SyncState> {
        if !self.exists(layout::SYNC_FILE) {
            return Ok(SyncState::default());
        }
        let text = self.read_to_string(layout::SYNC_FILE)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_sync_state(&self, state: &SyncState) -> VaultResult<()> {
        let mut text = serde_json::to_string_pretty(state)?;
        text.push('\n');
        self.write(layout::SYNC_FILE, &text)
    }
}
