//! Numbered backups of files about to be overwritten.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Backups are `{file}.NN{extension}` with NN in `00..max_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    /// 0 disables backups: existing files are overwritten.
    pub max_count: u32,
    pub extension: String,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            max_count: 5,
            extension: ".bak".to_string(),
        }
    }
}

impl BackupPolicy {
    pub fn slot_path(&self, original: &Path, slot: u32) -> PathBuf {
        let mut name = OsString::from(original.as_os_str());
        name.push(format!(".{slot:02}{}", self.extension));
        PathBuf::from(name)
    }

    /// First free slot, or the last slot when all are taken. `None` when
    /// backups are disabled.
    pub fn next_slot(&self, original: &Path) -> Option<PathBuf> {
        if self.max_count == 0 {
            return None;
        }
        let free = (0..self.max_count)
            .map(|slot| self.slot_path(original, slot))
            .find(|candidate| !candidate.exists());
        Some(free.unwrap_or_else(|| self.slot_path(original, self.max_count - 1)))
    }

    /// Move `original` into the next backup slot if it exists.
    pub fn rotate(&self, original: &Path) -> Result<Option<PathBuf>> {
        if !original.exists() {
            return Ok(None);
        }
        let Some(target) = self.next_slot(original) else {
            return Ok(None);
        };
        fs::rename(original, &target).with_context(|| {
            format!("back up {} to {}", original.display(), target.display())
        })?;
        tracing::info!(backup = %target.display(), "backed up existing file");
        Ok(Some(target))
    }
}
