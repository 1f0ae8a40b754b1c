//! Run-folder storage for retrieved payloads.
//!
//! Layout under the output root:
//!
//! ```text
//! 20251106_18_gfs_sailing_basic/
//!     20251106_18_000_gfs_sailing_basic.grib
//!     20251106_18_000_gfs_sailing_basic.grib.json
//!     20251106_18_000_gfs_sailing_basic.grib.00.bak
//!     20251106_18_000_gfs_sailing_basic.grib.00.bak.json
//! ```
//!
//! Payloads are written to `{file}.part` and renamed into place; an existing
//! file and its manifest are moved to a backup slot first. The JSON manifest
//! next to each file keeps the hex masks together with the ids they decode
//! to, plus the size and SHA-256 used to tell a complete file from a partial
//! one.

mod backup;
mod sanitize;

pub use backup::BackupPolicy;
pub use sanitize::sanitize_component;

use crate::bitmask::SelectionMask;
use crate::checksum::{sha256_bytes, sha256_path};
use crate::cycle::ForecastCycle;
use crate::geo::BoundingBox;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

pub const GRIB_EXTENSION: &str = "grib";

/// What was fetched, for naming and the manifest.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub model: String,
    pub product: String,
    pub preset: String,
    pub cycle: ForecastCycle,
    pub forecast_hour: u32,
    pub url: String,
    pub bbox: BoundingBox,
    pub variables: SelectionMask,
    pub levels: SelectionMask,
    /// Requests the session needed.
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub mask: String,
    pub ids: Vec<String>,
}

impl From<&SelectionMask> for SelectionRecord {
    fn from(mask: &SelectionMask) -> Self {
        Self {
            mask: mask.to_hex(),
            ids: mask.selected().map(str::to_string).collect(),
        }
    }
}

/// Sidecar written next to every stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model: String,
    pub product: String,
    pub preset: String,
    pub cycle: ForecastCycle,
    pub forecast_hour: u32,
    pub url: String,
    pub bytes: u64,
    pub sha256: String,
    pub bbox: BoundingBox,
    pub variables: SelectionRecord,
    pub levels: SelectionRecord,
    pub attempts: usize,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub backup: Option<PathBuf>,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalState {
    Missing,
    /// Size and SHA-256 match the manifest.
    Complete { bytes: u64 },
    /// Present, but without a manifest or not matching it.
    Damaged { bytes: u64, reason: String },
}

/// Local state of the file a fetch would produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStatus {
    pub path: PathBuf,
    pub state: LocalState,
}

impl LocalStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self.state, LocalState::Complete { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
    backup: BackupPolicy,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>, backup: BackupPolicy) -> Self {
        Self {
            root: root.into(),
            backup,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/YYYYMMDD_HH_{model}_{preset}`
    pub fn run_dir(&self, model: &str, preset: &str, cycle: ForecastCycle) -> PathBuf {
        self.root.join(sanitize_component(&format!(
            "{}_{}_{}_{}",
            cycle.date_string(),
            cycle.hour_string(),
            model,
            preset
        )))
    }

    /// `{run_dir}/YYYYMMDD_HH_FFF_{model}_{preset}.grib`
    pub fn file_path(
        &self,
        model: &str,
        preset: &str,
        cycle: ForecastCycle,
        forecast_hour: u32,
    ) -> PathBuf {
        let name = sanitize_component(&format!(
            "{}_{}_{:03}_{}_{}.{}",
            cycle.date_string(),
            cycle.hour_string(),
            forecast_hour,
            model,
            preset,
            GRIB_EXTENSION
        ));
        self.run_dir(model, preset, cycle).join(name)
    }

    pub fn status(
        &self,
        model: &str,
        preset: &str,
        cycle: ForecastCycle,
        forecast_hour: u32,
    ) -> LocalStatus {
        let path = self.file_path(model, preset, cycle, forecast_hour);
        let Some(bytes) = fs::metadata(&path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
        else {
            return LocalStatus {
                path,
                state: LocalState::Missing,
            };
        };
        let state = match verify_against_manifest(&path, bytes) {
            Ok(()) => LocalState::Complete { bytes },
            Err(err) => {
                tracing::warn!(path = %path.display(), "stored file does not match its manifest: {err:#}");
                LocalState::Damaged {
                    bytes,
                    reason: format!("{err:#}"),
                }
            }
        };
        LocalStatus { path, state }
    }

    /// Persist `body`, backing up any previous file, then write the manifest.
    pub fn store(&self, request: &StoreRequest, body: &[u8]) -> Result<StoredFile> {
        let path = self.file_path(
            &request.model,
            &request.preset,
            request.cycle,
            request.forecast_hour,
        );
        let dir = self.run_dir(&request.model, &request.preset, request.cycle);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

        let temp = with_suffix(&path, TEMP_SUFFIX);
        write_synced(&temp, body)?;
        let backup = self.backup.rotate(&path)?;
        if let Some(backup) = &backup {
            rotate_manifest(&path, backup)?;
        }
        fs::rename(&temp, &path)
            .with_context(|| format!("rename {} to {}", temp.display(), path.display()))?;

        let sha256 = sha256_bytes(body);
        let manifest = Manifest {
            model: request.model.clone(),
            product: request.product.clone(),
            preset: request.preset.clone(),
            cycle: request.cycle,
            forecast_hour: request.forecast_hour,
            url: request.url.clone(),
            bytes: body.len() as u64,
            sha256: sha256.clone(),
            bbox: request.bbox,
            variables: SelectionRecord::from(&request.variables),
            levels: SelectionRecord::from(&request.levels),
            attempts: request.attempts,
            stored_at: Utc::now(),
        };
        let manifest_path = manifest_path(&path);
        let json = serde_json::to_vec_pretty(&manifest).context("serialize manifest")?;
        let manifest_temp = with_suffix(&manifest_path, TEMP_SUFFIX);
        write_synced(&manifest_temp, &json)?;
        fs::rename(&manifest_temp, &manifest_path)
            .with_context(|| format!("rename {}", manifest_temp.display()))?;

        tracing::info!(
            path = %path.display(),
            bytes = body.len(),
            sha256 = %sha256,
            "stored payload"
        );
        Ok(StoredFile {
            path,
            manifest_path,
            backup,
            bytes: body.len() as u64,
            sha256,
        })
    }
}

pub fn manifest_path(file: &Path) -> PathBuf {
    with_suffix(file, ".json")
}

pub fn read_manifest(file: &Path) -> Result<Manifest> {
    let path = manifest_path(file);
    let data = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))
}

fn verify_against_manifest(path: &Path, bytes: u64) -> Result<()> {
    let manifest = read_manifest(path)?;
    if manifest.bytes != bytes {
        bail!("size is {bytes} bytes, manifest says {}", manifest.bytes);
    }
    let digest = sha256_path(path)?;
    if digest != manifest.sha256 {
        bail!("sha256 {digest} does not match manifest {}", manifest.sha256);
    }
    Ok(())
}

/// Move the manifest of `file` next to its backup, so `{backup}.json`
/// always describes `{backup}`.
fn rotate_manifest(file: &Path, backup: &Path) -> Result<()> {
    let from = manifest_path(file);
    let to = manifest_path(backup);
    if from.exists() {
        fs::rename(&from, &to)
            .with_context(|| format!("back up {} to {}", from.display(), to.display()))?;
    } else if to.exists() {
        fs::remove_file(&to).with_context(|| format!("remove stale {}", to.display()))?;
    }
    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync {}", path.display()))?;
    Ok(())
}
