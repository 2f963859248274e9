use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metadata::ClipMetadata;

/// Hidden subfolder of the export dir holding per-clip sidecar files
pub const METADATA_DIR_NAME: &str = ".clip_metadata";

/// Suffix appended to the clip filename for the display-name sidecar
pub const CUSTOMNAME_SUFFIX: &str = ".customname";

/// Suffix appended to the clip filename for the trim-window sidecar
pub const TRIM_SUFFIX: &str = ".trim";

/// Trim window persisted in the trim sidecar, rounded to one decimal place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    /// Round a clip record's window for persistence. Rounding is monotone,
    /// so start <= end survives it.
    pub fn from_metadata(meta: &ClipMetadata) -> Self {
        TrimWindow {
            start: round_tenths(meta.clip_start),
            end: round_tenths(meta.clip_end),
        }
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Get the metadata folder under an export dir
pub fn metadata_dir(export_dir: &Path) -> PathBuf {
    export_dir.join(METADATA_DIR_NAME)
}

/// Sidecar path for a clip's display name. The suffix is appended to the
/// full filename, extension included ("Clip.mp4" -> "Clip.mp4.customname").
pub fn customname_path(export_dir: &Path, file_name: &str) -> PathBuf {
    metadata_dir(export_dir).join(format!("{}{}", file_name, CUSTOMNAME_SUFFIX))
}

/// Sidecar path for a clip's trim window
pub fn trim_path(export_dir: &Path, file_name: &str) -> PathBuf {
    metadata_dir(export_dir).join(format!("{}{}", file_name, TRIM_SUFFIX))
}

/// Write the display name as UTF-8 plain text
pub fn write_customname(path: &Path, name: &str) -> Result<()> {
    fs::write(path, name)
        .with_context(|| format!("Failed to write customname sidecar: {}", path.display()))?;
    Ok(())
}

/// Write the trim window as JSON
pub fn write_trim(path: &Path, window: &TrimWindow) -> Result<()> {
    let json = serde_json::to_string(window).context("Failed to serialize trim window")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write trim sidecar: {}", path.display()))?;
    Ok(())
}
