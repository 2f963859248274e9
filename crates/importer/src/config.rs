use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the clip import pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Folder the capture device drops finished clip files into
    pub input_dir: PathBuf,
    /// Folder imported clips and their sidecar files are written to
    pub export_dir: PathBuf,
    /// Clip file extension to import, matched case-insensitively (e.g. "mp4")
    pub clip_extension: String,
    /// Path to the ffmpeg binary
    pub ffmpeg_bin: PathBuf,
    /// Path to the ffprobe binary
    pub ffprobe_bin: PathBuf,
    /// Optional watchdog in seconds for a single transcode; a hung ffmpeg
    /// process is killed once it expires. None disables the watchdog.
    pub transcode_timeout_secs: Option<u64>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ImportConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            input_dir: PathBuf::from("./recordings"),
            export_dir: PathBuf::from("./export"),
            clip_extension: "mp4".to_string(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            transcode_timeout_secs: None,
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // Try JSON first, then TOML
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    let file_config: ImportConfig = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                    config = file_config;
                } else {
                    let file_config: ImportConfig = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                    config = file_config;
                }
            }
        }

        Ok(config)
    }
}
