use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::ImportConfig;

/// Format-level metadata from ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeFormat {
    #[serde(rename = "format_name")]
    pub format_name: String,
    pub duration: Option<String>,
    pub tags: Option<HashMap<String, String>>,
}

/// Stream-level metadata from ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeStream {
    pub index: i32,
    #[serde(rename = "codec_type")]
    pub codec_type: Option<String>,
    #[serde(rename = "codec_name")]
    pub codec_name: Option<String>,
}

/// Envelope of a `-show_format` probe
#[derive(Debug, Clone, Deserialize)]
struct FormatOutput {
    format: FFProbeFormat,
}

/// Envelope of a `-show_streams` probe; a missing list counts as empty
#[derive(Debug, Clone, Deserialize, Default)]
struct StreamsOutput {
    #[serde(default)]
    streams: Vec<FFProbeStream>,
}

impl FFProbeFormat {
    /// Container duration in seconds, when the probe reported one
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_deref().and_then(|d| d.parse::<f64>().ok())
    }
}

/// Arguments for the container-format probe. The capture device's custom
/// tags come back under `format.tags`.
pub fn build_format_probe_args(file_path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        file_path.to_string_lossy().to_string(),
    ]
}

/// Arguments for the audio-stream probe; `streams` is restricted to audio
pub fn build_audio_probe_args(file_path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-select_streams".to_string(),
        "a".to_string(),
        "-show_streams".to_string(),
        file_path.to_string_lossy().to_string(),
    ]
}

/// Run ffprobe with the given arguments and return its stdout
async fn run_ffprobe(cfg: &ImportConfig, args: Vec<String>) -> Result<String> {
    debug!("ffprobe args: {:?}", args);

    let output = Command::new(&cfg.ffprobe_bin)
        .args(&args)
        .output()
        .await
        .with_context(|| format!("Failed to execute ffprobe at: {}", cfg.ffprobe_bin.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "ffprobe failed (exit code {}): {}",
            output.status.code().unwrap_or(-1),
            stderr
        );
    }

    String::from_utf8(output.stdout).context("ffprobe output is not valid UTF-8")
}

fn parse_format_output(json_str: &str) -> Result<FFProbeFormat> {
    let data: FormatOutput =
        serde_json::from_str(json_str).context("Failed to parse ffprobe format JSON")?;
    Ok(data.format)
}

fn parse_stream_count(json_str: &str) -> Option<usize> {
    serde_json::from_str::<StreamsOutput>(json_str)
        .ok()
        .map(|data| data.streams.len())
}

/// Probe container-level format data, including the device's custom tags
pub async fn probe_format(cfg: &ImportConfig, file_path: &Path) -> Result<FFProbeFormat> {
    // Verify file exists before trying to probe
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", file_path.display());
    }

    let json_str = run_ffprobe(cfg, build_format_probe_args(file_path)).await?;
    parse_format_output(&json_str)
        .with_context(|| format!("Failed to parse ffprobe JSON for: {}", file_path.display()))
}

/// Count the audio streams of a source file.
///
/// Any probe failure or absence of a streams list yields 0; the count only
/// shapes the transcode graph and must never fail the file on its own.
pub async fn count_audio_streams(cfg: &ImportConfig, file_path: &Path) -> usize {
    let json_str = match run_ffprobe(cfg, build_audio_probe_args(file_path)).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Audio stream probe failed for {}: {:#}", file_path.display(), e);
            return 0;
        }
    };

    match parse_stream_count(&json_str) {
        Some(count) => count,
        None => {
            warn!("Unparsable audio stream probe output for {}", file_path.display());
            0
        }
    }
}
