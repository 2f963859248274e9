use log::debug;
use serde::Deserialize;

use crate::ffprobe::FFProbeFormat;

/// Tag-key prefix the capture device shards its clip record across.
///
/// Container tags have a length limit, so the device writes one JSON string
/// split over `META0000`, `META0001`, ... The numeric suffix determines the
/// reassembly order; the sequence is assumed total and gapless.
pub const FRAGMENT_TAG_PREFIX: &str = "META";

/// Clip record reconstructed from the device's fragment tags
#[derive(Debug, Clone, PartialEq)]
pub struct ClipMetadata {
    /// Display name the user gave the clip at capture time
    pub name: String,
    /// Start of the highlight window, in seconds
    pub clip_start: f64,
    /// End of the highlight window, in seconds
    pub clip_end: f64,
}

/// JSON layout of the reassembled fragment payload
#[derive(Debug, Deserialize)]
struct FragmentPayload {
    name: String,
    clip_start_point: f64,
    clip_end_point: f64,
}

/// Reassemble the fragment tags of a probed container into a clip record.
///
/// Returns None when no fragment tags exist (the file is not a recognized
/// capture) or when the reassembled string is not valid JSON (a corrupt
/// record is skipped, never fatal). Pure function of the probed format.
pub fn extract_clip_metadata(format: &FFProbeFormat) -> Option<ClipMetadata> {
    let tags = format.tags.as_ref()?;

    let mut fragments: Vec<(u32, &str)> = tags
        .iter()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(FRAGMENT_TAG_PREFIX)?;
            let index = suffix.parse::<u32>().ok()?;
            Some((index, value.as_str()))
        })
        .collect();

    if fragments.is_empty() {
        return None;
    }

    fragments.sort_by_key(|(index, _)| *index);
    let payload: String = fragments.iter().map(|(_, value)| *value).collect();

    let raw: FragmentPayload = match serde_json::from_str(&payload) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Reassembled fragment payload is not valid JSON: {}", e);
            return None;
        }
    };

    Some(ClipMetadata {
        name: raw.name,
        clip_start: raw.clip_start_point,
        clip_end: raw.clip_end_point,
    })
}

impl ClipMetadata {
    /// Clamp the trim window so that 0 <= start <= end <= duration.
    ///
    /// The duration is unknown for containers that do not report one; the
    /// upper bound is skipped in that case.
    pub fn clamped(mut self, duration: Option<f64>) -> Self {
        let upper = duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(f64::INFINITY);
        self.clip_start = self.clip_start.clamp(0.0, upper);
        self.clip_end = self.clip_end.clamp(self.clip_start, upper);
        self
    }
}
