use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info};
use tokio::process::Command;

use crate::config::ImportConfig;
use crate::error::ImportError;

/// How the audio tracks of a source clip become one playable stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPlan {
    /// Single audio track: stream-copy it untouched
    Copy,
    /// Multiple tracks: mix them all down to one stream
    Mix(usize),
}

impl AudioPlan {
    /// Select the plan for a probed audio-stream count.
    ///
    /// Zero streams means the clip has nothing to play; it is ineligible
    /// rather than an error, and no output is produced for it.
    pub fn from_stream_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(AudioPlan::Copy),
            n => Some(AudioPlan::Mix(n)),
        }
    }
}

/// Build the transcoder arguments for a plan.
///
/// Video is always stream-copied; the only re-encode that ever happens is
/// the mixed audio stream, which cannot be copied out of a filter graph.
pub fn build_remux_args(input: &Path, output: &Path, plan: AudioPlan) -> Vec<String> {
    match plan {
        AudioPlan::Copy => build_copy_args(input, output),
        AudioPlan::Mix(inputs) => build_mix_args(input, output, inputs),
    }
}

/// Pure stream copy for single-audio sources: lossless and fast
pub fn build_copy_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Mix all audio tracks into one stream, padding shorter tracks with
/// silence up to the longest; video stays stream-copied.
pub fn build_mix_args(input: &Path, output: &Path, inputs: usize) -> Vec<String> {
    let labels: String = (0..inputs).map(|i| format!("[0:a:{}]", i)).collect();
    let filter = format!("{}amix=inputs={}:duration=longest[aout]", labels, inputs);

    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Run the transcoder for a plan and require a clean exit.
///
/// Any nonzero exit or launch failure is a hard failure for this file; the
/// destination must not be trusted by downstream steps in that case.
pub async fn run_remux(
    cfg: &ImportConfig,
    input: &Path,
    output: &Path,
    plan: AudioPlan,
) -> Result<()> {
    let args = build_remux_args(input, output, plan);
    debug!("ffmpeg args: {:?}", args);

    let mut cmd = Command::new(&cfg.ffmpeg_bin);
    // Kill a still-running ffmpeg if the watchdog drops the future
    cmd.args(&args).kill_on_drop(true);

    let run = cmd.output();
    let result = match cfg.transcode_timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result,
            Err(_) => return Err(ImportError::Timeout { secs }.into()),
        },
        None => run.await,
    };

    let out = result.map_err(|source| ImportError::Launch {
        program: cfg.ffmpeg_bin.display().to_string(),
        source,
    })?;

    if !out.status.success() {
        return Err(ImportError::Encode {
            code: out.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
        .into());
    }

    info!("ffmpeg completed successfully for {}", input.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn test_plan_selection() {
        assert_eq!(AudioPlan::from_stream_count(0), None);
        assert_eq!(AudioPlan::from_stream_count(1), Some(AudioPlan::Copy));
        assert_eq!(AudioPlan::from_stream_count(2), Some(AudioPlan::Mix(2)));
        assert_eq!(AudioPlan::from_stream_count(6), Some(AudioPlan::Mix(6)));
    }

    #[test]
    fn test_copy_args_never_reencode() {
        let args = build_copy_args(&PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"));
        assert_eq!(
            args,
            vec!["-y", "-i", "in.mp4", "-c:v", "copy", "-c:a", "copy", "out.mp4"]
        );
    }

    #[test]
    fn test_mix_args_build_longest_duration_graph() {
        let args = build_mix_args(&PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"), 2);

        let filter_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            args[filter_pos + 1],
            "[0:a:0][0:a:1]amix=inputs=2:duration=longest[aout]"
        );

        // Video stream 0 and the mixed stream are the only mapped outputs
        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| &args[i + 1])
            .collect();
        assert_eq!(maps, vec!["0:v:0", "[aout]"]);

        // Video is copied, never re-encoded
        let cv_pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv_pos + 1], "copy");
    }

    #[test]
    fn test_remux_args_overwrite_destination() {
        for plan in [AudioPlan::Copy, AudioPlan::Mix(3)] {
            let args = build_remux_args(&PathBuf::from("a.mp4"), &PathBuf::from("b.mp4"), plan);
            assert_eq!(args[0], "-y");
            assert_eq!(args.last().unwrap(), "b.mp4");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The mix graph always references every audio input exactly once
        #[test]
        fn test_mix_graph_covers_all_inputs(inputs in 2usize..16) {
            let args = build_mix_args(
                &PathBuf::from("in.mp4"),
                &PathBuf::from("out.mp4"),
                inputs,
            );
            let filter_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
            let filter = &args[filter_pos + 1];

            for i in 0..inputs {
                let needle = format!("[0:a:{}]", i);
                prop_assert!(filter.contains(&needle));
            }
            let absent_needle = format!("[0:a:{}]", inputs);
            prop_assert!(!filter.contains(&absent_needle));
            let amix_needle = format!("amix=inputs={}:duration=longest", inputs);
            prop_assert!(filter.contains(&amix_needle));
        }
    }
}
