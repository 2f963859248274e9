use thiserror::Error;

/// Hard per-file failures raised by the transcode step.
///
/// These mark a file as failed in the batch report; they never abort the
/// batch. Skips (unrecognized capture, no audio, already imported) are not
/// errors and are modeled as `import::SkipReason` instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The transcoder binary could not be launched at all
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The transcoder ran but exited nonzero; its output must not be trusted
    #[error("transcoder exited with code {code}: {stderr}")]
    Encode { code: i32, stderr: String },

    /// The transcoder exceeded the configured watchdog and was killed
    #[error("transcoder timed out after {secs}s and was killed")]
    Timeout { secs: u64 },
}
