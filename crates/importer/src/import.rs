use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::cache;
use crate::config::ImportConfig;
use crate::ffprobe;
use crate::metadata;
use crate::remux::{self, AudioPlan};
use crate::sidecar::{self, TrimWindow};
use crate::timestamps;

/// Progress callback: (completed files, total files), fired once per
/// examined file with completed starting at 1
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Log callback: free-form human-readable lines for the hosting UI.
/// Observability only, never consulted for control flow.
pub type LogFn = Box<dyn Fn(&str) + Send + Sync>;

/// Callbacks the hosting application observes a batch through
pub struct ImportHooks {
    pub progress: ProgressFn,
    pub log: LogFn,
}

impl ImportHooks {
    pub fn new(
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
        log: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        ImportHooks {
            progress: Box::new(progress),
            log: Box::new(log),
        }
    }

    /// Hooks that drop everything; used where no UI is attached
    pub fn silent() -> Self {
        ImportHooks::new(|_, _| {}, |_| {})
    }
}

/// Why a file was examined but not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// All three artifacts exist and carry the source's timestamp
    UpToDate,
    /// Container probe failed; treated as an unrecognized capture
    ProbeFailed,
    /// No fragment tags, or the reassembled record was corrupt
    NoMetadata,
    /// Zero audio streams; nothing to normalize, no output produced
    NoAudio,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::UpToDate => "already imported and up to date",
            SkipReason::ProbeFailed => "container probe failed",
            SkipReason::NoMetadata => "no clip metadata",
            SkipReason::NoAudio => "no audio streams",
        };
        f.write_str(reason)
    }
}

/// Outcome of examining one candidate file
#[derive(Debug)]
pub enum FileOutcome {
    Imported,
    Skipped(SkipReason),
}

/// Aggregate result of one batch run
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Files examined (everything matching the clip extension)
    pub total: usize,
    /// Files that produced a fresh output and both sidecars
    pub imported: usize,
    /// Files examined but not imported, with no artifacts produced
    pub skipped: usize,
    /// Files whose transcode or sidecar write failed; the batch went on
    pub failed: Vec<PathBuf>,
}

/// Batch importer: walks the input folder once and produces the primary
/// output plus both sidecars for every recognized clip.
///
/// Configuration and callbacks are handed over exactly once at construction;
/// the importer holds no other state across files.
pub struct Importer {
    config: ImportConfig,
    hooks: ImportHooks,
}

impl Importer {
    pub fn new(config: ImportConfig, hooks: ImportHooks) -> Self {
        Importer { config, hooks }
    }

    /// Run one batch over the input folder.
    ///
    /// Folder-level setup and enumeration failures abort the batch and
    /// propagate; per-file failures are recorded in the report and never do.
    pub async fn run(&self) -> Result<ImportReport> {
        let cfg = &self.config;

        fs::create_dir_all(&cfg.export_dir)
            .with_context(|| format!("Failed to create export folder: {}", cfg.export_dir.display()))?;
        let meta_dir = sidecar::metadata_dir(&cfg.export_dir);
        fs::create_dir_all(&meta_dir)
            .with_context(|| format!("Failed to create metadata folder: {}", meta_dir.display()))?;

        let candidates = self.enumerate_candidates()?;
        let total = candidates.len();

        if candidates.is_empty() {
            let msg = format!(
                "No .{} files found in {}",
                cfg.clip_extension,
                cfg.input_dir.display()
            );
            info!("{}", msg);
            (self.hooks.log)(&msg);
            return Ok(ImportReport::default());
        }

        info!("Importing {} clip(s) from {}", total, cfg.input_dir.display());

        let mut report = ImportReport {
            total,
            ..Default::default()
        };

        // Strictly one file in flight at a time: each probe and transcode
        // below is awaited to completion before the next file starts.
        for (index, path) in candidates.iter().enumerate() {
            match self.process_file(path).await {
                Ok(FileOutcome::Imported) => {
                    report.imported += 1;
                    (self.hooks.log)(&format!("Imported {}", path.display()));
                }
                Ok(FileOutcome::Skipped(reason)) => {
                    report.skipped += 1;
                    info!("Skipping {}: {}", path.display(), reason);
                    (self.hooks.log)(&format!("Skipped {} ({})", path.display(), reason));
                }
                Err(e) => {
                    error!("Import failed for {}: {:#}", path.display(), e);
                    (self.hooks.log)(&format!("Failed {}: {:#}", path.display(), e));
                    report.failed.push(path.clone());
                }
            }
            (self.hooks.progress)(index + 1, total);
        }

        info!(
            "✅ Batch complete: {} imported, {} skipped, {} failed",
            report.imported,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    /// List input-folder entries matching the clip extension
    /// (case-insensitive), sorted by path for a stable processing order.
    fn enumerate_candidates(&self) -> Result<Vec<PathBuf>> {
        let cfg = &self.config;
        if !cfg.input_dir.is_dir() {
            anyhow::bail!("Input folder does not exist: {}", cfg.input_dir.display());
        }

        let wanted = cfg.clip_extension.to_lowercase();
        let mut files = Vec::new();

        let walker = WalkDir::new(&cfg.input_dir).max_depth(1).follow_links(false);
        for entry in walker.into_iter() {
            let entry = entry.with_context(|| {
                format!("Failed to enumerate input folder: {}", cfg.input_dir.display())
            })?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase());
            if ext.as_deref() == Some(wanted.as_str()) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// The per-file pipeline. An error returned here marks the file failed;
    /// it is caught at the batch loop and never aborts the run.
    async fn process_file(&self, source: &Path) -> Result<FileOutcome> {
        let cfg = &self.config;
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Clip path has no UTF-8 file name: {}", source.display()))?;

        let output = cfg.export_dir.join(file_name);
        let name_sidecar = sidecar::customname_path(&cfg.export_dir, file_name);
        let trim_sidecar = sidecar::trim_path(&cfg.export_dir, file_name);

        // Step 1: timestamp cache check; the artifacts are the whole index
        if !cache::needs_processing(source, &output, &name_sidecar, &trim_sidecar) {
            return Ok(FileOutcome::Skipped(SkipReason::UpToDate));
        }

        // Step 2: reconstruct the device's clip record from container tags
        let format = match ffprobe::probe_format(cfg, source).await {
            Ok(format) => format,
            Err(e) => {
                warn!("Container probe failed for {}: {:#}", source.display(), e);
                return Ok(FileOutcome::Skipped(SkipReason::ProbeFailed));
            }
        };
        let meta = match metadata::extract_clip_metadata(&format) {
            Some(meta) => meta.clamped(format.duration_secs()),
            None => return Ok(FileOutcome::Skipped(SkipReason::NoMetadata)),
        };
        debug!("Extracted clip record for {}: {:?}", source.display(), meta);

        // Step 3: pick the audio plan from the stream count
        let audio_streams = ffprobe::count_audio_streams(cfg, source).await;
        let plan = match AudioPlan::from_stream_count(audio_streams) {
            Some(plan) => plan,
            None => return Ok(FileOutcome::Skipped(SkipReason::NoAudio)),
        };
        info!(
            "Importing {} ({} audio stream(s), {:?})",
            source.display(),
            audio_streams,
            plan
        );

        // Step 4: produce the primary output; nonzero exit is a hard failure
        remux::run_remux(cfg, source, &output, plan).await?;

        // Step 5: stamp the output with the source's times so the cache can
        // recognize it next run; best-effort, the cache fails open anyway
        if let Err(e) = timestamps::copy_file_times(source, &output) {
            warn!("Timestamp propagation failed for {}: {:#}", output.display(), e);
        }

        // Step 6: sidecars exist only for clips whose transcode succeeded
        sidecar::write_customname(&name_sidecar, &meta.name)?;
        sidecar::write_trim(&trim_sidecar, &TrimWindow::from_metadata(&meta))?;
        for artifact in [&name_sidecar, &trim_sidecar] {
            if let Err(e) = timestamps::copy_file_times(source, artifact) {
                warn!("Timestamp propagation failed for {}: {:#}", artifact.display(), e);
            }
        }

        Ok(FileOutcome::Imported)
    }
}
