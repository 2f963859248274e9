use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use log::debug;

/// Tolerance applied when comparing artifact timestamps against the source.
///
/// Filesystems truncate or round modification times at up to one-second
/// granularity, so a propagated timestamp can disagree with the source by
/// just under a second and still belong to the same import.
pub const MTIME_TOLERANCE: Duration = Duration::from_millis(1000);

/// Decide whether a source clip needs (re)processing.
///
/// The artifact timestamps are the entire cache index: a file is fresh only
/// when the primary output and both sidecars all exist and each carries the
/// source's modification time within `MTIME_TOLERANCE`. Every filesystem
/// error fails open toward reprocessing so a broken or half-written artifact
/// can never mask stale work.
pub fn needs_processing(source: &Path, output: &Path, customname: &Path, trim: &Path) -> bool {
    let source_mtime = match modified_time(source) {
        Some(t) => t,
        None => return true,
    };

    for artifact in [output, customname, trim] {
        match modified_time(artifact) {
            Some(t) if within_tolerance(source_mtime, t) => {}
            Some(_) => {
                debug!("Artifact is stale: {}", artifact.display());
                return true;
            }
            None => {
                debug!("Artifact missing or unreadable: {}", artifact.display());
                return true;
            }
        }
    }

    false
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn within_tolerance(a: SystemTime, b: SystemTime) -> bool {
    let delta = match a.duration_since(b) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    delta <= MTIME_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes, OpenOptions};
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path
    }

    fn set_mtime(path: &Path, mtime: SystemTime) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(mtime)).unwrap();
    }

    #[test]
    fn test_missing_artifacts_need_processing() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mp4");
        let output = dir.path().join("out.mp4");
        let name = dir.path().join("clip.mp4.customname");
        let trim = dir.path().join("clip.mp4.trim");

        assert!(needs_processing(&source, &output, &name, &trim));
    }

    #[test]
    fn test_matching_timestamps_skip_processing() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mp4");
        let output = touch(&dir, "out.mp4");
        let name = touch(&dir, "clip.mp4.customname");
        let trim = touch(&dir, "clip.mp4.trim");

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for path in [&source, &output, &name, &trim] {
            set_mtime(path, mtime);
        }

        assert!(!needs_processing(&source, &output, &name, &trim));
    }

    #[test]
    fn test_sub_second_skew_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mp4");
        let output = touch(&dir, "out.mp4");
        let name = touch(&dir, "clip.mp4.customname");
        let trim = touch(&dir, "clip.mp4.trim");

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&source, base);
        // FAT-style truncation: artifacts land up to a second behind
        for path in [&output, &name, &trim] {
            set_mtime(path, base - Duration::from_millis(900));
        }

        assert!(!needs_processing(&source, &output, &name, &trim));
    }

    #[test]
    fn test_stale_output_needs_processing() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mp4");
        let output = touch(&dir, "out.mp4");
        let name = touch(&dir, "clip.mp4.customname");
        let trim = touch(&dir, "clip.mp4.trim");

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for path in [&source, &name, &trim] {
            set_mtime(path, base);
        }
        set_mtime(&output, base - Duration::from_secs(30));

        assert!(needs_processing(&source, &output, &name, &trim));
    }

    #[test]
    fn test_one_missing_sidecar_needs_processing() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mp4");
        let output = touch(&dir, "out.mp4");
        let name = touch(&dir, "clip.mp4.customname");
        let trim = dir.path().join("clip.mp4.trim");

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for path in [&source, &output, &name] {
            set_mtime(path, mtime);
        }

        assert!(needs_processing(&source, &output, &name, &trim));
    }

    #[test]
    fn test_unreadable_source_fails_open() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("gone.mp4");
        let output = touch(&dir, "out.mp4");
        let name = touch(&dir, "clip.mp4.customname");
        let trim = touch(&dir, "clip.mp4.trim");

        assert!(needs_processing(&source, &output, &name, &trim));
    }
}
