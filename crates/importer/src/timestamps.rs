use std::fs::{self, FileTimes, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};

/// Copy access and modification time from `reference` onto `target`.
///
/// The artifact timestamps double as the reprocessing cache, so a produced
/// file only counts as fresh once it carries the source clip's times.
/// Callers treat a failure here as best-effort: the artifact stays valid,
/// the cache just reprocesses it conservatively on the next run.
pub fn copy_file_times(reference: &Path, target: &Path) -> Result<()> {
    let meta = fs::metadata(reference)
        .with_context(|| format!("Failed to stat reference file: {}", reference.display()))?;
    let accessed = meta
        .accessed()
        .with_context(|| format!("No access time available for: {}", reference.display()))?;
    let modified = meta
        .modified()
        .with_context(|| format!("No modification time available for: {}", reference.display()))?;

    let file = OpenOptions::new()
        .write(true)
        .open(target)
        .with_context(|| format!("Failed to open target for timestamp update: {}", target.display()))?;
    file.set_times(FileTimes::new().set_accessed(accessed).set_modified(modified))
        .with_context(|| format!("Failed to set file times on: {}", target.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_times_are_copied_exactly() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("source.mp4");
        let target = dir.path().join("output.mp4");
        File::create(&reference).unwrap();
        File::create(&target).unwrap();

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let file = OpenOptions::new().write(true).open(&reference).unwrap();
        file.set_times(FileTimes::new().set_accessed(mtime).set_modified(mtime))
            .unwrap();

        copy_file_times(&reference, &target).unwrap();

        let copied = fs::metadata(&target).unwrap().modified().unwrap();
        let delta = match copied.duration_since(mtime) {
            Ok(d) => d,
            Err(e) => e.duration(),
        };
        assert!(delta < Duration::from_secs(1));
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("output.mp4");
        File::create(&target).unwrap();

        let result = copy_file_times(&dir.path().join("gone.mp4"), &target);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("source.mp4");
        File::create(&reference).unwrap();

        let result = copy_file_times(&reference, &dir.path().join("gone.mp4"));
        assert!(result.is_err());
    }
}
