use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

/// Prefix of the per-job temporary directories under `downloads_dir`.
pub const JOB_DIR_PREFIX: &str = "job-";

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(Path::new(&cfg.logs_dir))?;
    let data_dir = ensure_dir(Path::new(&cfg.data_dir))?;
    let downloads_dir = ensure_dir(&data_dir.join("downloads"))?;

    let probe_file = downloads_dir.join(".write-test");
    fs::write(&probe_file, b"ok")
        .with_context(|| format!("{} is not writable", downloads_dir.display()))?;
    fs::remove_file(&probe_file)?;

    Ok(ResolvedPaths {
        logs_dir,
        downloads_dir,
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()))
}

/// Job directories are normally removed when their job ends; anything left
/// over belongs to a previous run that did not exit cleanly.
pub fn purge_job_dirs(downloads_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(downloads_dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let is_job_dir = entry.file_name().to_string_lossy().starts_with(JOB_DIR_PREFIX)
            && entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
        if !is_job_dir {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => tracing::warn!(
                target: "lifecycle",
                path = %entry.path().display(),
                error = %err,
                "failed to remove leftover job directory"
            ),
        }
    }
    if removed > 0 {
        tracing::info!(target: "lifecycle", removed, "removed leftover job directories");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_layout_and_purges_leftovers() {
        let root = tempfile::tempdir().unwrap();
        let cfg = DirectoryConfig {
            logs_dir: root.path().join("logs").display().to_string(),
            data_dir: root.path().join("data").display().to_string(),
        };

        let first = ensure_directories(&cfg).unwrap();
        assert!(first.logs_dir.is_dir());
        assert!(first.downloads_dir.is_dir());

        let leftover = first.downloads_dir.join(format!("{JOB_DIR_PREFIX}abc"));
        fs::create_dir(&leftover).unwrap();
        fs::write(leftover.join("download.mp4"), b"partial").unwrap();
        let unrelated = first.downloads_dir.join("keep.txt");
        fs::write(&unrelated, b"keep").unwrap();

        assert_eq!(purge_job_dirs(&first.downloads_dir), 1);
        assert!(!leftover.exists());
        assert!(unrelated.exists());
    }
}
