use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::ExitStatus,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{process::Command, time::timeout};

use crate::config::DownloaderConfig;

/// Bytes of downloader stderr kept for diagnostics.
const STDERR_TAIL: usize = 2048;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to remove previous artifact {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare job directory: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("failed to launch `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("downloader timed out after {0:?}")]
    TimedOut(Duration),
    #[error("downloader exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("downloader produced no file at {0}")]
    Missing(PathBuf),
    #[error("downloader produced an empty file at {0}")]
    Empty(PathBuf),
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches `url` into `output`, returning the artifact size in bytes.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, output: &Path) -> Result<u64, DownloadError>;
}

/// Runs yt-dlp (or a compatible binary) as a child process.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn command(&self, url: &str, output: &Path) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .args(&self.config.extra_args)
            .arg("--max-filesize")
            .arg(&self.config.max_filesize)
            .arg("--output")
            .arg(output_template(output))
            .arg(url)
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, output: &Path) -> Result<u64, DownloadError> {
        remove_stale(output).await?;

        tracing::info!(
            target: "downloader",
            url,
            output = %output.display(),
            max_filesize = %self.config.max_filesize,
            "starting download"
        );

        let mut command = self.command(url, output);
        let finished = timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| DownloadError::TimedOut(self.config.timeout))?
            .map_err(|source| DownloadError::Spawn {
                binary: self.config.binary.clone(),
                source,
            })?;

        if !finished.status.success() {
            return Err(DownloadError::Exit {
                status: finished.status,
                stderr: stderr_tail(&finished.stderr),
            });
        }

        let size = artifact_size(output).await?;
        tracing::info!(target: "downloader", url, size, "download finished");
        Ok(size)
    }
}

/// yt-dlp treats `--output` as a template, so a literal `%` must be doubled.
fn output_template(path: &Path) -> OsString {
    let raw = path.as_os_str();
    match raw.to_str() {
        Some(text) if text.contains('%') => text.replace('%', "%%").into(),
        _ => raw.to_os_string(),
    }
}

/// A missing file is fine; anything else blocks the download.
async fn remove_stale(path: &Path) -> Result<(), DownloadError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(target: "downloader", path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DownloadError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn artifact_size(path: &Path) -> Result<u64, DownloadError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        Ok(_) => Err(DownloadError::Empty(path.to_path_buf())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(DownloadError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(DownloadError::Inspect {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    let mut start = trimmed.len().saturating_sub(STDERR_TAIL);
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
