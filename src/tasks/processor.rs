use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tempfile::TempDir;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{
    config::WorkerConfig,
    domain::{AccessToken, DownloadJob, JobStage},
    downloader::{DownloadError, Downloader},
    feishu::{ApiError, ChatMessenger, TokenSource},
    infrastructure::{directories::JOB_DIR_PREFIX, shutdown::ShutdownListener},
    tasks::queue::JobQueue,
};

pub const ARTIFACT_FILE_NAME: &str = "download.mp4";

fn start_message(url: &str) -> String {
    format!("开始下载{url}")
}

fn download_failed_message(url: &str) -> String {
    format!("{url}下载失败")
}

fn job_failed_message(url: &str) -> String {
    format!("{url}处理失败")
}

/// Why a job was abandoned. Each variant maps to the step that failed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to obtain access token: {0}")]
    Auth(#[source] ApiError),
    #[error("failed to announce download: {0}")]
    NotifyStart(#[source] ApiError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("failed to upload artifact: {0}")]
    Upload(#[source] ApiError),
    #[error("failed to post file message: {0}")]
    Deliver(#[source] ApiError),
}

impl JobError {
    /// Last stage the job completed before failing.
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Auth(_) => JobStage::Received,
            JobError::NotifyStart(_) => JobStage::Authenticated,
            JobError::Download(_) => JobStage::NotifiedStart,
            JobError::Upload(_) => JobStage::Downloaded,
            JobError::Deliver(_) => JobStage::Uploaded,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Auth(_) => "auth",
            JobError::NotifyStart(_) | JobError::Deliver(_) => "messaging",
            JobError::Download(_) => "download",
            JobError::Upload(_) => "upload",
        }
    }

    /// Download failures are always reported to the chat.
    fn always_notifies(&self) -> bool {
        matches!(self, JobError::Download(_))
    }
}

/// The single worker draining the job queue.
pub struct DownloadProcessor {
    queue: Arc<JobQueue<DownloadJob>>,
    tokens: Arc<dyn TokenSource>,
    messenger: Arc<dyn ChatMessenger>,
    downloader: Arc<dyn Downloader>,
    downloads_dir: PathBuf,
    config: WorkerConfig,
}

impl DownloadProcessor {
    pub fn new(
        queue: Arc<JobQueue<DownloadJob>>,
        tokens: Arc<dyn TokenSource>,
        messenger: Arc<dyn ChatMessenger>,
        downloader: Arc<dyn Downloader>,
        downloads_dir: PathBuf,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            tokens,
            messenger,
            downloader,
            downloads_dir,
            config,
        }
    }

    pub fn spawn(self: Arc<Self>, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop(&mut shutdown).await;
        })
    }

    async fn run_loop(&self, shutdown: &mut ShutdownListener) {
        tracing::info!(target: "processor", "download worker started");
        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                job = self.queue.pop() => job,
            };
            // failures are logged inside and never end the loop
            let _ = self.handle_job(job).await;
        }
        tracing::info!(
            target: "processor",
            pending = self.queue.len(),
            "download worker stopped"
        );
    }

    pub(crate) async fn handle_job(&self, job: DownloadJob) -> Result<(), JobError> {
        let queued_ms = (Utc::now() - job.received_at).num_milliseconds();
        tracing::info!(
            target: "processor",
            job_id = %job.id,
            chat_id = %job.chat_id,
            url = %job.url,
            queued_ms,
            "processing job"
        );

        match self.process(&job).await {
            Ok(()) => {
                tracing::info!(
                    target: "processor",
                    job_id = %job.id,
                    chat_id = %job.chat_id,
                    stage = JobStage::NotifiedDone.label(),
                    "job delivered"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    target: "processor",
                    job_id = %job.id,
                    chat_id = %job.chat_id,
                    url = %job.url,
                    stage = err.stage().label(),
                    kind = err.kind(),
                    error = %err,
                    "job abandoned"
                );
                Err(err)
            }
        }
    }

    async fn process(&self, job: &DownloadJob) -> Result<(), JobError> {
        let token = self.tokens.access_token().await.map_err(JobError::Auth)?;

        if let Err(err) = self
            .messenger
            .post_text(&token, &job.chat_id, &start_message(&job.url))
            .await
        {
            return Err(self.abandon(&token, job, JobError::NotifyStart(err)).await);
        }

        // removed with everything in it when this function returns
        let workspace = match self.workspace(job) {
            Ok(dir) => dir,
            Err(err) => return Err(self.abandon(&token, job, err.into()).await),
        };
        let artifact = workspace.path().join(ARTIFACT_FILE_NAME);

        let size = match self.downloader.download(&job.url, &artifact).await {
            Ok(size) => size,
            Err(err) => return Err(self.abandon(&token, job, err.into()).await),
        };
        tracing::debug!(target: "processor", job_id = %job.id, size, "artifact ready");

        let file_key = match self.messenger.upload_file(&token, &artifact).await {
            Ok(key) => key,
            Err(err) => return Err(self.abandon(&token, job, JobError::Upload(err)).await),
        };

        if let Err(err) = self
            .messenger
            .post_file(&token, &job.chat_id, &file_key)
            .await
        {
            return Err(self.abandon(&token, job, JobError::Deliver(err)).await);
        }

        Ok(())
    }

    fn workspace(&self, job: &DownloadJob) -> Result<TempDir, DownloadError> {
        tempfile::Builder::new()
            .prefix(&format!("{JOB_DIR_PREFIX}{}-", job.id))
            .tempdir_in(&self.downloads_dir)
            .map_err(DownloadError::Workspace)
    }

    /// Tells the chat about the failure when policy asks for it and hands the
    /// error back.
    async fn abandon(&self, token: &AccessToken, job: &DownloadJob, err: JobError) -> JobError {
        if !(err.always_notifies() || self.config.notify_every_failure) {
            return err;
        }

        let text = if err.always_notifies() {
            download_failed_message(&job.url)
        } else {
            job_failed_message(&job.url)
        };
        if let Err(notify_err) = self.messenger.post_text(token, &job.chat_id, &text).await {
            tracing::warn!(
                target: "processor",
                job_id = %job.id,
                chat_id = %job.chat_id,
                error = %notify_err,
                "failed to report job failure to chat"
            );
        }
        err
    }
}
