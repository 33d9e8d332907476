use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;

use crate::{
    config::AppConfig,
    domain::DownloadJob,
    downloader::YtDlpDownloader,
    feishu::{FeishuAuth, FeishuClient},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    tasks::{processor::DownloadProcessor, queue::JobQueue},
    webhook::{self, WebhookState},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct RelayApp {
    paths: ResolvedPaths,
    config: Arc<AppConfig>,
    queue: Arc<JobQueue<DownloadJob>>,
    processor_handle: JoinHandle<()>,
    shutdown: Shutdown,
}

impl RelayApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let http_client = Client::builder()
            .user_agent(format!("feishu-video-relay/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.feishu.request_timeout)
            .build()?;

        let feishu = FeishuClient::new(http_client, config.feishu.base_url.clone());
        let auth = FeishuAuth::new(
            feishu.clone(),
            config.feishu.app_id.clone(),
            config.feishu.app_secret.clone(),
        )
        .with_cache(config.feishu.token_cache);
        let downloader = YtDlpDownloader::new(config.downloader.clone());

        let queue = Arc::new(JobQueue::<DownloadJob>::new());
        let processor = Arc::new(DownloadProcessor::new(
            queue.clone(),
            Arc::new(auth),
            Arc::new(feishu),
            Arc::new(downloader),
            paths.downloads_dir.clone(),
            config.worker.clone(),
        ));
        let processor_handle = processor.spawn(shutdown.subscribe());

        Ok(Self {
            paths,
            config,
            queue,
            processor_handle,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let RelayApp {
            paths,
            config,
            queue,
            mut processor_handle,
            shutdown,
        } = self;

        tracing::info!(
            target: "lifecycle",
            bind = %config.server.bind,
            downloads = %paths.downloads_dir.display(),
            token_cache = config.feishu.token_cache,
            notify_every_failure = config.worker.notify_every_failure,
            "feishu video relay starting"
        );

        let state = Arc::new(WebhookState {
            queue: queue.clone(),
            verification_token: config.feishu.verification_token.clone(),
        });
        let requested = shutdown.subscribe();
        let served = webhook::serve(config.server.bind, state, shutdown.subscribe()).await;
        match &served {
            Err(err) => {
                tracing::error!(target: "lifecycle", error = %err, "webhook server stopped with an error");
            }
            Ok(()) if !requested.is_triggered() => {
                tracing::warn!(target: "lifecycle", "webhook server stopped without a shutdown request");
            }
            Ok(()) => {}
        }

        shutdown.trigger();

        let grace = tokio::time::sleep(SHUTDOWN_GRACE);
        tokio::pin!(grace);
        tokio::select! {
            res = &mut processor_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!(target: "lifecycle", "download worker panicked");
                    }
                }
            }
            _ = &mut grace => {
                tracing::warn!(
                    target: "lifecycle",
                    "download worker did not stop within {:?}; aborting the running job",
                    SHUTDOWN_GRACE
                );
                processor_handle.abort();
            }
        }

        let dropped = queue.len();
        if dropped > 0 {
            tracing::warn!(target: "lifecycle", dropped, "queued jobs discarded at shutdown");
        }
        tracing::info!(target: "lifecycle", "feishu video relay stopped");
        served
    }
}
