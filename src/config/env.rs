use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feishu: FeishuConfig,
    pub downloader: DownloaderConfig,
    pub worker: WorkerConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Clone)]
pub struct FeishuConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    /// When set, callbacks must carry this verification token.
    pub verification_token: Option<String>,
    pub request_timeout: Duration,
    pub token_cache: bool,
}

impl std::fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .field("base_url", &self.base_url)
            .field("verification_token", &self.verification_token.as_ref().map(|_| "***"))
            .field("request_timeout", &self.request_timeout)
            .field("token_cache", &self.token_cache)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub binary: String,
    /// Inserted before the size cap, output and url arguments.
    pub extra_args: Vec<String>,
    pub max_filesize: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Post a failure message for every abandoned job, not only failed downloads.
    pub notify_every_failure: bool,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
