use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::{cli::Cli, feishu::DEFAULT_BASE_URL};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, DownloaderConfig, FeishuConfig, LoggingConfig,
    ServerConfig, WorkerConfig,
};

const DEFAULT_PORT: u16 = 8000;

pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    AppConfig::from_sources(cli, |key| env::var(key).ok())
}

impl AppConfig {
    /// Command-line values win over `lookup`, which is normally the process
    /// environment.
    fn from_sources<F>(cli: &Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let ip = match cli.ip {
            Some(ip) => ip,
            None => match var("BIND_IP") {
                Some(raw) => raw.trim().parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
                    key: "BIND_IP",
                    value: raw,
                })?,
                None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            },
        };
        let port = match cli.port {
            Some(port) => port,
            None => match var("BIND_PORT") {
                Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                    key: "BIND_PORT",
                    value: raw,
                })?,
                None => DEFAULT_PORT,
            },
        };

        let app_id = cli
            .id
            .clone()
            .or_else(|| var("FEISHU_APP_ID"))
            .ok_or(ConfigError::Missing("FEISHU_APP_ID (--id)"))?;
        let app_secret = cli
            .secret
            .clone()
            .or_else(|| var("FEISHU_APP_SECRET"))
            .ok_or(ConfigError::Missing("FEISHU_APP_SECRET (--secret)"))?;

        let feishu = FeishuConfig {
            app_id,
            app_secret,
            base_url: var("FEISHU_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            verification_token: var("FEISHU_VERIFICATION_TOKEN"),
            request_timeout: Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30)),
            token_cache: parse_bool(&var, "TOKEN_CACHE", false),
        };

        let downloader = DownloaderConfig {
            binary: var("YTDLP_BIN").unwrap_or_else(|| "yt-dlp".to_string()),
            extra_args: var("YTDLP_EXTRA_ARGS")
                .map(|value| value.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            max_filesize: var("MAX_FILESIZE").unwrap_or_else(|| "28M".to_string()),
            timeout: Duration::from_secs(parse_or(&var, "DOWNLOAD_TIMEOUT_SECS", 900)),
        };

        let worker = WorkerConfig {
            notify_every_failure: parse_bool(&var, "NOTIFY_EVERY_FAILURE", false),
        };

        let directories = DirectoryConfig {
            logs_dir: var("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            data_dir: var("DATA_DIR").unwrap_or_else(|| "data".to_string()),
        };

        let logging = LoggingConfig {
            level: cli
                .log_level
                .clone()
                .or_else(|| var("LOG_LEVEL"))
                .unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            server: ServerConfig {
                bind: SocketAddr::new(ip, port),
            },
            feishu,
            downloader,
            worker,
            directories,
            logging,
        })
    }
}

fn parse_or<F>(var: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_bool<F>(var: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|value| value.trim().to_ascii_lowercase()) {
        Some(value) if matches!(value.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(value) if matches!(value.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
