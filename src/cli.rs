use std::net::IpAddr;

use clap::Parser;

/// Relays YouTube links posted in Feishu group chats back as video files.
///
/// Every flag can also be supplied through the environment or a `.env` file;
/// flags take precedence.
#[derive(Parser, Debug, Default)]
#[command(name = "feishu-video-relay", version, about, long_about = None)]
pub struct Cli {
    /// Address the webhook server binds to
    #[arg(long)]
    pub ip: Option<IpAddr>,

    /// Port the webhook server listens on
    #[arg(long)]
    pub port: Option<u16>,

    /// Feishu App ID
    #[arg(long)]
    pub id: Option<String>,

    /// Feishu App Secret
    #[arg(long)]
    pub secret: Option<String>,

    /// Log filter, e.g. `info` or `feishu_video_relay=debug`
    #[arg(long)]
    pub log_level: Option<String>,
}
