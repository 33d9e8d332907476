mod app;
mod cli;
mod config;
mod domain;
mod downloader;
mod feishu;
mod infrastructure;
mod tasks;
mod webhook;

use anyhow::Result;
use clap::Parser;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    let config = config::load_config(&cli)?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;
    directories::purge_job_dirs(&paths.downloads_dir);

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::RelayApp::initialize(config, paths, shutdown)?;
    app.run().await
}
