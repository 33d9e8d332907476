pub mod env;
mod loader;

pub use env::{AppConfig, DirectoryConfig, DownloaderConfig, WorkerConfig};
pub use loader::load_config;
